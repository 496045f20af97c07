mod api;
mod engines;
