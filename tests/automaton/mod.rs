mod agreement;
mod api;
