mod automaton;
mod combinator;
mod re;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
