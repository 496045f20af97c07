/*!
Types shared by the combinator engine, the token automata and the regex
engines.
*/

pub mod interval;
pub mod primitives;
pub(crate) mod sparse_set;
pub mod stream;
