/*!
Backtracking parser combinators, token automata and regular expressions.

This crate provides three layers that share their low level types:

* [`combinator`] runs grammars built from matchers (literals, sequences,
  alternations, repetitions, lookaheads and more) as a lazy, resumable
  search. Evaluation uses an explicit trampoline, so recursive grammars never
  grow the native stack, and memoization makes left recursive grammars
  terminate.
* [`automaton`] compiles small labelled regular expressions over code point
  intervals into NFAs and DFAs, for use as fast token matchers inside a
  grammar.
* [`re`] is a regular expression library supporting backreferences,
  lookarounds and conditionals, with a choice of backtracking or
  simultaneous execution.

# Crate features

* **logging** (default) - Emit diagnostics through the `log` crate.
* **unicode** (default) - Unicode aware `\d`, `\w`, `\s`, `\b` and case
  insensitive matching in [`re`]. Without it, those are ASCII only and the
  `u` flag is an error.
*/

#[cfg(not(any(
    target_pointer_width = "16",
    target_pointer_width = "32",
    target_pointer_width = "64"
)))]
compile_error!("parse-automata currently not supported on non-{16,32,64}");

#[macro_use]
mod macros;

pub mod automaton;
pub mod combinator;
pub mod re;
pub mod util;
