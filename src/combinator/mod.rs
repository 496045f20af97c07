/*!
A backtracking parser combinator engine.

A grammar is a graph of [`Matcher`]s stored in a [`Grammar`] arena. Running
it with a [`Parser`] produces a lazy sequence of [`Match`]es: every way the
root matcher can match at the start of the stream, in search order. Search
is driven by an explicit-stack trampoline, so neither deep nor recursive
grammars grow the native stack.

# Example

```
use parse_automata::{
    combinator::{Grammar, MemoKind, Parser},
    util::{interval::IntervalSet, stream::Text},
};

// sum := sum '+' digit | digit
let mut g = Grammar::new();
let sum = g.delayed()?;
let digit = g.any_of(IntervalSet::range('0', '9'))?;
let plus = g.literal("+")?;
let rec = g.sequence(&[sum, plus, digit])?;
let body = g.alternation(&[rec, digit])?;
let memo = g.memoize(body, MemoKind::Left)?;
g.bind(sum, memo)?;

let parser = Parser::new(&g, sum)?;
let values = parser.parse_complete(Text::new("1+2+3"))?.unwrap();
assert_eq!(values.len(), 5);

# Ok::<(), Box<dyn std::error::Error>>(())
```
*/

pub use self::{
    error::{Error, ErrorKind},
    grammar::{Grammar, Matcher, MemoKind, Order, Repeat, Transform},
    trampoline::{Builder, Config, Matches, Parser, Stats},
    value::{Match, Value},
};

mod coroutine;
mod error;
mod grammar;
mod memo;
mod repeat;
mod resource;
mod trampoline;
mod value;
