/*!
Regular expressions with backreferences, lookarounds and conditionals.

A pattern is parsed into a syntax tree, then compiled into a flat program of
operations shared by three interchangeable engines (see [`Engine`]): a
backtracking interpreter, a simultaneous engine advancing every path in
lockstep, and a restricted flavor of the latter that refuses capture groups,
backreferences and conditionals. All three report the same leftmost-first
match and captures for the patterns they accept.

# Syntax

* Literals, `.` and the escapes `\n \r \t \f \v \a`, octal `\ddd` and hex
  `\xHH`, `\uHHHH` and `\UHHHHHHHH`.
* Classes `[a-z]`, `[^...]` and the shorthands `\d \D \w \W \s \S`.
* Anchors `^ $ \A \Z` and word boundaries `\b \B`.
* Groups `(...)`, `(?:...)`, `(?P<name>...)` and `(?<name>...)`.
* Backreferences `\1` to `\99` and `(?P=name)`.
* Lookarounds `(?=...)`, `(?!...)`, `(?<=...)` and `(?<!...)`. Lookbehinds
  may have any length.
* Conditionals `(?(1)yes|no)` and `(?(name)yes|no)`.
* Repetitions `? * + {m} {m,} {m,n}`, each lazy with a trailing `?`.
* Inline flags `(?imsxaU)`, `(?-i)` and scoped `(?i:...)`, and comments
  `(?#...)`.

# Example

```
use parse_automata::re::{Config, Engine, Regex};

let re = Regex::new(r"(\w+) \1")?;
assert_eq!(re.find("it is is so").map(|s| s.range()), Some(3..8));

let re = Regex::builder()
    .configure(Config::new().engine(Engine::Complex))
    .build(r"(?<=\$)\d+")?;
let prices: Vec<&str> =
    re.find_iter("$12, 7, $3").map(|s| &"$12, 7, $3"[s.range()]).collect();
assert_eq!(prices, vec!["12", "3"]);

# Ok::<(), Box<dyn std::error::Error>>(())
```
*/

pub use self::{
    error::{Error, SyntaxErrorKind},
    groups::{Captures, Span},
    look::Look,
    regex::{Builder, Config, Engine, FindMatches, Regex},
    syntax::Flags,
};

mod backtrack;
mod classes;
mod error;
mod groups;
mod look;
mod pikevm;
mod program;
mod regex;
mod syntax;
