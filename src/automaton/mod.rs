/*!
Token automata built from small regular expressions over code points.

A pattern is parsed into a [`Regex`] tree, which is a collection of
optionally labelled top level alternatives. The tree compiles to an [`NFA`]
whose terminal nodes carry the labels, and the NFA may be determinized into
a [`DFA`]. Character sets are [`IntervalSet`](crate::util::interval::IntervalSet)s
in canonical form, so equal sets always print the same way.

An [`Automaton`] is what the combinator engine embeds as a matcher: the NFA
form yields every match length at a position, longest first, and the DFA
form yields only the longest.

# Example

```
use parse_automata::automaton::DFA;

let dfa = DFA::new("[0-9]+|[a-z]+")?;
assert_eq!(dfa.find("123abc").map(|(_, len)| len), Some(3));
assert_eq!(dfa.find("!"), None);

# Ok::<(), Box<dyn std::error::Error>>(())
```
*/

pub use self::{
    dfa::DFA,
    error::Error,
    nfa::{Builder, Config, NfaMatches, NFA},
    tree::{Node, Regex, UNLABELLED},
};

use crate::util::stream::Stream;

mod dfa;
mod error;
mod nfa;
mod parse;
mod tree;

/// An automaton usable as a matcher.
#[derive(Clone, Debug)]
pub enum Automaton {
    /// Yields every match length, in evaluation order.
    Nfa(NFA),
    /// Yields only the longest match.
    Dfa(DFA),
}

impl Automaton {
    /// Parse `pattern` into an NFA matcher.
    pub fn nfa(pattern: &str) -> Result<Automaton, Error> {
        NFA::new(pattern).map(Automaton::Nfa)
    }

    /// Parse `pattern` into a DFA matcher.
    pub fn dfa(pattern: &str) -> Result<Automaton, Error> {
        DFA::new(pattern).map(Automaton::Dfa)
    }

    /// The lengths, in characters, of the matches at the start of `input`.
    /// An NFA reports every distinct length in evaluation order. A DFA
    /// reports at most one.
    pub fn match_lengths<S: Stream>(&self, input: &S) -> Vec<usize> {
        match *self {
            Automaton::Nfa(ref nfa) => {
                let mut lengths: Vec<usize> = vec![];
                for (_, len) in nfa.matcher(input) {
                    if !lengths.contains(&len) {
                        lengths.push(len);
                    }
                }
                lengths
            }
            Automaton::Dfa(ref dfa) => {
                dfa.longest_match(input).map(|(_, len)| len).into_iter().collect()
            }
        }
    }
}

impl From<NFA> for Automaton {
    fn from(nfa: NFA) -> Automaton {
        Automaton::Nfa(nfa)
    }
}

impl From<DFA> for Automaton {
    fn from(dfa: DFA) -> Automaton {
        Automaton::Dfa(dfa)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::stream::Text;

    #[test]
    fn nfa_and_dfa_agree_on_longest() {
        for &(pattern, text) in &[
            ("a*", "aaab"),
            ("ab|a", "abc"),
            ("(a|b)*c", "ababcx"),
            ("[0-9]+\\.[0-9]*", "12.5e"),
            ("x", "y"),
        ] {
            let input = Text::new(text);
            let nfa = Automaton::nfa(pattern).unwrap().match_lengths(&input);
            let dfa = Automaton::dfa(pattern).unwrap().match_lengths(&input);
            assert_eq!(nfa.first(), dfa.first(), "pattern {:?}", pattern);
            assert!(dfa.len() <= 1);
        }
    }

    #[test]
    fn nfa_lengths_are_distinct() {
        let input = Text::new("ab");
        let got = Automaton::nfa("ab|a(b)?").unwrap().match_lengths(&input);
        assert_eq!(got, vec![2, 1]);
    }
}
