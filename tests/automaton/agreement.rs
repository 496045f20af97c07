use parse_automata::automaton::{Builder, Regex, DFA, NFA};
use quickcheck::quickcheck;

const PATTERNS: &[&[(&str, &str)]] = &[
    &[("t", "a*")],
    &[("t", "(ab|a)*b")],
    &[("t", "a?b?a?")],
    &[("word", "[a-b]+"), ("num", "[0-9]+"), ("mixed", "[a-b0-9]*0")],
    &[("x", "a(b|0)*"), ("y", "ab*"), ("z", ".")],
    &[("t", "((a|b)(0|a))*")],
];

fn haystack(bytes: &[u8]) -> String {
    let alphabet = ['a', 'b', '0', '!'];
    bytes.iter().take(12).map(|&b| alphabet[usize::from(b) % 4]).collect()
}

fn build(patterns: &[(&str, &str)]) -> Option<(NFA, DFA)> {
    let re = Regex::labelled(patterns).ok()?;
    let builder = Builder::new();
    Some((builder.build_nfa(&re).ok()?, builder.build_dfa(&re).ok()?))
}

/// The longest NFA match with the union of the labels reached at it.
fn nfa_longest(nfa: &NFA, text: &str) -> Option<(Vec<String>, usize)> {
    let matches = nfa.matches(text);
    let longest = matches.iter().map(|m| m.1).max()?;
    let mut labels: Vec<String> = matches
        .into_iter()
        .filter(|m| m.1 == longest)
        .flat_map(|m| m.0)
        .collect();
    labels.sort();
    labels.dedup();
    Some((labels, longest))
}

quickcheck! {
    fn prop_nfa_and_dfa_agree(bytes: Vec<u8>) -> bool {
        let text = haystack(&bytes);
        PATTERNS.iter().all(|patterns| {
            let (nfa, dfa) = match build(patterns) {
                None => return false,
                Some(built) => built,
            };
            let want = nfa_longest(&nfa, &text);
            let got = dfa.find(&text).map(|(mut labels, len)| {
                labels.sort();
                labels.dedup();
                (labels, len)
            });
            want == got
        })
    }

    fn prop_display_round_trips(bytes: Vec<u8>) -> bool {
        let text = haystack(&bytes);
        PATTERNS.iter().all(|patterns| {
            let re = match Regex::labelled(patterns) {
                Ok(re) => re,
                Err(_) => return false,
            };
            let again = match Regex::parse(&re.to_string()) {
                Ok(again) => again,
                Err(_) => return false,
            };
            let builder = Builder::new();
            match (builder.build_dfa(&re), builder.build_dfa(&again)) {
                (Ok(a), Ok(b)) => a.find(&text) == b.find(&text),
                _ => false,
            }
        })
    }
}
