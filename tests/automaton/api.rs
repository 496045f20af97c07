use parse_automata::{
    automaton::{Automaton, Builder, Config, Regex, DFA, NFA},
    util::stream::{Stream, Text},
};

use crate::Result;

fn sorted(mut labels: Vec<String>) -> Vec<String> {
    labels.sort();
    labels
}

#[test]
fn classes_print_canonically() -> Result<()> {
    assert_eq!(Regex::parse("[a-ca-c]")?.to_string(), "[a-c]");
    assert_eq!(Regex::parse("[c-a]x")?.to_string(), "[a-c]x");
    assert_eq!(Regex::parse("[0-9a-f3-5]")?.to_string(), "[0-9a-f]");
    Ok(())
}

#[test]
fn labels_survive_determinization() -> Result<()> {
    let re = Regex::labelled(&[("int", "[0-9]+"), ("hex", "[0-9a-f]+")])?;
    let dfa = Builder::new().build_dfa(&re)?;

    let (labels, len) = dfa.find("12g").ok_or("no match")?;
    assert_eq!(len, 2);
    assert_eq!(sorted(labels), vec!["hex", "int"]);

    let (labels, len) = dfa.find("1f!").ok_or("no match")?;
    assert_eq!(len, 2);
    assert_eq!(labels, vec!["hex"]);
    assert_eq!(dfa.find("g"), None);
    Ok(())
}

#[test]
fn state_limit_applies_to_both_forms() -> Result<()> {
    let re = Regex::parse("abcdefgh")?;
    let mut builder = Builder::new();
    builder.configure(Config::new().state_limit(4));
    assert!(builder.build_nfa(&re).unwrap_err().is_too_many_states());
    assert!(builder.build_dfa(&re).unwrap_err().is_too_many_states());
    Ok(())
}

#[test]
fn match_lengths_on_a_stream_view() -> Result<()> {
    let text = Text::new("xaab");
    let rest = text.advance(1);
    let nfa = Automaton::nfa("a*b?")?;
    assert_eq!(nfa.match_lengths(&rest), vec![3, 2, 1, 0]);
    let dfa = Automaton::dfa("a*b?")?;
    assert_eq!(dfa.match_lengths(&rest), vec![3]);
    Ok(())
}

#[test]
fn syntax_errors() {
    let err = NFA::new("ab(c").unwrap_err();
    assert!(err.is_syntax());
    assert_eq!(err.offset(), Some(4));
    assert!(DFA::new("a)").unwrap_err().is_syntax());
    assert!(Regex::parse("x(?P<a>y)").unwrap_err().is_label_not_at_top());
}
