/*!
The regular expression tree used to build token automata.

A [`Regex`] is a collection of top level alternatives, each optionally
[`Node::Labelled`]. When an automaton accepts, it reports the labels of the
alternatives that matched, which is what lets one automaton recognize many
kinds of token at once. A label anywhere other than directly on a top level
alternative is an error.
*/

use core::fmt;

use crate::{
    automaton::{
        error::Error,
        nfa::{Graph, NodeID},
        parse,
    },
    util::interval::{write_escaped, IntervalSet},
};

/// The label given to top level alternatives that do not carry one.
pub const UNLABELLED: &str = "";

/// A node in a regular expression tree.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Node {
    /// One character from the set.
    Character(IntervalSet),
    /// Each child in turn. An empty sequence matches the empty string.
    Sequence(Vec<Node>),
    /// Zero or more repetitions.
    Repeat(Box<Node>),
    /// Zero or one occurrence.
    Option(Box<Node>),
    /// Any one of the alternatives.
    Choice(Vec<Node>),
    /// A named top level alternative.
    Labelled(String, Box<Node>),
}

impl Node {
    /// A sequence matching `text` literally.
    pub fn literal(text: &str) -> Node {
        let mut chars: Vec<Node> =
            text.chars().map(|c| Node::Character(IntervalSet::single(c))).collect();
        if chars.len() == 1 {
            chars.pop().unwrap_or(Node::Sequence(vec![]))
        } else {
            Node::Sequence(chars)
        }
    }

    /// Add the edges recognizing this node between `entry` and `exit`.
    ///
    /// Character nodes add one labelled edge. Sequences chain their children
    /// through fresh intermediate nodes. A repeat loops on a fresh node so
    /// that the loop cannot leak into sibling alternatives sharing `entry`.
    pub(crate) fn build(
        &self,
        graph: &mut Graph,
        entry: NodeID,
        exit: NodeID,
    ) -> Result<(), Error> {
        match *self {
            Node::Character(ref set) => {
                graph.connect(entry, exit, set.clone());
            }
            Node::Sequence(ref children) => {
                if children.is_empty() {
                    graph.epsilon(entry, exit);
                    return Ok(());
                }
                let mut cur = entry;
                for (i, child) in children.iter().enumerate() {
                    let next =
                        if i + 1 == children.len() { exit } else { graph.add()? };
                    child.build(graph, cur, next)?;
                    cur = next;
                }
            }
            Node::Repeat(ref inner) => {
                let lp = graph.add()?;
                graph.epsilon(entry, lp);
                inner.build(graph, lp, lp)?;
                graph.epsilon(lp, exit);
            }
            Node::Option(ref inner) => {
                inner.build(graph, entry, exit)?;
                graph.epsilon(entry, exit);
            }
            Node::Choice(ref alternatives) => {
                for alt in alternatives.iter() {
                    alt.build(graph, entry, exit)?;
                }
            }
            Node::Labelled(ref label, _) => {
                return Err(Error::label_not_at_top(label));
            }
        }
        Ok(())
    }

    fn check_labels(&self) -> Result<(), Error> {
        match *self {
            Node::Character(_) => Ok(()),
            Node::Sequence(ref children) | Node::Choice(ref children) => {
                children.iter().try_for_each(Node::check_labels)
            }
            Node::Repeat(ref inner) | Node::Option(ref inner) => {
                inner.check_labels()
            }
            Node::Labelled(ref label, _) => Err(Error::label_not_at_top(label)),
        }
    }

    /// Writes this node, parenthesized unless it is a single character.
    fn fmt_atom(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Node::Character(_) => write!(f, "{}", self),
            _ => write!(f, "({})", self),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Node::Character(ref set) => match set.as_single() {
                Some(c) => write_escaped(f, c, false),
                None => write!(f, "{}", set),
            },
            Node::Sequence(ref children) => {
                for child in children.iter() {
                    match *child {
                        Node::Choice(_) | Node::Sequence(_) => child.fmt_atom(f)?,
                        _ => write!(f, "{}", child)?,
                    }
                }
                Ok(())
            }
            Node::Repeat(ref inner) => {
                inner.fmt_atom(f)?;
                write!(f, "*")
            }
            Node::Option(ref inner) => {
                inner.fmt_atom(f)?;
                write!(f, "?")
            }
            Node::Choice(ref alternatives) => {
                for (i, alt) in alternatives.iter().enumerate() {
                    if i > 0 {
                        write!(f, "|")?;
                    }
                    match *alt {
                        Node::Choice(_) => alt.fmt_atom(f)?,
                        _ => write!(f, "{}", alt)?,
                    }
                }
                Ok(())
            }
            Node::Labelled(ref label, ref inner) => {
                write!(f, "(?P<{}>{})", label, inner)
            }
        }
    }
}

/// A collection of top level alternatives, each of which may be labelled.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Regex {
    alternatives: Vec<Node>,
}

impl Regex {
    /// Create a collection from its top level alternatives.
    ///
    /// Only the alternatives themselves may be [`Node::Labelled`].
    pub fn new(alternatives: Vec<Node>) -> Result<Regex, Error> {
        for alt in alternatives.iter() {
            match *alt {
                Node::Labelled(_, ref inner) => inner.check_labels()?,
                ref node => node.check_labels()?,
            }
        }
        Ok(Regex { alternatives })
    }

    /// Parse a pattern. Top level alternatives written `(?P<name>...)` are
    /// labelled with `name`.
    pub fn parse(pattern: &str) -> Result<Regex, Error> {
        Regex::new(parse::parse(pattern)?)
    }

    /// Build a collection from several named patterns.
    pub fn labelled<L: AsRef<str>, P: AsRef<str>>(
        patterns: &[(L, P)],
    ) -> Result<Regex, Error> {
        let mut alternatives = vec![];
        for &(ref label, ref pattern) in patterns.iter() {
            let node = parse::parse_node(pattern.as_ref())?;
            alternatives
                .push(Node::Labelled(label.as_ref().to_string(), Box::new(node)));
        }
        Regex::new(alternatives)
    }

    /// The top level alternatives.
    pub fn alternatives(&self) -> &[Node] {
        &self.alternatives
    }

    /// Each alternative with its label.
    pub(crate) fn labelled_alternatives(
        &self,
    ) -> impl Iterator<Item = (&str, &Node)> + '_ {
        self.alternatives.iter().map(|alt| match *alt {
            Node::Labelled(ref label, ref inner) => (label.as_str(), &**inner),
            ref node => (UNLABELLED, node),
        })
    }
}

impl fmt::Display for Regex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, alt) in self.alternatives.iter().enumerate() {
            if i > 0 {
                write!(f, "|")?;
            }
            match *alt {
                Node::Choice(_) => alt.fmt_atom(f)?,
                _ => write!(f, "{}", alt)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(pattern: &str) -> String {
        Regex::parse(pattern).unwrap().to_string()
    }

    #[test]
    fn canonical_classes() {
        assert_eq!(round_trip("[a-c]"), "[a-c]");
        assert_eq!(round_trip("[c-a]"), "[a-c]");
        assert_eq!(round_trip("[a-cb-d]"), "[a-d]");
        assert_eq!(round_trip("[a-cd]"), "[a-d]");
        assert_eq!(round_trip("[ac]"), "[ac]");
        assert_eq!(round_trip("[a]"), "a");
        assert_eq!(round_trip("[*]"), "\\*");
    }

    #[test]
    fn display_reparses_to_same_tree() {
        for pattern in &[
            "abc",
            "a*b",
            "(ab)*c",
            "a|b|c",
            "(a|b)c",
            "a(b|c)*",
            "[0-9]+",
            "x?y",
            "((a|b)*c)?",
            "\\(\\)",
            ".",
            "a|",
        ] {
            let first = Regex::parse(pattern).unwrap();
            let again = Regex::parse(&first.to_string()).unwrap();
            assert_eq!(first, again, "pattern {:?}", pattern);
        }
    }

    #[test]
    fn labels_only_at_top() {
        assert!(Regex::parse("(?P<a>x)|(?P<b>y)").is_ok());
        let err = Regex::parse("z(?P<a>x)").unwrap_err();
        assert!(err.is_label_not_at_top());
        let err = Regex::new(vec![Node::Repeat(Box::new(Node::Labelled(
            "n".to_string(),
            Box::new(Node::literal("a")),
        )))])
        .unwrap_err();
        assert!(err.is_label_not_at_top());
    }

    #[test]
    fn labelled_collection_display() {
        let re = Regex::labelled(&[("int", "[0-9]+"), ("word", "[a-z]+")])
            .unwrap();
        assert_eq!(re.to_string(), "(?P<int>[0-9][0-9]*)|(?P<word>[a-z][a-z]*)");
        assert_eq!(Regex::parse(&re.to_string()).unwrap(), re);
    }
}
