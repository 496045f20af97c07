/*!
Nondeterministic finite automata over code point intervals.

An [`NFA`] is built from a [`Regex`] tree by threading every node's edges
through a shared [`Graph`] (see `Node::build`). Each top level alternative
runs from the shared start node to its own exit node, followed by a forced
epsilon step to a terminal node carrying the alternative's label. Terminal
nodes have no outgoing edges, so a loop can never be accepting in the
middle of an iteration.

Matching ([`NFA::matcher`]) is a depth-first search with an explicit stack.
From each node the character transitions are explored first, then epsilon
transitions in descending node order. Since loops are built on nodes
allocated after their exits, this discovers the most iterated (longest)
matches before shallower ones.
*/

use std::collections::HashSet;

use crate::{
    automaton::{error::Error, tree::Regex},
    util::{
        interval::IntervalSet,
        primitives::StateID,
        sparse_set::SparseSet,
        stream::{Stream, Text},
    },
};

/// The identifier of a node in an NFA graph.
pub(crate) type NodeID = StateID;

/// The configuration used for building automata.
#[derive(Clone, Copy, Debug, Default)]
pub struct Config {
    state_limit: Option<usize>,
}

impl Config {
    /// Return a new default configuration.
    pub fn new() -> Config {
        Config::default()
    }

    /// Set the maximum number of nodes in an NFA, which is also the maximum
    /// number of states in a DFA. Building an automaton that needs more
    /// fails.
    ///
    /// The default is 10,000.
    pub fn state_limit(mut self, limit: usize) -> Config {
        self.state_limit = Some(limit);
        self
    }

    /// Returns the state limit.
    pub fn get_state_limit(&self) -> usize {
        self.state_limit.unwrap_or(10_000)
    }

    pub(crate) fn overwrite(self, o: Config) -> Config {
        Config { state_limit: o.state_limit.or(self.state_limit) }
    }
}

/// A builder for NFAs and DFAs.
#[derive(Clone, Debug, Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    /// Create a new builder with its default configuration.
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Apply the given configuration options to this builder.
    pub fn configure(&mut self, config: Config) -> &mut Builder {
        self.config = self.config.overwrite(config);
        self
    }

    pub(crate) fn get_config(&self) -> &Config {
        &self.config
    }

    /// Build an NFA recognizing every alternative of `regex`.
    pub fn build_nfa(&self, regex: &Regex) -> Result<NFA, Error> {
        let mut graph = Graph::new(self.config.get_state_limit());
        let start = graph.add()?;
        for (label, node) in regex.labelled_alternatives() {
            let exit = graph.add()?;
            node.build(&mut graph, start, exit)?;
            let terminal = graph.add()?;
            graph.epsilon(exit, terminal);
            graph.terminate(terminal, label);
        }
        let nfa = graph.finish(start);
        trace!(
            "built NFA with {} nodes from {} alternatives",
            nfa.len(),
            regex.alternatives().len(),
        );
        Ok(nfa)
    }
}

#[derive(Clone, Debug, Default)]
struct Node {
    transitions: Vec<(IntervalSet, NodeID)>,
    /// Sorted in descending order, without duplicates.
    epsilons: Vec<NodeID>,
    labels: Vec<String>,
}

/// An NFA under construction.
#[derive(Debug)]
pub(crate) struct Graph {
    nodes: Vec<Node>,
    limit: usize,
}

impl Graph {
    fn new(limit: usize) -> Graph {
        Graph { nodes: vec![], limit }
    }

    /// Add a new node, returning its ID.
    pub(crate) fn add(&mut self) -> Result<NodeID, Error> {
        let given = self.nodes.len() + 1;
        if given > self.limit {
            return Err(Error::too_many_states(given, self.limit));
        }
        let id = NodeID::new(self.nodes.len())
            .map_err(|_| Error::too_many_states(given, NodeID::LIMIT))?;
        self.nodes.push(Node::default());
        Ok(id)
    }

    /// Add a transition consuming one character from `set`.
    pub(crate) fn connect(&mut self, from: NodeID, to: NodeID, set: IntervalSet) {
        self.nodes[from].transitions.push((set, to));
    }

    /// Add an epsilon transition.
    pub(crate) fn epsilon(&mut self, from: NodeID, to: NodeID) {
        self.nodes[from].epsilons.push(to);
    }

    /// Mark `node` as accepting with `label`.
    pub(crate) fn terminate(&mut self, node: NodeID, label: &str) {
        self.nodes[node].labels.push(label.to_string());
    }

    fn finish(mut self, start: NodeID) -> NFA {
        for node in self.nodes.iter_mut() {
            node.epsilons.sort_by(|a, b| b.cmp(a));
            node.epsilons.dedup();
            node.labels.sort();
            node.labels.dedup();
        }
        NFA { nodes: self.nodes, start }
    }
}

/// A nondeterministic finite automaton with labelled terminal nodes.
#[derive(Clone, Debug)]
pub struct NFA {
    nodes: Vec<Node>,
    start: NodeID,
}

impl NFA {
    /// Parse `pattern` and build an NFA from it with the default
    /// configuration.
    pub fn new(pattern: &str) -> Result<NFA, Error> {
        Builder::new().build_nfa(&Regex::parse(pattern)?)
    }

    /// The number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if this NFA has no nodes. This is never the case for an
    /// NFA produced by a builder.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The start node.
    pub fn start(&self) -> StateID {
        self.start
    }

    /// The labels of the given node. Empty for non-terminal nodes.
    pub fn labels(&self, node: StateID) -> &[String] {
        &self.nodes[node].labels
    }

    pub(crate) fn transitions(&self, node: NodeID) -> &[(IntervalSet, NodeID)] {
        &self.nodes[node].transitions
    }

    /// Adds to `set` every node reachable from `seeds` by epsilon
    /// transitions, the seeds included.
    pub(crate) fn epsilon_closure(
        &self,
        seeds: &[NodeID],
        set: &mut SparseSet,
        stack: &mut Vec<NodeID>,
    ) {
        stack.clear();
        stack.extend(seeds.iter().rev());
        while let Some(id) = stack.pop() {
            if !set.insert(id) {
                continue;
            }
            stack.extend(self.nodes[id].epsilons.iter().rev());
        }
    }

    /// Returns every way this NFA matches at the start of `input`, as the
    /// labels of the terminal reached and the number of characters
    /// consumed, in evaluation order (longest first for greedy loops).
    pub fn matcher<'a, S: Stream>(&'a self, input: &'a S) -> NfaMatches<'a, S> {
        NfaMatches {
            nfa: self,
            input,
            stack: vec![(self.start, 0)],
            seen: HashSet::new(),
        }
    }

    /// Like [`NFA::matcher`], collecting the results for a string.
    pub fn matches(&self, text: &str) -> Vec<(Vec<String>, usize)> {
        let input = Text::new(text);
        self.matcher(&input).map(|(labels, len)| (labels.to_vec(), len)).collect()
    }
}

/// An iterator over the matches of an NFA at the start of a stream.
///
/// Each (node, offset) pair is explored at most once, which both removes
/// duplicate results and stops epsilon cycles.
#[derive(Debug)]
pub struct NfaMatches<'a, S> {
    nfa: &'a NFA,
    input: &'a S,
    stack: Vec<(NodeID, usize)>,
    seen: HashSet<(NodeID, usize)>,
}

impl<'a, S: Stream> Iterator for NfaMatches<'a, S> {
    type Item = (&'a [String], usize);

    fn next(&mut self) -> Option<(&'a [String], usize)> {
        while let Some((id, offset)) = self.stack.pop() {
            if !self.seen.insert((id, offset)) {
                continue;
            }
            let node = &self.nfa.nodes[id];
            // Pushed in reverse so that the first to explore is on top.
            for &e in node.epsilons.iter().rev() {
                self.stack.push((e, offset));
            }
            if let Some(c) = self.input.at(offset) {
                for &(ref set, to) in node.transitions.iter().rev() {
                    if set.contains(c) {
                        self.stack.push((to, offset + 1));
                    }
                }
            }
            if !node.labels.is_empty() {
                return Some((&node.labels, offset));
            }
        }
        None
    }
}
