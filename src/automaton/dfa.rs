/*!
Deterministic finite automata built by subset construction.

Each DFA state stands for the epsilon closure of a set of NFA nodes. The
outgoing character transitions of those nodes may overlap partially, so
the character space they cover is first split into disjoint fragments.
Every fragment leads to exactly one target set, and fragments leading to
the same target set become a single edge. A DFA state is terminal with the
union of the labels of its NFA nodes.
*/

use std::collections::{hash_map::Entry, HashMap};

use crate::{
    automaton::{
        error::Error,
        nfa::{Builder, NFA},
        tree::Regex,
    },
    util::{
        interval::{Boundaries, Interval, IntervalSet},
        primitives::StateID,
        sparse_set::SparseSet,
        stream::{Stream, Text},
    },
};

#[derive(Clone, Debug)]
struct State {
    /// Disjoint and sorted by start, for lookup.
    edges: Vec<(Interval, StateID)>,
    labels: Vec<String>,
}

/// A deterministic finite automaton with labelled terminal states.
#[derive(Clone, Debug)]
pub struct DFA {
    states: Vec<State>,
}

impl DFA {
    /// Parse `pattern` and build a DFA from it with the default
    /// configuration.
    pub fn new(pattern: &str) -> Result<DFA, Error> {
        Builder::new().build_dfa(&Regex::parse(pattern)?)
    }

    /// Determinize an NFA, failing if more than `limit` states are needed.
    pub(crate) fn determinize(nfa: &NFA, limit: usize) -> Result<DFA, Error> {
        let mut set = SparseSet::new(nfa.len());
        let mut stack = vec![];
        let mut seeds = vec![];
        let mut keys: Vec<Vec<StateID>> = vec![];
        let mut ids: HashMap<Vec<StateID>, StateID> = HashMap::new();
        let mut states = vec![];

        nfa.epsilon_closure(&[nfa.start()], &mut set, &mut stack);
        let start = closure_key(&set);
        ids.insert(start.clone(), StateID::ZERO);
        keys.push(start);

        let mut next = 0;
        while next < keys.len() {
            let mut boundaries = Boundaries::new();
            for &node in keys[next].iter() {
                for &(ref chars, _) in nfa.transitions(node) {
                    boundaries.add_set(chars);
                }
            }
            let mut edges = vec![];
            for fragment in boundaries.fragments() {
                seeds.clear();
                for &node in keys[next].iter() {
                    for &(ref chars, to) in nfa.transitions(node) {
                        if chars.contains(fragment.start()) {
                            seeds.push(to);
                        }
                    }
                }
                if seeds.is_empty() {
                    continue;
                }
                set.clear();
                nfa.epsilon_closure(&seeds, &mut set, &mut stack);
                let key = closure_key(&set);
                let target = match ids.entry(key) {
                    Entry::Occupied(e) => *e.get(),
                    Entry::Vacant(e) => {
                        let given = keys.len() + 1;
                        if given > limit {
                            return Err(Error::too_many_states(given, limit));
                        }
                        let id = StateID::new(keys.len()).map_err(|_| {
                            Error::too_many_states(given, StateID::LIMIT)
                        })?;
                        keys.push(e.key().clone());
                        e.insert(id);
                        id
                    }
                };
                push_edge(&mut edges, fragment, target);
            }
            let mut labels = vec![];
            for &node in keys[next].iter() {
                labels.extend(nfa.labels(node).iter().cloned());
            }
            labels.sort();
            labels.dedup();
            states.push(State { edges, labels });
            next += 1;
        }
        debug!(
            "determinized NFA with {} nodes into DFA with {} states",
            nfa.len(),
            states.len(),
        );
        Ok(DFA { states })
    }

    /// The number of states.
    pub fn state_len(&self) -> usize {
        self.states.len()
    }

    /// The start state.
    pub fn start(&self) -> StateID {
        StateID::ZERO
    }

    /// The labels of `state`. Empty for non-terminal states.
    pub fn labels(&self, state: StateID) -> &[String] {
        &self.states[state].labels
    }

    /// The state reached from `state` on `c`, if any.
    pub fn next_state(&self, state: StateID, c: char) -> Option<StateID> {
        let edges = &self.states[state].edges;
        let i = edges.partition_point(|&(r, _)| r.end() < c);
        match edges.get(i) {
            Some(&(r, to)) if r.contains(c) => Some(to),
            _ => None,
        }
    }

    /// The outgoing edges of `state`, one per target state, in order of
    /// their smallest character.
    pub fn edges(&self, state: StateID) -> Vec<(IntervalSet, StateID)> {
        let mut out: Vec<(IntervalSet, StateID)> = vec![];
        for &(r, to) in self.states[state].edges.iter() {
            match out.iter_mut().find(|e| e.1 == to) {
                Some(e) => e.0.push(r),
                None => out.push((IntervalSet::new(vec![r]), to)),
            }
        }
        out
    }

    /// Run this DFA from the start of `input`, returning the labels and the
    /// length of the longest accepted prefix.
    pub fn longest_match<S: Stream>(
        &self,
        input: &S,
    ) -> Option<(&[String], usize)> {
        let mut state = self.start();
        let mut last = None;
        let mut offset = 0;
        loop {
            if !self.states[state].labels.is_empty() {
                last = Some((self.labels(state), offset));
            }
            let c = match input.at(offset) {
                None => break,
                Some(c) => c,
            };
            state = match self.next_state(state, c) {
                None => break,
                Some(next) => next,
            };
            offset += 1;
        }
        last
    }

    /// Like [`DFA::longest_match`] for a string, returning owned labels.
    pub fn find(&self, text: &str) -> Option<(Vec<String>, usize)> {
        let input = Text::new(text);
        self.longest_match(&input).map(|(labels, len)| (labels.to_vec(), len))
    }
}

fn closure_key(set: &SparseSet) -> Vec<StateID> {
    let mut key = set.as_slice().to_vec();
    key.sort();
    key
}

/// Append an edge, merging it with the previous one when both are adjacent
/// and lead to the same state.
fn push_edge(edges: &mut Vec<(Interval, StateID)>, r: Interval, to: StateID) {
    if let Some(last) = edges.last_mut() {
        if last.1 == to
            && u32::from(last.0.end()) + 1 == u32::from(r.start())
        {
            last.0 = Interval::new(last.0.start(), r.end());
            return;
        }
    }
    edges.push((r, to));
}

impl Builder {
    /// Build a DFA recognizing every alternative of `regex`.
    pub fn build_dfa(&self, regex: &Regex) -> Result<DFA, Error> {
        let nfa = self.build_nfa(regex)?;
        DFA::determinize(&nfa, self.get_config().get_state_limit())
    }
}
