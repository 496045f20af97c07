/*!
The matcher graph.

A [`Grammar`] is an arena of [`Matcher`]s addressed by [`MatcherID`]. Edges
are IDs, so a grammar is free to be cyclic: a recursive rule is expressed by
adding a [`Matcher::Delayed`] placeholder, using its ID wherever the rule is
referenced, and binding it to the rule's definition once the definition
exists. Binding happens exactly once.

Every traversal in this module tracks visited matchers, so cycles are
visited once and never followed forever.
*/

use core::fmt;

use std::{collections::HashMap, rc::Rc};

use crate::{
    automaton::Automaton,
    combinator::{error::Error, value::Value},
    util::{interval::IntervalSet, primitives::MatcherID},
};

/// A function applied to the values produced by a successful inner match.
///
/// Returning `None` rejects that alternative, so a transform may also act as
/// a semantic predicate.
#[derive(Clone)]
pub struct Transform(Rc<dyn Fn(&[Value]) -> Option<Vec<Value>>>);

impl Transform {
    /// Create a transform from a function that may reject its input.
    pub fn new<F>(f: F) -> Transform
    where
        F: Fn(&[Value]) -> Option<Vec<Value>> + 'static,
    {
        Transform(Rc::new(f))
    }

    /// Create a transform that always succeeds, replacing the values with
    /// the single value returned by `f`.
    pub fn map<F>(f: F) -> Transform
    where
        F: Fn(&[Value]) -> Value + 'static,
    {
        Transform::new(move |values| Some(vec![f(values)]))
    }

    /// Create a transform that wraps the values in a named node.
    pub fn node(name: &str) -> Transform {
        let name = name.to_string();
        Transform::map(move |values| Value::node(name.clone(), values.to_vec()))
    }

    pub(crate) fn apply(&self, values: &[Value]) -> Option<Vec<Value>> {
        (self.0)(values)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Transform({:p})", Rc::as_ptr(&self.0) as *const u8)
    }
}

/// The order in which a repetition explores its alternatives.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Order {
    /// Longest first. An explicit stack extends the deepest state before
    /// backing off.
    DepthFirst,
    /// Shortest first. An explicit queue yields states in increasing count.
    BreadthFirst,
}

/// The parameters of a [`Matcher::Repeat`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Repeat {
    /// The repeated matcher.
    pub inner: MatcherID,
    /// The minimum number of repetitions (inclusive).
    pub min: usize,
    /// The maximum number of repetitions (inclusive), or unbounded.
    pub max: Option<usize>,
    /// The exploration order.
    pub order: Order,
    /// A matcher required between consecutive repetitions.
    pub separator: Option<MatcherID>,
}

/// The memoization strategy wrapped around a matcher.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MemoKind {
    /// Caches results per position and shares one underlying computation.
    /// Detects left recursion and reports it as an error.
    Right,
    /// Handles left recursion by giving each recursion depth its own
    /// underlying computation, curtailed by the remaining input length.
    Left,
}

/// A single node in a [`Grammar`].
#[derive(Clone, Debug)]
pub enum Matcher {
    /// Matches the given text exactly, producing it as a text value.
    Literal(String),
    /// Matches one character in the set (or any character when `None`).
    Any(Option<IntervalSet>),
    /// Matches the empty string once.
    Empty,
    /// Matches only at the end of the stream.
    End,
    /// Matches each child in turn, concatenating their values.
    Sequence(Vec<MatcherID>),
    /// Produces every alternative of each child, in declared order.
    Alternation(Vec<MatcherID>),
    /// Bounded or unbounded repetition.
    Repeat(Repeat),
    /// Succeeds without consuming input when `inner` matches (or, when
    /// negated, when it does not).
    Lookahead {
        /// The matcher tested.
        inner: MatcherID,
        /// Whether the polarity is inverted.
        negated: bool,
    },
    /// A forward reference, bound exactly once.
    Delayed(Option<MatcherID>),
    /// Rewrites the values of each result of `inner`.
    Transform {
        /// The matcher whose results are rewritten.
        inner: MatcherID,
        /// The rewrite.
        transform: Transform,
    },
    /// Matches the empty string and discards all pending alternatives.
    Commit,
    /// Caches the results of `inner` per stream position.
    Memo {
        /// The memoized matcher.
        inner: MatcherID,
        /// The memoization strategy.
        kind: MemoKind,
    },
    /// Matches a token with a compiled automaton, producing its text.
    Regex(Rc<Automaton>),
}

impl Matcher {
    /// Returns the IDs of this matcher's direct children, in order.
    pub fn children(&self) -> Vec<MatcherID> {
        match *self {
            Matcher::Literal(_)
            | Matcher::Any(_)
            | Matcher::Empty
            | Matcher::End
            | Matcher::Commit
            | Matcher::Regex(_)
            | Matcher::Delayed(None) => vec![],
            Matcher::Sequence(ref ids) | Matcher::Alternation(ref ids) => {
                ids.clone()
            }
            Matcher::Repeat(ref rep) => {
                let mut ids = vec![rep.inner];
                ids.extend(rep.separator);
                ids
            }
            Matcher::Lookahead { inner, .. }
            | Matcher::Transform { inner, .. }
            | Matcher::Memo { inner, .. }
            | Matcher::Delayed(Some(inner)) => vec![inner],
        }
    }

    /// A short name for this matcher's variant, used in diagnostics.
    pub fn name(&self) -> &'static str {
        match *self {
            Matcher::Literal(_) => "Literal",
            Matcher::Any(_) => "Any",
            Matcher::Empty => "Empty",
            Matcher::End => "End",
            Matcher::Sequence(_) => "Sequence",
            Matcher::Alternation(_) => "Alternation",
            Matcher::Repeat(_) => "Repeat",
            Matcher::Lookahead { negated: false, .. } => "Lookahead",
            Matcher::Lookahead { negated: true, .. } => "Not",
            Matcher::Delayed(_) => "Delayed",
            Matcher::Transform { .. } => "Transform",
            Matcher::Commit => "Commit",
            Matcher::Memo { kind: MemoKind::Right, .. } => "RMemo",
            Matcher::Memo { kind: MemoKind::Left, .. } => "LMemo",
            Matcher::Regex(_) => "Regex",
        }
    }

    fn map_children<F: Fn(MatcherID) -> MatcherID>(&self, f: F) -> Matcher {
        match *self {
            Matcher::Sequence(ref ids) => {
                Matcher::Sequence(ids.iter().map(|&id| f(id)).collect())
            }
            Matcher::Alternation(ref ids) => {
                Matcher::Alternation(ids.iter().map(|&id| f(id)).collect())
            }
            Matcher::Repeat(ref rep) => Matcher::Repeat(Repeat {
                inner: f(rep.inner),
                separator: rep.separator.map(&f),
                ..*rep
            }),
            Matcher::Lookahead { inner, negated } => {
                Matcher::Lookahead { inner: f(inner), negated }
            }
            Matcher::Delayed(target) => Matcher::Delayed(target.map(f)),
            Matcher::Transform { inner, ref transform } => {
                Matcher::Transform { inner: f(inner), transform: transform.clone() }
            }
            Matcher::Memo { inner, kind } => {
                Matcher::Memo { inner: f(inner), kind }
            }
            ref leaf => leaf.clone(),
        }
    }
}

/// An arena of matchers.
#[derive(Clone, Debug, Default)]
pub struct Grammar {
    matchers: Vec<Matcher>,
}

impl Grammar {
    /// Create an empty grammar.
    pub fn new() -> Grammar {
        Grammar::default()
    }

    /// Returns the number of matchers in this grammar.
    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    /// Returns true if this grammar has no matchers.
    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// Add a matcher, returning its ID.
    ///
    /// Every child ID must already belong to this grammar.
    pub fn add(&mut self, matcher: Matcher) -> Result<MatcherID, Error> {
        for child in matcher.children() {
            self.check(child)?;
        }
        let id = MatcherID::new(self.matchers.len())
            .map_err(|_| Error::too_many_matchers(self.matchers.len() + 1))?;
        self.matchers.push(matcher);
        Ok(id)
    }

    /// Returns the matcher with the given ID.
    pub fn get(&self, id: MatcherID) -> Result<&Matcher, Error> {
        self.matchers.get(id.as_usize()).ok_or_else(|| Error::unknown_matcher(id))
    }

    fn check(&self, id: MatcherID) -> Result<(), Error> {
        self.get(id).map(|_| ())
    }

    /// Add a literal matcher.
    pub fn literal(&mut self, text: &str) -> Result<MatcherID, Error> {
        self.add(Matcher::Literal(text.to_string()))
    }

    /// Add a matcher for any single character.
    pub fn any(&mut self) -> Result<MatcherID, Error> {
        self.add(Matcher::Any(None))
    }

    /// Add a matcher for a single character in `set`.
    pub fn any_of(&mut self, set: IntervalSet) -> Result<MatcherID, Error> {
        self.add(Matcher::Any(Some(set)))
    }

    /// Add a matcher for the empty string.
    pub fn empty(&mut self) -> Result<MatcherID, Error> {
        self.add(Matcher::Empty)
    }

    /// Add a matcher that only matches at the end of the stream.
    pub fn end(&mut self) -> Result<MatcherID, Error> {
        self.add(Matcher::End)
    }

    /// Add a sequence of matchers.
    pub fn sequence(&mut self, ids: &[MatcherID]) -> Result<MatcherID, Error> {
        self.add(Matcher::Sequence(ids.to_vec()))
    }

    /// Add an ordered alternation.
    pub fn alternation(
        &mut self,
        ids: &[MatcherID],
    ) -> Result<MatcherID, Error> {
        self.add(Matcher::Alternation(ids.to_vec()))
    }

    /// Add a repetition of `inner` between `min` and `max` times.
    pub fn repeat(
        &mut self,
        inner: MatcherID,
        min: usize,
        max: Option<usize>,
        order: Order,
    ) -> Result<MatcherID, Error> {
        self.add(Matcher::Repeat(Repeat {
            inner,
            min,
            max,
            order,
            separator: None,
        }))
    }

    /// Add a repetition of `inner` with `separator` between repetitions.
    pub fn separated(
        &mut self,
        inner: MatcherID,
        separator: MatcherID,
        min: usize,
        max: Option<usize>,
        order: Order,
    ) -> Result<MatcherID, Error> {
        self.add(Matcher::Repeat(Repeat {
            inner,
            min,
            max,
            order,
            separator: Some(separator),
        }))
    }

    /// Add a positive lookahead.
    pub fn lookahead(&mut self, inner: MatcherID) -> Result<MatcherID, Error> {
        self.add(Matcher::Lookahead { inner, negated: false })
    }

    /// Add a negative lookahead.
    pub fn not(&mut self, inner: MatcherID) -> Result<MatcherID, Error> {
        self.add(Matcher::Lookahead { inner, negated: true })
    }

    /// Add an unbound forward reference. Bind it with [`Grammar::bind`].
    pub fn delayed(&mut self) -> Result<MatcherID, Error> {
        self.add(Matcher::Delayed(None))
    }

    /// Add a transform of the results of `inner`.
    pub fn transform(
        &mut self,
        inner: MatcherID,
        transform: Transform,
    ) -> Result<MatcherID, Error> {
        self.add(Matcher::Transform { inner, transform })
    }

    /// Add a cut.
    pub fn commit(&mut self) -> Result<MatcherID, Error> {
        self.add(Matcher::Commit)
    }

    /// Wrap `inner` in a memo of the given kind.
    pub fn memoize(
        &mut self,
        inner: MatcherID,
        kind: MemoKind,
    ) -> Result<MatcherID, Error> {
        self.add(Matcher::Memo { inner, kind })
    }

    /// Add a token matcher backed by a compiled automaton.
    pub fn regex(&mut self, automaton: Automaton) -> Result<MatcherID, Error> {
        self.add(Matcher::Regex(Rc::new(automaton)))
    }

    /// Bind the `Delayed` matcher `delayed` to `target`.
    ///
    /// Binding a matcher that is already bound, or one that is not
    /// `Delayed`, is an error.
    pub fn bind(
        &mut self,
        delayed: MatcherID,
        target: MatcherID,
    ) -> Result<(), Error> {
        self.check(target)?;
        let slot = self
            .matchers
            .get_mut(delayed.as_usize())
            .ok_or_else(|| Error::unknown_matcher(delayed))?;
        match *slot {
            Matcher::Delayed(None) => {
                *slot = Matcher::Delayed(Some(target));
                Ok(())
            }
            Matcher::Delayed(Some(_)) => Err(Error::already_bound(delayed)),
            _ => Err(Error::not_delayed(delayed)),
        }
    }

    /// Swap the polarity of a lookahead in place, leaving its inner matcher
    /// untouched. A bound `Delayed` matcher is followed to its target.
    ///
    /// This returns an error if `lookahead` does not lead to a lookahead.
    pub fn invert(&mut self, lookahead: MatcherID) -> Result<(), Error> {
        let id = self.resolve(lookahead)?;
        match self.matchers[id.as_usize()] {
            Matcher::Lookahead { ref mut negated, .. } => {
                *negated = !*negated;
                Ok(())
            }
            _ => Err(Error::not_lookahead(lookahead)),
        }
    }

    /// Follows `Delayed` matchers starting at `id` until reaching a concrete
    /// matcher, and returns that matcher's ID.
    pub fn resolve(&self, id: MatcherID) -> Result<MatcherID, Error> {
        let mut cur = id;
        // A chain longer than the grammar must revisit some matcher.
        for _ in 0..=self.len() {
            match *self.get(cur)? {
                Matcher::Delayed(None) => return Err(Error::unbound(cur)),
                Matcher::Delayed(Some(next)) => cur = next,
                _ => return Ok(cur),
            }
        }
        Err(Error::delayed_cycle(id))
    }

    /// Returns every matcher reachable from `root` exactly once, children
    /// before parents. Cycles are cut at the first revisit.
    pub fn walk(&self, root: MatcherID) -> Result<Vec<MatcherID>, Error> {
        self.check(root)?;
        let mut seen = vec![false; self.len()];
        let mut order = vec![];
        // Each entry is a matcher and the index of the next child to visit.
        let mut stack = vec![(root, 0)];
        seen[root] = true;
        while let Some(&mut (id, ref mut next)) = stack.last_mut() {
            let children = self.matchers[id].children();
            if let Some(&child) = children.get(*next) {
                *next += 1;
                if !seen[child] {
                    seen[child] = true;
                    stack.push((child, 0));
                }
            } else {
                order.push(id);
                stack.pop();
            }
        }
        Ok(order)
    }

    /// Copy every matcher reachable from `root`, returning the ID of the
    /// copy of `root`. Edges between copied matchers (cycles through
    /// `Delayed` included) point at the copies; token automata and
    /// transform functions are shared.
    pub fn clone_subgraph(
        &mut self,
        root: MatcherID,
    ) -> Result<MatcherID, Error> {
        let reachable = self.walk(root)?;
        let base = self.len();
        let mut map = HashMap::with_capacity(reachable.len());
        for (i, &old) in reachable.iter().enumerate() {
            let new = MatcherID::new(base + i)
                .map_err(|_| Error::too_many_matchers(base + i + 1))?;
            map.insert(old, new);
        }
        for &old in reachable.iter() {
            let copy = self.matchers[old].map_children(|id| map[&id]);
            self.matchers.push(copy);
        }
        trace!("cloned {} matchers reachable from {}", reachable.len(), root);
        Ok(map[&root])
    }

    /// Render the graph reachable from `root` as text. A matcher that has
    /// already been rendered, or that is still being rendered because of a
    /// cycle, appears as `#id`.
    pub fn describe(&self, root: MatcherID) -> String {
        use core::fmt::Write;

        enum Piece {
            Visit(MatcherID),
            Text(&'static str),
        }

        let mut out = String::new();
        let mut seen = vec![false; self.len()];
        let mut stack = vec![Piece::Visit(root)];
        while let Some(piece) = stack.pop() {
            let id = match piece {
                Piece::Text(text) => {
                    out.push_str(text);
                    continue;
                }
                Piece::Visit(id) => id,
            };
            let matcher = match self.matchers.get(id.as_usize()) {
                None => {
                    let _ = write!(out, "?{}", id);
                    continue;
                }
                Some(m) => m,
            };
            if seen[id] {
                let _ = write!(out, "#{}", id);
                continue;
            }
            seen[id] = true;
            let children = match *matcher {
                Matcher::Literal(ref text) => {
                    let _ = write!(out, "Literal({:?})", text);
                    continue;
                }
                Matcher::Any(None) => {
                    out.push_str("Any()");
                    continue;
                }
                Matcher::Any(Some(ref set)) => {
                    let _ = write!(out, "Any({})", set);
                    continue;
                }
                Matcher::Repeat(ref rep) => {
                    let _ = write!(out, "Repeat{{{}", rep.min);
                    match rep.max {
                        None => out.push_str(",}("),
                        Some(max) => {
                            let _ = write!(out, ",{}}}(", max);
                        }
                    }
                    let mut children = vec![rep.inner];
                    children.extend(rep.separator);
                    children
                }
                Matcher::Delayed(Some(_)) => {
                    let _ = write!(out, "Delayed#{}(", id);
                    matcher.children()
                }
                _ => {
                    out.push_str(matcher.name());
                    out.push('(');
                    matcher.children()
                }
            };
            // Pushed last to first so that they pop in order.
            stack.push(Piece::Text(")"));
            for (i, &child) in children.iter().enumerate().rev() {
                stack.push(Piece::Visit(child));
                if i > 0 {
                    stack.push(Piece::Text(", "));
                }
            }
        }
        out
    }
}

impl core::ops::Index<MatcherID> for Grammar {
    type Output = Matcher;

    fn index(&self, id: MatcherID) -> &Matcher {
        &self.matchers[id]
    }
}

#[cfg(test)]
mod tests {
    use crate::combinator::ErrorKind;

    use super::*;

    #[test]
    fn delayed_binds_once() {
        let mut g = Grammar::new();
        let a = g.literal("a").unwrap();
        let d = g.delayed().unwrap();
        assert_eq!(
            g.resolve(d).unwrap_err().kind(),
            &ErrorKind::Unbound { matcher: d }
        );
        g.bind(d, a).unwrap();
        assert_eq!(g.resolve(d).unwrap(), a);
        assert_eq!(
            g.bind(d, a).unwrap_err().kind(),
            &ErrorKind::AlreadyBound { matcher: d }
        );
        assert_eq!(
            g.bind(a, d).unwrap_err().kind(),
            &ErrorKind::NotDelayed { matcher: a }
        );
    }

    #[test]
    fn delayed_cycle_is_reported() {
        let mut g = Grammar::new();
        let d1 = g.delayed().unwrap();
        let d2 = g.delayed().unwrap();
        g.bind(d1, d2).unwrap();
        g.bind(d2, d1).unwrap();
        assert_eq!(
            g.resolve(d1).unwrap_err().kind(),
            &ErrorKind::DelayedCycle { matcher: d1 }
        );
    }

    #[test]
    fn walk_visits_cycle_once() {
        // list := 'a' list | 'a'
        let mut g = Grammar::new();
        let list = g.delayed().unwrap();
        let a = g.literal("a").unwrap();
        let more = g.sequence(&[a, list]).unwrap();
        let alt = g.alternation(&[more, a]).unwrap();
        g.bind(list, alt).unwrap();

        let order = g.walk(list).unwrap();
        assert_eq!(order.len(), 4);
        assert_eq!(*order.last().unwrap(), list);
        assert_eq!(order[0], a);
    }

    #[test]
    fn clone_preserves_cycle() {
        let mut g = Grammar::new();
        let list = g.delayed().unwrap();
        let a = g.literal("a").unwrap();
        let more = g.sequence(&[a, list]).unwrap();
        let alt = g.alternation(&[more, a]).unwrap();
        g.bind(list, alt).unwrap();

        let copy = g.clone_subgraph(list).unwrap();
        assert_eq!(g.len(), 8);
        let walked = g.walk(copy).unwrap();
        assert_eq!(walked.len(), 4);
        assert!(walked.iter().all(|id| id.as_usize() >= 4));
        assert_eq!(copy.as_usize(), 7);
        assert_eq!(g.resolve(copy).unwrap().as_usize(), 6);
    }

    #[test]
    fn invert_flips_polarity() {
        let mut g = Grammar::new();
        let a = g.literal("a").unwrap();
        let la = g.lookahead(a).unwrap();
        g.invert(la).unwrap();
        assert!(matches!(g[la], Matcher::Lookahead { negated: true, .. }));
        g.invert(la).unwrap();
        assert!(matches!(g[la], Matcher::Lookahead { negated: false, .. }));

        let d = g.delayed().unwrap();
        g.bind(d, la).unwrap();
        g.invert(d).unwrap();
        assert!(matches!(g[la], Matcher::Lookahead { negated: true, .. }));

        assert_eq!(
            g.invert(a).unwrap_err().kind(),
            &ErrorKind::NotLookahead { matcher: a }
        );
        let unbound = g.delayed().unwrap();
        assert_eq!(
            g.invert(unbound).unwrap_err().kind(),
            &ErrorKind::Unbound { matcher: unbound }
        );
    }

    #[test]
    fn unknown_children_are_rejected() {
        let mut g = Grammar::new();
        let mut other = Grammar::new();
        other.literal("x").unwrap();
        let foreign = other.literal("y").unwrap();
        assert_eq!(
            g.sequence(&[foreign]).unwrap_err().kind(),
            &ErrorKind::UnknownMatcher { matcher: foreign }
        );
    }

    #[test]
    fn describe_cuts_cycles() {
        let mut g = Grammar::new();
        let d = g.delayed().unwrap();
        let a = g.literal("a").unwrap();
        let seq = g.sequence(&[a, d]).unwrap();
        g.bind(d, seq).unwrap();
        assert_eq!(
            g.describe(d),
            "Delayed#0(Sequence(Literal(\"a\"), #0))"
        );
    }

    #[test]
    fn describe_deep_grammars() {
        let mut g = Grammar::new();
        let a = g.literal("a").unwrap();
        let star = g.repeat(a, 0, None, Order::DepthFirst).unwrap();
        let mut id = g.alternation(&[star, a]).unwrap();
        assert_eq!(
            g.describe(id),
            "Alternation(Repeat{0,}(Literal(\"a\")), #0)"
        );

        for _ in 0..100_000 {
            id = g.sequence(&[id]).unwrap();
        }
        let text = g.describe(id);
        assert!(text.starts_with("Sequence(Sequence("));
        assert!(text.ends_with("#0))))"));
        assert_eq!(text.matches('(').count(), text.matches(')').count());
    }
}
