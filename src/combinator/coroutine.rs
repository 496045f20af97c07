/*!
Suspended matcher computations.

Every invocation of a matcher at a stream position becomes a coroutine: a
[`Frame`] holding the matcher's search state, stored in a generational arena
and addressed by [`CoroutineID`]. A frame never calls another frame. When it
needs a child's next result it returns [`Step::Request`] and the trampoline
resumes it later with [`Resume::Value`] or [`Resume::Exhausted`]. That is
what keeps the native stack flat no matter how deep the grammar nests.

Frames own the children they spawn and close them when abandoning a branch.
Closing is recursive. A request for a closed coroutine (abandoned, cut by a
commit, or evicted by the resource budget) behaves as if that coroutine were
exhausted.
*/

use std::borrow::Cow;

use crate::{
    combinator::{
        error::Error,
        grammar::{Matcher, MemoKind, Transform},
        memo::{LeftMemo, RightMemo},
        repeat::{BreadthFirst, DepthFirst},
        trampoline::Context,
        value::{Match, Value},
    },
    util::{
        primitives::{CoroutineID, MatcherID, SmallIndex},
        stream::Stream,
    },
};

/// What the trampoline hands a frame when resuming it.
#[derive(Debug)]
pub(crate) enum Resume<S> {
    /// Produce your next alternative.
    Next,
    /// The child you requested produced this alternative.
    Value(Match<S>),
    /// The child you requested has no more alternatives.
    Exhausted,
}

/// What a frame hands back to the trampoline.
#[derive(Debug)]
pub(crate) enum Step<S> {
    /// Resume this coroutine and deliver its next result to me.
    Request(CoroutineID),
    /// Here is my next alternative.
    Yield(Match<S>),
    /// I have no more alternatives.
    Exhausted,
}

/// A live coroutine.
#[derive(Debug)]
pub(crate) struct Coroutine<'g, S> {
    /// The (resolved) matcher this coroutine runs.
    pub(crate) matcher: MatcherID,
    /// The position the matcher was invoked at.
    pub(crate) stream: S,
    pub(crate) frame: Frame<'g, S>,
    /// Whether this coroutine is on the trampoline's stack.
    pub(crate) active: bool,
    /// Set by a commit that happened while this coroutine was on the stack.
    /// Requests for further alternatives then report exhaustion.
    pub(crate) committed: bool,
    /// When this coroutine was last resumed, for LRU eviction.
    pub(crate) epoch: u64,
}

#[derive(Debug)]
enum Slot<'g, S> {
    Free,
    /// Taken out of the arena while its frame runs.
    Running,
    Live(Coroutine<'g, S>),
}

/// A generational arena of coroutines.
///
/// Freed slots are reused with a bumped generation, so a stale ID can never
/// address a newer coroutine.
#[derive(Debug)]
pub(crate) struct Coroutines<'g, S> {
    slots: Vec<(u32, Slot<'g, S>)>,
    free: Vec<usize>,
    len: usize,
}

impl<'g, S> Coroutines<'g, S> {
    pub(crate) fn new() -> Coroutines<'g, S> {
        Coroutines { slots: vec![], free: vec![], len: 0 }
    }

    /// The number of coroutines alive, including one that is running.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn insert(
        &mut self,
        co: Coroutine<'g, S>,
    ) -> Result<CoroutineID, Error> {
        let slot = match self.free.last() {
            Some(&slot) => slot,
            None => self.slots.len(),
        };
        let index =
            SmallIndex::new(slot).map_err(|_| Error::too_many_coroutines())?;
        if slot == self.slots.len() {
            self.slots.push((0, Slot::Free));
        } else {
            self.free.pop();
        }
        self.slots[slot].1 = Slot::Live(co);
        self.len += 1;
        Ok(CoroutineID::new(index, self.slots[slot].0))
    }

    fn slot_mut(&mut self, cid: CoroutineID) -> Option<&mut Slot<'g, S>> {
        match self.slots.get_mut(cid.slot()) {
            Some(&mut (generation, ref mut slot))
                if generation == cid.generation() =>
            {
                Some(slot)
            }
            _ => None,
        }
    }

    pub(crate) fn get(&self, cid: CoroutineID) -> Option<&Coroutine<'g, S>> {
        match self.slots.get(cid.slot()) {
            Some(&(generation, Slot::Live(ref co)))
                if generation == cid.generation() =>
            {
                Some(co)
            }
            _ => None,
        }
    }

    pub(crate) fn get_mut(
        &mut self,
        cid: CoroutineID,
    ) -> Option<&mut Coroutine<'g, S>> {
        match self.slot_mut(cid) {
            Some(&mut Slot::Live(ref mut co)) => Some(co),
            _ => None,
        }
    }

    /// Take a coroutine out to run it. The slot stays reserved until the
    /// coroutine is restored.
    pub(crate) fn take(&mut self, cid: CoroutineID) -> Option<Coroutine<'g, S>> {
        let slot = self.slot_mut(cid)?;
        match core::mem::replace(slot, Slot::Running) {
            Slot::Live(co) => Some(co),
            other => {
                *slot = other;
                None
            }
        }
    }

    pub(crate) fn restore(&mut self, cid: CoroutineID, co: Coroutine<'g, S>) {
        if let Some(slot) = self.slot_mut(cid) {
            if let Slot::Running = *slot {
                *slot = Slot::Live(co);
            }
        }
    }

    /// Free a coroutine that is not running, returning it.
    pub(crate) fn remove(
        &mut self,
        cid: CoroutineID,
    ) -> Option<Coroutine<'g, S>> {
        let (generation, slot) = self.slots.get_mut(cid.slot())?;
        if *generation != cid.generation() {
            return None;
        }
        match core::mem::replace(slot, Slot::Free) {
            Slot::Live(co) => {
                *generation = generation.wrapping_add(1);
                self.free.push(cid.slot());
                self.len -= 1;
                Some(co)
            }
            other => {
                *slot = other;
                None
            }
        }
    }

    /// Iterate over every coroutine that is alive and not running.
    pub(crate) fn iter(
        &self,
    ) -> impl Iterator<Item = (CoroutineID, &Coroutine<'g, S>)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, &(generation, ref slot))| {
            match *slot {
                Slot::Live(ref co) => {
                    let index = SmallIndex::new_unchecked(i);
                    Some((CoroutineID::new(index, generation), co))
                }
                _ => None,
            }
        })
    }
}

/// The search state of one matcher invocation.
#[derive(Debug)]
pub(crate) enum Frame<'g, S> {
    /// At most one result, computed when the coroutine was spawned.
    Once(Option<Match<S>>),
    /// Token results computed by an automaton, longest first.
    Tokens(std::vec::IntoIter<Match<S>>),
    Commit { done: bool },
    Sequence(Sequence<'g>),
    Alternation(Alternation<'g>),
    Lookahead(Lookahead),
    Transform(TransformFrame<'g>),
    DepthFirst(DepthFirst<'g, S>),
    BreadthFirst(BreadthFirst<'g, S>),
    RightMemo(RightMemo),
    LeftMemo(LeftMemo),
}

impl<'g, S: Stream> Frame<'g, S> {
    /// Create the frame for invoking `matcher` (already resolved, so never
    /// `Delayed`) with identifier `id` at `at`.
    pub(crate) fn new(id: MatcherID, matcher: &'g Matcher, at: &S) -> Frame<'g, S> {
        match *matcher {
            Matcher::Literal(ref text) => {
                let result = if at.starts_with(text) {
                    let rest = at.advance(text.chars().count());
                    Some(Match::new(vec![Value::text(text.as_str())], rest))
                } else {
                    None
                };
                Frame::Once(result)
            }
            Matcher::Any(ref set) => {
                let result = at
                    .at(0)
                    .filter(|&c| set.as_ref().map_or(true, |s| s.contains(c)))
                    .map(|c| {
                        Match::new(vec![Value::Text(c.to_string())], at.advance(1))
                    });
                Frame::Once(result)
            }
            Matcher::Empty => Frame::Once(Some(Match::new(vec![], at.clone()))),
            Matcher::End => {
                let result = if at.is_empty() {
                    Some(Match::new(vec![], at.clone()))
                } else {
                    None
                };
                Frame::Once(result)
            }
            Matcher::Sequence(ref ids) => {
                Frame::Sequence(Sequence::new(Cow::Borrowed(ids)))
            }
            Matcher::Alternation(ref ids) => {
                Frame::Alternation(Alternation::new(ids))
            }
            Matcher::Repeat(ref rep) => {
                use crate::combinator::grammar::Order;

                match rep.order {
                    Order::DepthFirst => Frame::DepthFirst(DepthFirst::new(rep)),
                    Order::BreadthFirst => {
                        Frame::BreadthFirst(BreadthFirst::new(rep))
                    }
                }
            }
            Matcher::Lookahead { inner, negated } => {
                Frame::Lookahead(Lookahead::new(inner, negated))
            }
            Matcher::Transform { inner, ref transform } => {
                Frame::Transform(TransformFrame::new(inner, transform))
            }
            Matcher::Commit => Frame::Commit { done: false },
            Matcher::Memo { inner, kind: MemoKind::Right } => {
                Frame::RightMemo(RightMemo::new(id, inner))
            }
            Matcher::Memo { inner, kind: MemoKind::Left } => {
                Frame::LeftMemo(LeftMemo::new(id, inner))
            }
            Matcher::Regex(ref automaton) => {
                let results: Vec<Match<S>> = automaton
                    .match_lengths(at)
                    .into_iter()
                    .map(|len| {
                        let text = at.slice(0, len);
                        Match::new(vec![Value::Text(text)], at.advance(len))
                    })
                    .collect();
                Frame::Tokens(results.into_iter())
            }
            Matcher::Delayed(_) => {
                unreachable!("Delayed matchers are resolved before spawning")
            }
        }
    }

    /// Resume this frame. `at` is the position the coroutine was invoked at.
    pub(crate) fn resume(
        &mut self,
        ctx: &mut Context<'g, S>,
        at: &S,
        input: Resume<S>,
    ) -> Result<Step<S>, Error> {
        match *self {
            Frame::Once(ref mut result) => {
                debug_assert!(matches!(input, Resume::Next));
                Ok(match result.take() {
                    Some(m) => Step::Yield(m),
                    None => Step::Exhausted,
                })
            }
            Frame::Tokens(ref mut results) => {
                debug_assert!(matches!(input, Resume::Next));
                Ok(match results.next() {
                    Some(m) => Step::Yield(m),
                    None => Step::Exhausted,
                })
            }
            Frame::Commit { ref mut done } => {
                if *done {
                    return Ok(Step::Exhausted);
                }
                *done = true;
                ctx.commit();
                Ok(Step::Yield(Match::new(vec![], at.clone())))
            }
            Frame::Sequence(ref mut f) => f.resume(ctx, at, input),
            Frame::Alternation(ref mut f) => f.resume(ctx, at, input),
            Frame::Lookahead(ref mut f) => f.resume(ctx, at, input),
            Frame::Transform(ref mut f) => f.resume(ctx, at, input),
            Frame::DepthFirst(ref mut f) => f.resume(ctx, at, input),
            Frame::BreadthFirst(ref mut f) => f.resume(ctx, at, input),
            Frame::RightMemo(ref mut f) => f.resume(ctx, at, input),
            Frame::LeftMemo(ref mut f) => f.resume(ctx, at, input),
        }
    }

    /// Drop the alternatives this frame would try after its current child
    /// runs out. Called on every frame on the stack when a commit happens.
    pub(crate) fn cut(&mut self) {
        match *self {
            Frame::Alternation(ref mut f) => f.next = f.alternatives.len(),
            Frame::DepthFirst(ref mut f) => f.cut(),
            Frame::BreadthFirst(ref mut f) => f.cut(),
            _ => {}
        }
    }

    /// The coroutines this frame owns and must close when it is closed.
    pub(crate) fn children(&self) -> Vec<CoroutineID> {
        match *self {
            Frame::Once(_)
            | Frame::Tokens(_)
            | Frame::Commit { .. }
            | Frame::RightMemo(_)
            | Frame::LeftMemo(_) => vec![],
            Frame::Sequence(ref f) => f.stack.iter().map(|&(cid, _)| cid).collect(),
            Frame::Alternation(ref f) => f.current.into_iter().collect(),
            Frame::Lookahead(ref f) => f.child().into_iter().collect(),
            Frame::Transform(ref f) => f.child.into_iter().collect(),
            Frame::DepthFirst(ref f) => f.children(),
            Frame::BreadthFirst(ref f) => f.children(),
        }
    }
}

/// Threads the input through each child in turn, backtracking into earlier
/// children when a later one runs out of alternatives.
#[derive(Debug)]
pub(crate) struct Sequence<'g> {
    children: Cow<'g, [MatcherID]>,
    started: bool,
    /// One entry per started child: its coroutine and the values
    /// accumulated from the children before it.
    stack: Vec<(CoroutineID, Vec<Value>)>,
}

impl<'g> Sequence<'g> {
    pub(crate) fn new(children: Cow<'g, [MatcherID]>) -> Sequence<'g> {
        Sequence { children, started: false, stack: vec![] }
    }

    fn resume<S: Stream>(
        &mut self,
        ctx: &mut Context<'g, S>,
        at: &S,
        input: Resume<S>,
    ) -> Result<Step<S>, Error> {
        match input {
            Resume::Next if !self.started => {
                self.started = true;
                match self.children.first() {
                    None => Ok(Step::Yield(Match::new(vec![], at.clone()))),
                    Some(&first) => self.push(ctx, first, at.clone(), vec![]),
                }
            }
            Resume::Next => match self.stack.last() {
                None => Ok(Step::Exhausted),
                Some(&(cid, _)) => Ok(Step::Request(cid)),
            },
            Resume::Value(m) => {
                let mut values = match self.stack.last() {
                    None => vec![],
                    Some(&(_, ref acc)) => acc.clone(),
                };
                values.extend(m.values);
                match self.children.get(self.stack.len()) {
                    None => Ok(Step::Yield(Match::new(values, m.rest))),
                    Some(&next) => self.push(ctx, next, m.rest, values),
                }
            }
            Resume::Exhausted => {
                self.stack.pop();
                match self.stack.last() {
                    None => Ok(Step::Exhausted),
                    Some(&(cid, _)) => Ok(Step::Request(cid)),
                }
            }
        }
    }

    fn push<S: Stream>(
        &mut self,
        ctx: &mut Context<'g, S>,
        id: MatcherID,
        at: S,
        acc: Vec<Value>,
    ) -> Result<Step<S>, Error> {
        let cid = ctx.spawn(id, at)?;
        self.stack.push((cid, acc));
        Ok(Step::Request(cid))
    }
}

/// Drains each alternative completely, in declared order.
#[derive(Debug)]
pub(crate) struct Alternation<'g> {
    alternatives: &'g [MatcherID],
    next: usize,
    current: Option<CoroutineID>,
}

impl<'g> Alternation<'g> {
    fn new(alternatives: &'g [MatcherID]) -> Alternation<'g> {
        Alternation { alternatives, next: 0, current: None }
    }

    fn resume<S: Stream>(
        &mut self,
        ctx: &mut Context<'g, S>,
        at: &S,
        input: Resume<S>,
    ) -> Result<Step<S>, Error> {
        match input {
            Resume::Value(m) => return Ok(Step::Yield(m)),
            Resume::Exhausted => self.current = None,
            Resume::Next => {}
        }
        if let Some(cid) = self.current {
            return Ok(Step::Request(cid));
        }
        match self.alternatives.get(self.next) {
            None => Ok(Step::Exhausted),
            Some(&id) => {
                self.next += 1;
                let cid = ctx.spawn(id, at.clone())?;
                self.current = Some(cid);
                Ok(Step::Request(cid))
            }
        }
    }
}

#[derive(Debug)]
enum LookaheadState {
    Start,
    Waiting(CoroutineID),
    Done,
}

/// Tests the inner matcher without consuming input.
#[derive(Debug)]
pub(crate) struct Lookahead {
    inner: MatcherID,
    negated: bool,
    state: LookaheadState,
}

impl Lookahead {
    fn new(inner: MatcherID, negated: bool) -> Lookahead {
        Lookahead { inner, negated, state: LookaheadState::Start }
    }

    fn child(&self) -> Option<CoroutineID> {
        match self.state {
            LookaheadState::Waiting(cid) => Some(cid),
            _ => None,
        }
    }

    fn resume<'g, S: Stream>(
        &mut self,
        ctx: &mut Context<'g, S>,
        at: &S,
        input: Resume<S>,
    ) -> Result<Step<S>, Error> {
        let matched = match input {
            Resume::Next => {
                return match self.state {
                    LookaheadState::Start => {
                        let cid = ctx.spawn(self.inner, at.clone())?;
                        self.state = LookaheadState::Waiting(cid);
                        Ok(Step::Request(cid))
                    }
                    _ => Ok(Step::Exhausted),
                };
            }
            Resume::Value(_) => {
                if let LookaheadState::Waiting(cid) = self.state {
                    ctx.close(cid);
                }
                true
            }
            Resume::Exhausted => false,
        };
        self.state = LookaheadState::Done;
        if matched != self.negated {
            Ok(Step::Yield(Match::new(vec![], at.clone())))
        } else {
            Ok(Step::Exhausted)
        }
    }
}

/// Rewrites the values of each inner result, dropping rejected ones.
#[derive(Debug)]
pub(crate) struct TransformFrame<'g> {
    inner: MatcherID,
    transform: &'g Transform,
    child: Option<CoroutineID>,
}

impl<'g> TransformFrame<'g> {
    fn new(inner: MatcherID, transform: &'g Transform) -> TransformFrame<'g> {
        TransformFrame { inner, transform, child: None }
    }

    fn resume<S: Stream>(
        &mut self,
        ctx: &mut Context<'g, S>,
        at: &S,
        input: Resume<S>,
    ) -> Result<Step<S>, Error> {
        match input {
            Resume::Next => match self.child {
                Some(cid) => Ok(Step::Request(cid)),
                None => {
                    let cid = ctx.spawn(self.inner, at.clone())?;
                    self.child = Some(cid);
                    Ok(Step::Request(cid))
                }
            },
            Resume::Value(m) => match self.transform.apply(&m.values) {
                Some(values) => Ok(Step::Yield(Match::new(values, m.rest))),
                None => match self.child {
                    Some(cid) => Ok(Step::Request(cid)),
                    None => Ok(Step::Exhausted),
                },
            },
            Resume::Exhausted => {
                self.child = None;
                Ok(Step::Exhausted)
            }
        }
    }
}
