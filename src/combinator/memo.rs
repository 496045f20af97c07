/*!
Memoization of matcher results per stream position.

Both memos key their tables on the memo matcher's own ID and the stream
position, and both cache results incrementally: the underlying computation
is only advanced when a caller has replayed everything cached so far. Every
caller at the same key shares that one underlying computation.

The right memo cannot handle left recursion. If a caller arrives while the
underlying computation is mid-production (which can only happen when the
matcher re-entered itself at the same position), it reports
[`ErrorKind::LeftRecursion`](crate::combinator::ErrorKind::LeftRecursion).

The left memo handles it by giving each nesting depth at a position its own
underlying computation. Every extra level must consume at least one more
symbol to be a legitimate deeper parse, so once the depth exceeds the
remaining input the call is curtailed: it produces nothing. Once the
outermost level has been fully drained, later callers replay it read-only.
*/

use std::collections::HashMap;

use crate::{
    combinator::{
        coroutine::{Resume, Step},
        error::Error,
        trampoline::Context,
        value::Match,
    },
    util::{
        primitives::{CoroutineID, MatcherID},
        stream::Stream,
    },
};

/// Results produced so far at one key, and the computation producing more.
#[derive(Debug)]
struct Cache<S> {
    results: Vec<Match<S>>,
    /// `None` once the underlying computation is exhausted.
    source: Option<CoroutineID>,
    /// Whether some caller is waiting on `source` right now.
    producing: bool,
}

impl<S: Clone> Cache<S> {
    fn new(source: CoroutineID) -> Cache<S> {
        Cache { results: vec![], source: Some(source), producing: false }
    }

    fn is_complete(&self) -> bool {
        self.source.is_none()
    }

    fn replay(&self, index: usize) -> Option<Match<S>> {
        self.results.get(index).cloned()
    }

    fn record(&mut self, m: &Match<S>) {
        self.results.push(m.clone());
        self.producing = false;
    }

    fn finish(&mut self) {
        self.source = None;
        self.producing = false;
    }
}

#[derive(Debug)]
struct LeftEntry<S> {
    levels: Vec<Cache<S>>,
    /// How many callers at this key are waiting on an underlying
    /// computation, which is the current recursion depth.
    depth: usize,
    warned: bool,
}

/// Per-run memo tables.
#[derive(Debug)]
pub(crate) struct MemoTables<S> {
    right: HashMap<(MatcherID, S), Cache<S>>,
    left: HashMap<(MatcherID, S), LeftEntry<S>>,
}

impl<S: Stream> MemoTables<S> {
    pub(crate) fn new() -> MemoTables<S> {
        MemoTables { right: HashMap::new(), left: HashMap::new() }
    }
}

/// A caller of a right memo.
#[derive(Debug)]
pub(crate) struct RightMemo {
    memo: MatcherID,
    inner: MatcherID,
    /// The index of the next cached result to hand out.
    index: usize,
}

impl RightMemo {
    pub(crate) fn new(memo: MatcherID, inner: MatcherID) -> RightMemo {
        RightMemo { memo, inner, index: 0 }
    }

    pub(crate) fn resume<'g, S: Stream>(
        &mut self,
        ctx: &mut Context<'g, S>,
        at: &S,
        input: Resume<S>,
    ) -> Result<Step<S>, Error> {
        let key = (self.memo, at.clone());
        if let Resume::Next = input {
            if !ctx.memo.right.contains_key(&key) {
                let source = ctx.spawn(self.inner, at.clone())?;
                ctx.memo.right.insert(key.clone(), Cache::new(source));
            }
        }
        let cache = match ctx.memo.right.get_mut(&key) {
            None => return Ok(Step::Exhausted),
            Some(cache) => cache,
        };
        match input {
            Resume::Next => {}
            Resume::Value(m) => {
                cache.record(&m);
                self.index += 1;
                return Ok(Step::Yield(m));
            }
            Resume::Exhausted => {
                cache.finish();
                return Ok(Step::Exhausted);
            }
        }
        if let Some(m) = cache.replay(self.index) {
            self.index += 1;
            return Ok(Step::Yield(m));
        }
        match cache.source {
            None => Ok(Step::Exhausted),
            Some(_) if cache.producing => {
                Err(Error::left_recursion(self.memo, at.offset()))
            }
            Some(source) => {
                cache.producing = true;
                Ok(Step::Request(source))
            }
        }
    }
}

#[derive(Debug)]
enum Level {
    /// Not yet assigned; happens on the first request.
    Unassigned,
    /// Reads and drives the cache of this depth.
    Own(usize),
    /// Reads the completed outermost level without driving anything.
    View,
    /// Cut off by the curtailment bound.
    Curtailed,
}

/// A caller of a left-recursion memo.
#[derive(Debug)]
pub(crate) struct LeftMemo {
    memo: MatcherID,
    inner: MatcherID,
    level: Level,
    index: usize,
}

impl LeftMemo {
    pub(crate) fn new(memo: MatcherID, inner: MatcherID) -> LeftMemo {
        LeftMemo { memo, inner, level: Level::Unassigned, index: 0 }
    }

    pub(crate) fn resume<'g, S: Stream>(
        &mut self,
        ctx: &mut Context<'g, S>,
        at: &S,
        input: Resume<S>,
    ) -> Result<Step<S>, Error> {
        let key = (self.memo, at.clone());
        if let Level::Unassigned = self.level {
            self.assign(ctx, &key)?;
        }
        let entry = match ctx.memo.left.get_mut(&key) {
            None => return Ok(Step::Exhausted),
            Some(entry) => entry,
        };
        let depth = match self.level {
            Level::Unassigned | Level::Curtailed => return Ok(Step::Exhausted),
            Level::View => {
                return Ok(match entry.levels[0].replay(self.index) {
                    None => Step::Exhausted,
                    Some(m) => {
                        self.index += 1;
                        Step::Yield(m)
                    }
                });
            }
            Level::Own(depth) => depth,
        };
        let cache = &mut entry.levels[depth];
        match input {
            Resume::Next => {}
            Resume::Value(m) => {
                entry.depth -= 1;
                cache.record(&m);
                self.index += 1;
                return Ok(Step::Yield(m));
            }
            Resume::Exhausted => {
                entry.depth -= 1;
                cache.finish();
                return Ok(Step::Exhausted);
            }
        }
        if let Some(m) = cache.replay(self.index) {
            self.index += 1;
            return Ok(Step::Yield(m));
        }
        match cache.source {
            // Depths follow the number of waiting callers, so another
            // caller producing at this depth means a cut-off re-entry.
            Some(_) if cache.producing => Ok(Step::Exhausted),
            Some(source) => {
                cache.producing = true;
                entry.depth += 1;
                Ok(Step::Request(source))
            }
            None => Ok(Step::Exhausted),
        }
    }

    fn assign<'g, S: Stream>(
        &mut self,
        ctx: &mut Context<'g, S>,
        key: &(MatcherID, S),
    ) -> Result<(), Error> {
        let at = &key.1;
        let (depth, need_source) = {
            let entry = ctx.memo.left.entry(key.clone()).or_insert_with(|| {
                LeftEntry { levels: vec![], depth: 0, warned: false }
            });
            if entry.levels.first().map_or(false, Cache::is_complete) {
                self.level = Level::View;
                return Ok(());
            }
            let depth = entry.depth;
            if depth > at.len() {
                if !entry.warned {
                    entry.warned = true;
                    warn!(
                        "left recursion in matcher {} curtailed at depth {} \
                         ({})",
                        self.memo,
                        depth,
                        at.describe(0),
                    );
                }
                debug!("curtailing matcher {} at {}", self.memo, at.offset());
                self.level = Level::Curtailed;
                return Ok(());
            }
            (depth, depth >= entry.levels.len())
        };
        if need_source {
            let source = ctx.spawn(self.inner, at.clone())?;
            if let Some(entry) = ctx.memo.left.get_mut(key) {
                entry.levels.push(Cache::new(source));
            }
        }
        self.level = Level::Own(depth);
        Ok(())
    }
}
