/*!
Repetition with explicit search structures.

[`DepthFirst`] keeps a stack of partial repetitions and always extends the
deepest one first, so longer repetitions are produced before shorter ones.
[`BreadthFirst`] keeps a queue and produces repetitions in increasing count
order. Neither recurses natively: each extension is a child coroutine
driven through the trampoline.

An extension that consumes nothing is only accepted while the count is
still below the minimum. Past that point it cannot lead anywhere new and
would otherwise loop forever on something like `(x*)*`.
*/

use std::{borrow::Cow, collections::VecDeque};

use crate::{
    combinator::{
        coroutine::{Resume, Step},
        error::Error,
        grammar::Repeat,
        trampoline::Context,
        value::{Match, Value},
    },
    util::{primitives::CoroutineID, stream::Stream},
};

/// Spawn the coroutine that adds one more repetition after `count`
/// repetitions ending at `at`.
fn extend<'g, S: Stream>(
    ctx: &mut Context<'g, S>,
    rep: &'g Repeat,
    count: usize,
    at: S,
) -> Result<CoroutineID, Error> {
    match rep.separator {
        Some(sep) if count > 0 => {
            ctx.spawn_sequence(Cow::Owned(vec![sep, rep.inner]), at)
        }
        _ => ctx.spawn(rep.inner, at),
    }
}

fn can_extend(rep: &Repeat, count: usize) -> bool {
    rep.max.map_or(true, |max| count < max)
}

/// Whether the result of an extension may be kept.
fn accept<S: Stream>(rep: &Repeat, count: usize, from: &S, to: &S) -> bool {
    from != to || count < rep.min
}

#[derive(Debug)]
enum Extension {
    /// Not tried yet.
    Fresh,
    /// The extension coroutine is producing alternatives.
    Running(CoroutineID),
    /// Every extension has been explored.
    Done,
}

#[derive(Debug)]
struct Entry<S> {
    count: usize,
    values: Vec<Value>,
    rest: S,
    extension: Extension,
    /// Set when a commit happened below this entry. It then yields nothing
    /// of its own once its extensions are done.
    cut: bool,
}

/// Greedy repetition: longest first.
#[derive(Debug)]
pub(crate) struct DepthFirst<'g, S> {
    rep: &'g Repeat,
    started: bool,
    stack: Vec<Entry<S>>,
}

impl<'g, S: Stream> DepthFirst<'g, S> {
    pub(crate) fn new(rep: &'g Repeat) -> DepthFirst<'g, S> {
        DepthFirst { rep, started: false, stack: vec![] }
    }

    pub(crate) fn children(&self) -> Vec<CoroutineID> {
        self.stack
            .iter()
            .filter_map(|e| match e.extension {
                Extension::Running(cid) => Some(cid),
                _ => None,
            })
            .collect()
    }

    /// Only the entry being extended survives a commit, and it loses its
    /// own result.
    pub(crate) fn cut(&mut self) {
        let keep = self.stack.len().saturating_sub(1);
        self.stack.drain(..keep);
        if let Some(top) = self.stack.last_mut() {
            top.cut = true;
        }
    }

    pub(crate) fn resume(
        &mut self,
        ctx: &mut Context<'g, S>,
        at: &S,
        input: Resume<S>,
    ) -> Result<Step<S>, Error> {
        match input {
            Resume::Next => {
                if !self.started {
                    self.started = true;
                    self.stack.push(Entry {
                        count: 0,
                        values: vec![],
                        rest: at.clone(),
                        extension: Extension::Fresh,
                        cut: false,
                    });
                }
            }
            Resume::Value(m) => {
                let top = match self.stack.last() {
                    None => return Ok(Step::Exhausted),
                    Some(top) => top,
                };
                if !accept(self.rep, top.count, &top.rest, &m.rest) {
                    if let Extension::Running(cid) = top.extension {
                        return Ok(Step::Request(cid));
                    }
                }
                let mut values = top.values.clone();
                values.extend(m.values);
                let count = top.count + 1;
                self.stack.push(Entry {
                    count,
                    values,
                    rest: m.rest,
                    extension: Extension::Fresh,
                    cut: false,
                });
            }
            Resume::Exhausted => {
                if let Some(top) = self.stack.last_mut() {
                    top.extension = Extension::Done;
                }
            }
        }
        self.advance(ctx)
    }

    fn advance(&mut self, ctx: &mut Context<'g, S>) -> Result<Step<S>, Error> {
        loop {
            let top = match self.stack.last_mut() {
                None => return Ok(Step::Exhausted),
                Some(top) => top,
            };
            match top.extension {
                Extension::Fresh if can_extend(self.rep, top.count) => {
                    let cid = extend(ctx, self.rep, top.count, top.rest.clone())?;
                    top.extension = Extension::Running(cid);
                    return Ok(Step::Request(cid));
                }
                Extension::Fresh => top.extension = Extension::Done,
                Extension::Running(cid) => return Ok(Step::Request(cid)),
                Extension::Done => {
                    let entry = match self.stack.pop() {
                        None => return Ok(Step::Exhausted),
                        Some(entry) => entry,
                    };
                    if entry.count >= self.rep.min && !entry.cut {
                        return Ok(Step::Yield(Match::new(
                            entry.values,
                            entry.rest,
                        )));
                    }
                }
            }
        }
    }
}

/// Lazy repetition: shortest first.
#[derive(Debug)]
pub(crate) struct BreadthFirst<'g, S> {
    rep: &'g Repeat,
    started: bool,
    queue: VecDeque<Entry<S>>,
    /// The entry whose extensions are being drained into the queue.
    expanding: Option<Entry<S>>,
}

impl<'g, S: Stream> BreadthFirst<'g, S> {
    pub(crate) fn new(rep: &'g Repeat) -> BreadthFirst<'g, S> {
        BreadthFirst { rep, started: false, queue: VecDeque::new(), expanding: None }
    }

    /// Entries queued before a commit are dropped. The entry being
    /// expanded has already produced its result.
    pub(crate) fn cut(&mut self) {
        self.queue.clear();
    }

    pub(crate) fn children(&self) -> Vec<CoroutineID> {
        match self.expanding {
            Some(Entry { extension: Extension::Running(cid), .. }) => vec![cid],
            _ => vec![],
        }
    }

    pub(crate) fn resume(
        &mut self,
        ctx: &mut Context<'g, S>,
        at: &S,
        input: Resume<S>,
    ) -> Result<Step<S>, Error> {
        match input {
            Resume::Next => {
                if !self.started {
                    self.started = true;
                    self.queue.push_back(Entry {
                        count: 0,
                        values: vec![],
                        rest: at.clone(),
                        extension: Extension::Fresh,
                        cut: false,
                    });
                }
            }
            Resume::Value(m) => {
                if let Some(ref entry) = self.expanding {
                    if accept(self.rep, entry.count, &entry.rest, &m.rest) {
                        let mut values = entry.values.clone();
                        values.extend(m.values);
                        self.queue.push_back(Entry {
                            count: entry.count + 1,
                            values,
                            rest: m.rest,
                            extension: Extension::Fresh,
                            cut: false,
                        });
                    }
                }
            }
            Resume::Exhausted => self.expanding = None,
        }
        self.advance(ctx)
    }

    fn advance(&mut self, ctx: &mut Context<'g, S>) -> Result<Step<S>, Error> {
        loop {
            if let Some(ref mut entry) = self.expanding {
                match entry.extension {
                    Extension::Fresh if can_extend(self.rep, entry.count) => {
                        let cid = extend(
                            ctx,
                            self.rep,
                            entry.count,
                            entry.rest.clone(),
                        )?;
                        entry.extension = Extension::Running(cid);
                        return Ok(Step::Request(cid));
                    }
                    Extension::Running(cid) => return Ok(Step::Request(cid)),
                    Extension::Fresh | Extension::Done => {
                        self.expanding = None;
                    }
                }
                continue;
            }
            let entry = match self.queue.pop_front() {
                None => return Ok(Step::Exhausted),
                Some(entry) => entry,
            };
            let result = if entry.count >= self.rep.min {
                Some(Match::new(entry.values.clone(), entry.rest.clone()))
            } else {
                None
            };
            self.expanding = Some(entry);
            if let Some(m) = result {
                return Ok(Step::Yield(m));
            }
        }
    }
}
