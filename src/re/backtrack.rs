/*!
A backtracking interpreter over a compiled [`Program`].

The interpreter follows one path through the program at a time. Each
`Split` pushes its second target onto an explicit stack along with the
current offset and groups, and a failing path resumes from the most recent
entry. Since groups are shared until written (see [`Groups`]), pushing an
entry is cheap.

Scanning with something like `.*` pushes one entry per character, all
pointing at the same op, all holding the same groups and with offsets that
grow by a fixed amount. When compression is enabled, such entries collapse
into a single run that remembers its first offset, its step and its length,
and hands its offsets back one at a time, last first, as the search
backtracks into it. A greedy scan over a long haystack then costs a single
stack entry instead of one per character.

Lookarounds run their body as a nested search on the same stack. Lookbehind
bodies are tried at every start offset before the current position, nearest
first, and must end exactly at the current position.
*/

use std::{collections::HashMap, sync::Arc};

use crate::{
    re::{
        groups::Groups,
        program::{self, Op, Prefilter, Program},
    },
    util::primitives::NonMaxUsize,
};

#[derive(Clone, Debug)]
pub(crate) struct Backtracker {
    program: Arc<Program>,
    compress: bool,
    cache_lookarounds: bool,
}

/// Scratch space for a backtracking search.
#[derive(Clone, Debug, Default)]
pub(crate) struct Cache {
    stack: Vec<Frame>,
    /// Outcomes of cacheable lookarounds, by lookaround id and offset.
    lookarounds: HashMap<(usize, usize), bool>,
}

impl Cache {
    pub(crate) fn new() -> Cache {
        Cache::default()
    }

    /// The number of entries currently on the stack. Only useful in tests.
    #[cfg(test)]
    fn stack_len(&self) -> usize {
        self.stack.len()
    }
}

#[derive(Clone, Debug)]
enum Frame {
    /// Resume at `pc` and offset `at`.
    Branch { pc: usize, at: usize, groups: Groups },
    /// Resume at `pc` at each of `start`, `start + step`, ...,
    /// `start + (count - 1) * step`, last first.
    Run { pc: usize, start: usize, step: usize, count: usize, groups: Groups },
}

impl Backtracker {
    pub(crate) fn new(
        program: Arc<Program>,
        compress: bool,
        cache_lookarounds: bool,
    ) -> Backtracker {
        Backtracker { program, compress, cache_lookarounds }
    }

    /// Search for the leftmost match starting at or after `start`, or exactly
    /// at `start` when `anchored`. Returns the slots of the match.
    pub(crate) fn search(
        &self,
        cache: &mut Cache,
        haystack: &str,
        start: usize,
        anchored: bool,
        prefilter: Option<&Prefilter>,
    ) -> Option<Groups> {
        cache.stack.clear();
        cache.lookarounds.clear();
        let mut at = start;
        loop {
            if !anchored {
                if let Some(pre) = prefilter {
                    at = pre.find(haystack, at)?;
                }
            }
            let groups = Groups::new(self.program.slot_len);
            if let Some((_, groups)) =
                self.run(cache, haystack, 0, at, groups, None)
            {
                return Some(groups);
            }
            if anchored || at >= haystack.len() {
                return None;
            }
            at = program::next_boundary(haystack, at);
        }
    }

    /// Run the program from `pc` at `at` until it reaches a `Match`, using the
    /// part of the stack above its current height. With `must_end`, a `Match`
    /// only counts at that offset.
    fn run(
        &self,
        cache: &mut Cache,
        haystack: &str,
        pc: usize,
        at: usize,
        groups: Groups,
        must_end: Option<usize>,
    ) -> Option<(usize, Groups)> {
        let base = cache.stack.len();
        cache.stack.push(Frame::Branch { pc, at, groups });
        while let Some((pc, at, groups)) = pop(&mut cache.stack, base) {
            let found =
                self.step(cache, haystack, base, pc, at, groups, must_end);
            if found.is_some() {
                cache.stack.truncate(base);
                return found;
            }
        }
        None
    }

    /// Follow one path until it matches or fails, pushing the alternatives it
    /// passes over.
    fn step(
        &self,
        cache: &mut Cache,
        haystack: &str,
        base: usize,
        mut pc: usize,
        mut at: usize,
        mut groups: Groups,
        must_end: Option<usize>,
    ) -> Option<(usize, Groups)> {
        loop {
            match self.program.ops[pc] {
                Op::Char(want) => match haystack[at..].chars().next() {
                    Some(ch) if ch == want => {
                        at += ch.len_utf8();
                        pc += 1;
                    }
                    _ => return None,
                },
                Op::Str(ref s) => {
                    if !haystack[at..].starts_with(&**s) {
                        return None;
                    }
                    at += s.len();
                    pc += 1;
                }
                Op::Class(ref set) => match haystack[at..].chars().next() {
                    Some(ch) if set.contains(ch) => {
                        at += ch.len_utf8();
                        pc += 1;
                    }
                    _ => return None,
                },
                Op::Save(slot) | Op::Mark(slot) => {
                    groups.set(slot, NonMaxUsize::new(at));
                    pc += 1;
                }
                Op::Progress(slot) => {
                    if groups.get(slot) == NonMaxUsize::new(at) {
                        return None;
                    }
                    pc += 1;
                }
                Op::Split(first, second) => {
                    self.push(&mut cache.stack, base, second, at, groups.clone());
                    pc = first;
                }
                Op::Jmp(to) => pc = to,
                Op::Look(look) => {
                    if !look.matches(haystack, at) {
                        return None;
                    }
                    pc += 1;
                }
                Op::Lookaround { id, body, next, ahead, negated, cacheable } => {
                    let key = (id, at);
                    let cached = if cacheable && self.cache_lookarounds {
                        cache.lookarounds.get(&key).copied()
                    } else {
                        None
                    };
                    let holds = match cached {
                        Some(holds) => holds,
                        None => {
                            let found = self.lookaround(
                                cache,
                                haystack,
                                body,
                                at,
                                &groups,
                                ahead,
                            );
                            let holds = found.is_some() != negated;
                            if cacheable && self.cache_lookarounds {
                                cache.lookarounds.insert(key, holds);
                            }
                            if holds && !negated {
                                if let Some(found) = found {
                                    groups = found;
                                }
                            }
                            holds
                        }
                    };
                    if !holds {
                        return None;
                    }
                    pc = next;
                }
                Op::Backref { group, fold, ascii } => {
                    let (s, e) = groups.span(group)?;
                    at += program::match_text(
                        haystack,
                        at,
                        &haystack[s..e],
                        fold,
                        ascii,
                    )?;
                    pc += 1;
                }
                Op::Cond { group, no } => {
                    pc = if groups.span(group).is_some() { pc + 1 } else { no };
                }
                Op::Match => {
                    if must_end.map_or(true, |end| end == at) {
                        return Some((at, groups));
                    }
                    return None;
                }
            }
        }
    }

    /// Run a lookaround body at `at`, returning the groups it matched with.
    fn lookaround(
        &self,
        cache: &mut Cache,
        haystack: &str,
        body: usize,
        at: usize,
        groups: &Groups,
        ahead: bool,
    ) -> Option<Groups> {
        if ahead {
            return self
                .run(cache, haystack, body, at, groups.clone(), None)
                .map(|(_, groups)| groups);
        }
        let mut start = at;
        loop {
            if let Some((_, groups)) =
                self.run(cache, haystack, body, start, groups.clone(), Some(at))
            {
                return Some(groups);
            }
            if start == 0 {
                return None;
            }
            start -= 1;
            while !haystack.is_char_boundary(start) {
                start -= 1;
            }
        }
    }

    /// Push an alternative, folding it into the entry on top of the stack
    /// when both are one step of the same scan. Entries at or below `base`
    /// belong to an enclosing search and are never folded into.
    fn push(
        &self,
        stack: &mut Vec<Frame>,
        base: usize,
        pc: usize,
        at: usize,
        groups: Groups,
    ) {
        if self.compress && stack.len() > base {
            let top = stack.len() - 1;
            match stack[top] {
                Frame::Branch { pc: top_pc, at: top_at, groups: ref g }
                    if top_pc == pc && at > top_at && g.ptr_eq(&groups) =>
                {
                    stack[top] = Frame::Run {
                        pc,
                        start: top_at,
                        step: at - top_at,
                        count: 2,
                        groups,
                    };
                    return;
                }
                Frame::Run { pc: top_pc, start, step, ref mut count, groups: ref g }
                    if top_pc == pc
                        && at == start + step * *count
                        && g.ptr_eq(&groups) =>
                {
                    *count += 1;
                    return;
                }
                _ => {}
            }
        }
        stack.push(Frame::Branch { pc, at, groups });
    }
}

/// Take the most recent entry above `base` off the stack.
fn pop(stack: &mut Vec<Frame>, base: usize) -> Option<(usize, usize, Groups)> {
    if stack.len() <= base {
        return None;
    }
    match stack.last_mut()? {
        &mut Frame::Run { pc, start, step, ref mut count, ref groups } => {
            *count -= 1;
            let entry = (pc, start + step * *count, groups.clone());
            if *count == 0 {
                stack.pop();
            }
            Some(entry)
        }
        &mut Frame::Branch { .. } => match stack.pop()? {
            Frame::Branch { pc, at, groups } => Some((pc, at, groups)),
            Frame::Run { .. } => None,
        },
    }
}
