/*!
A simultaneous ("Pike VM") interpreter over a compiled [`Program`].

Rather than following one path at a time, every live thread advances one
character at a time in lockstep. Threads are kept in priority order, the
order a backtracking search would try them in, and two threads reaching the
same op at the same offset are merged by keeping the first. Once a thread
matches, every thread behind it is dropped, which yields the same
leftmost-first match a backtracking search would find, without ever
revisiting a (op, offset) pair.

That merge is only sound when the rest of a match cannot depend on the
slots. Programs with backreferences, conditionals or empty-loop registers
run in exact mode instead, where threads merge only when their slots agree
as well, and each thread carries its own slots.

Ops that consume more than one character at once (fused strings and
backreferences) put their thread to sleep in its place in the list until the
search reaches the offset where the consumed text ends, so such threads keep
their priority.

Lookarounds are evaluated by a nested anchored run of this same engine over
the lookaround's body.

The simple flavor of this engine refuses any pattern with capture groups,
backreferences or conditionals, and so only ever tracks the overall match.
*/

use std::{
    collections::{HashMap, HashSet},
    mem,
    sync::Arc,
};

use crate::{
    re::{
        error::Error,
        program::{self, Op, Prefilter, Program, Slot},
        regex::Engine,
    },
    util::{
        primitives::{NonMaxUsize, StateID},
        sparse_set::SparseSet,
    },
};

#[derive(Clone, Debug)]
pub(crate) struct PikeVM {
    program: Arc<Program>,
    cache_lookarounds: bool,
    /// Merge threads by op and slots rather than by op alone.
    exact: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct Cache {
    stack: Vec<FollowEpsilon>,
    clist: Threads,
    nlist: Threads,
    scratch: Vec<Slot>,
    lookarounds: Lookarounds,
}

#[derive(Clone, Debug, Default)]
struct Lookarounds {
    /// Outcomes of cacheable lookarounds, by lookaround id and offset.
    outcomes: HashMap<(usize, usize), bool>,
    /// The cache for nested runs over lookaround bodies, created on first
    /// use and reused by every later lookaround.
    nested: Option<Box<Cache>>,
}

#[derive(Clone, Debug)]
struct Threads {
    set: SparseSet,
    /// The (op, slots) pairs seen in exact mode.
    seen: HashSet<(usize, Vec<Slot>)>,
    list: Vec<Thread>,
    slots: Vec<Slot>,
    slots_per_thread: usize,
}

#[derive(Clone, Debug)]
enum Thread {
    /// Waiting at a consuming op. Its slots live in the thread table.
    At(usize),
    /// Waiting at a consuming op with slots of its own.
    Owned { pc: usize, slots: Vec<Slot> },
    /// Part way through a multi-character op. Continues at `pc` once the
    /// search reaches `wake`.
    Asleep { pc: usize, wake: usize, slots: Vec<Slot> },
}

#[derive(Clone, Debug)]
enum FollowEpsilon {
    Explore(usize),
    RestoreSlot { slot: usize, value: Slot },
}

impl Cache {
    pub(crate) fn new(program: &Program) -> Cache {
        Cache {
            stack: vec![],
            clist: Threads::new(program),
            nlist: Threads::new(program),
            scratch: vec![None; program.slot_len],
            lookarounds: Lookarounds::default(),
        }
    }
}

impl Threads {
    fn new(program: &Program) -> Threads {
        Threads {
            set: SparseSet::new(program.ops.len()),
            seen: HashSet::new(),
            list: vec![],
            slots: vec![None; program.ops.len() * program.slot_len],
            slots_per_thread: program.slot_len,
        }
    }

    fn clear(&mut self) {
        self.set.clear();
        self.seen.clear();
        self.list.clear();
    }

    fn add(&mut self, pc: usize, slots: &[Slot]) {
        let i = pc * self.slots_per_thread;
        self.slots[i..i + self.slots_per_thread].copy_from_slice(slots);
        self.list.push(Thread::At(pc));
    }
}

impl PikeVM {
    /// Create a simultaneous engine. In `simple` mode, patterns that need
    /// capture groups, backreferences or conditionals are refused.
    pub(crate) fn new(
        program: Arc<Program>,
        simple: bool,
        cache_lookarounds: bool,
    ) -> Result<PikeVM, Error> {
        if simple {
            if program.group_len > 1 {
                return Err(Error::unsupported(Engine::Simple, "capture groups"));
            }
            if program.has_backrefs {
                return Err(Error::unsupported(Engine::Simple, "backreferences"));
            }
            if program.has_conditionals {
                return Err(Error::unsupported(Engine::Simple, "conditionals"));
            }
        }
        let exact = program.has_backrefs
            || program.has_conditionals
            || program.slot_len > program.group_len * 2;
        Ok(PikeVM { program, cache_lookarounds, exact })
    }

    pub(crate) fn create_cache(&self) -> Cache {
        Cache::new(&self.program)
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
    ) -> Option<Vec<Slot>> {
        cache.lookarounds.outcomes.clear();
        let init = vec![None; self.program.slot_len];
        self.run(cache, haystack, 0, start, &init, anchored, None, prefilter)
    }

    /// Run the program from `start_pc`, seeding threads with `init`. With
    /// `must_end`, only a match ending at that offset counts and the search
    /// stops there.
    fn run(
        &self,
        cache: &mut Cache,
        haystack: &str,
        start_pc: usize,
        start: usize,
        init: &[Slot],
        anchored: bool,
        must_end: Option<usize>,
        prefilter: Option<&Prefilter>,
    ) -> Option<Vec<Slot>> {
        let Cache {
            ref mut stack,
            ref mut clist,
            ref mut nlist,
            ref mut scratch,
            ref mut lookarounds,
        } = *cache;
        clist.clear();
        nlist.clear();
        let end = must_end.unwrap_or(haystack.len());
        let mut matched = None;
        let mut at = start;
        loop {
            if clist.list.is_empty() {
                if matched.is_some() || (anchored && at > start) {
                    break;
                }
                if !anchored {
                    if let Some(pre) = prefilter {
                        match pre.find(haystack, at) {
                            None => break,
                            Some(i) => at = i,
                        }
                    }
                }
            }
            if matched.is_none() && (!anchored || at == start) {
                scratch.copy_from_slice(init);
                self.epsilon_closure(
                    stack,
                    lookarounds,
                    clist,
                    scratch,
                    start_pc,
                    haystack,
                    at,
                );
            }
            let found = self.steps(
                stack,
                lookarounds,
                clist,
                nlist,
                haystack,
                at,
                must_end,
            );
            if found.is_some() {
                matched = found;
            }
            if at >= end {
                break;
            }
            at = program::next_boundary(haystack, at);
            mem::swap(clist, nlist);
            nlist.clear();
        }
        matched
    }

    /// Advance every thread in `clist` past the character at `at`, in
    /// priority order, adding the survivors to `nlist`. Returns the slots of
    /// a thread that matched at `at`, after which lower priority threads are
    /// dropped.
    fn steps(
        &self,
        stack: &mut Vec<FollowEpsilon>,
        lookarounds: &mut Lookarounds,
        clist: &mut Threads,
        nlist: &mut Threads,
        haystack: &str,
        at: usize,
        must_end: Option<usize>,
    ) -> Option<Vec<Slot>> {
        let next_at = if at < haystack.len() {
            program::next_boundary(haystack, at)
        } else {
            at
        };
        let mut matched = None;
        for thread in clist.list.drain(..) {
            let (pc, mut owned) = match thread {
                Thread::At(pc) => (pc, None),
                Thread::Owned { pc, slots } => (pc, Some(slots)),
                Thread::Asleep { pc, wake, mut slots } => {
                    if wake == next_at {
                        self.epsilon_closure(
                            stack,
                            lookarounds,
                            nlist,
                            &mut slots,
                            pc,
                            haystack,
                            wake,
                        );
                    } else {
                        nlist.list.push(Thread::Asleep { pc, wake, slots });
                    }
                    continue;
                }
            };
            let slots = match owned {
                Some(ref mut slots) => &mut slots[..],
                None => {
                    let i = pc * clist.slots_per_thread;
                    &mut clist.slots[i..i + clist.slots_per_thread]
                }
            };
            let len = match self.program.ops[pc] {
                Op::Char(want) => haystack[at..]
                    .chars()
                    .next()
                    .filter(|&ch| ch == want)
                    .map(char::len_utf8),
                Op::Class(ref set) => haystack[at..]
                    .chars()
                    .next()
                    .filter(|&ch| set.contains(ch))
                    .map(char::len_utf8),
                Op::Str(ref s) => {
                    if haystack[at..].starts_with(&**s) {
                        Some(s.len())
                    } else {
                        None
                    }
                }
                Op::Backref { group, fold, ascii } => Program::span(slots, group)
                    .and_then(|(s, e)| {
                        program::match_text(
                            haystack,
                            at,
                            &haystack[s..e],
                            fold,
                            ascii,
                        )
                    }),
                Op::Match => {
                    if must_end.map_or(true, |end| end == at) {
                        matched = Some(slots.to_vec());
                        break;
                    }
                    None
                }
                _ => None,
            };
            let wake = match len {
                None => continue,
                Some(len) => at + len,
            };
            if wake == next_at {
                self.epsilon_closure(
                    stack,
                    lookarounds,
                    nlist,
                    slots,
                    pc + 1,
                    haystack,
                    wake,
                );
            } else {
                nlist.list.push(Thread::Asleep {
                    pc: pc + 1,
                    wake,
                    slots: slots.to_vec(),
                });
            }
        }
        matched
    }

    /// Add every consuming op reachable from `pc` without consuming input to
    /// `threads`, in priority order. `slots` is restored before returning.
    fn epsilon_closure(
        &self,
        stack: &mut Vec<FollowEpsilon>,
        lookarounds: &mut Lookarounds,
        threads: &mut Threads,
        slots: &mut [Slot],
        pc: usize,
        haystack: &str,
        at: usize,
    ) {
        stack.push(FollowEpsilon::Explore(pc));
        while let Some(frame) = stack.pop() {
            match frame {
                FollowEpsilon::Explore(pc) => self.epsilon_closure_explore(
                    stack,
                    lookarounds,
                    threads,
                    slots,
                    pc,
                    haystack,
                    at,
                ),
                FollowEpsilon::RestoreSlot { slot, value } => {
                    slots[slot] = value;
                }
            }
        }
    }

    fn epsilon_closure_explore(
        &self,
        stack: &mut Vec<FollowEpsilon>,
        lookarounds: &mut Lookarounds,
        threads: &mut Threads,
        slots: &mut [Slot],
        mut pc: usize,
        haystack: &str,
        at: usize,
    ) {
        loop {
            let fresh = if self.exact {
                threads.seen.insert((pc, slots.to_vec()))
            } else {
                // Programs never exceed StateID::LIMIT ops.
                threads.set.insert(StateID::new_unchecked(pc))
            };
            if !fresh {
                return;
            }
            match self.program.ops[pc] {
                Op::Char(_) | Op::Str(_) | Op::Class(_) | Op::Match => {
                    self.add_thread(threads, pc, slots);
                    return;
                }
                Op::Backref { group, .. } => match Program::span(slots, group) {
                    None => return,
                    Some((s, e)) if s == e => pc += 1,
                    Some(_) => {
                        self.add_thread(threads, pc, slots);
                        return;
                    }
                },
                Op::Save(slot) | Op::Mark(slot) => {
                    stack.push(FollowEpsilon::RestoreSlot {
                        slot,
                        value: slots[slot],
                    });
                    slots[slot] = NonMaxUsize::new(at);
                    pc += 1;
                }
                Op::Progress(slot) => {
                    if slots[slot] == NonMaxUsize::new(at) {
                        return;
                    }
                    pc += 1;
                }
                Op::Split(first, second) => {
                    stack.push(FollowEpsilon::Explore(second));
                    pc = first;
                }
                Op::Jmp(to) => pc = to,
                Op::Look(look) => {
                    if !look.matches(haystack, at) {
                        return;
                    }
                    pc += 1;
                }
                Op::Cond { group, no } => {
                    pc = if Program::span(slots, group).is_some() {
                        pc + 1
                    } else {
                        no
                    };
                }
                Op::Lookaround { id, body, next, ahead, negated, cacheable } => {
                    let key = (id, at);
                    let use_cache = cacheable && self.cache_lookarounds;
                    let cached = if use_cache {
                        lookarounds.outcomes.get(&key).copied()
                    } else {
                        None
                    };
                    let holds = match cached {
                        Some(holds) => holds,
                        None => {
                            let found = self.lookaround(
                                &mut lookarounds.nested,
                                haystack,
                                body,
                                at,
                                slots,
                                ahead,
                            );
                            let holds = found.is_some() != negated;
                            if use_cache {
                                lookarounds.outcomes.insert(key, holds);
                            }
                            if let (true, false, Some(found)) =
                                (holds, negated, found)
                            {
                                for (slot, value) in found.into_iter().enumerate()
                                {
                                    if slots[slot] != value {
                                        stack.push(FollowEpsilon::RestoreSlot {
                                            slot,
                                            value: slots[slot],
                                        });
                                        slots[slot] = value;
                                    }
                                }
                            }
                            holds
                        }
                    };
                    if !holds {
                        return;
                    }
                    pc = next;
                }
            }
        }
    }

    fn add_thread(&self, threads: &mut Threads, pc: usize, slots: &[Slot]) {
        if self.exact {
            threads.list.push(Thread::Owned { pc, slots: slots.to_vec() });
        } else {
            threads.add(pc, slots);
        }
    }

    /// Run a lookaround body at `at` in a nested search, returning the slots
    /// it matched with.
    fn lookaround(
        &self,
        nested: &mut Option<Box<Cache>>,
        haystack: &str,
        body: usize,
        at: usize,
        slots: &[Slot],
        ahead: bool,
    ) -> Option<Vec<Slot>> {
        let program = &self.program;
        let cache: &mut Cache =
            nested.get_or_insert_with(|| Box::new(Cache::new(program)));
        cache.lookarounds.outcomes.clear();
        if ahead {
            return self.run(cache, haystack, body, at, slots, true, None, None);
        }
        let mut start = at;
        loop {
            let found = self.run(
                cache,
                haystack,
                body,
                start,
                slots,
                true,
                Some(at),
                None,
            );
            if found.is_some() {
                return found;
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::re::{
        program::Compiler,
        syntax::{parse, Flags},
    };

    fn vm(pattern: &str, simple: bool, fuse: bool) -> Result<PikeVM, Error> {
        let parsed = parse(pattern, Flags::new()).unwrap();
        let program = Compiler::new(fuse, 10_000).compile(&parsed).unwrap();
        PikeVM::new(Arc::new(program), simple, true)
    }

    fn find(pattern: &str, haystack: &str) -> Option<(usize, usize)> {
        let vm = vm(pattern, false, false).unwrap();
        let slots =
            vm.search(&mut vm.create_cache(), haystack, 0, false, None)?;
        Program::span(&slots, 0)
    }

    #[test]
    fn leftmost_first() {
        assert_eq!(find("a|ab", "ab"), Some((0, 1)));
        assert_eq!(find("ab|a", "ab"), Some((0, 2)));
        assert_eq!(find("a+?", "aaa"), Some((0, 1)));
        assert_eq!(find("a+", "baaa"), Some((1, 4)));
        assert_eq!(find("x", "aab"), None);
    }

    #[test]
    fn sleeping_threads_keep_priority() {
        let vm = vm("ab|abc", false, true).unwrap();
        let slots =
            vm.search(&mut vm.create_cache(), "abcd", 0, false, None).unwrap();
        assert_eq!(Program::span(&slots, 0), Some((0, 2)));
        let vm = self::vm("abc|ab", false, true).unwrap();
        let slots =
            vm.search(&mut vm.create_cache(), "abcd", 0, false, None).unwrap();
        assert_eq!(Program::span(&slots, 0), Some((0, 3)));
    }

    #[test]
    fn captures() {
        let vm = vm("(a+)(b)?", false, false).unwrap();
        let slots =
            vm.search(&mut vm.create_cache(), "xaab", 0, false, None).unwrap();
        assert_eq!(Program::span(&slots, 1), Some((1, 3)));
        assert_eq!(Program::span(&slots, 2), Some((3, 4)));
    }

    #[test]
    fn backreferences() {
        assert_eq!(find(r"(a+)b\1", "aaba"), Some((1, 4)));
        assert_eq!(find(r"(ab)\1\1", "ababab"), Some((0, 6)));
        assert_eq!(find(r"(a)?\1b", "b"), None);
    }

    #[test]
    fn lookarounds() {
        assert_eq!(find("a(?=b)", "acab"), Some((2, 3)));
        assert_eq!(find("a(?!b)", "abac"), Some((2, 3)));
        assert_eq!(find("(?<=ab|c)x", "cx"), Some((1, 2)));
        assert_eq!(find("(?<!a)b", "abb"), Some((2, 3)));
    }

    #[test]
    fn lookarounds_reuse_one_nested_cache() {
        let vm = vm("x(?=y)|(?<=z(?=z))z", false, false).unwrap();
        let mut cache = vm.create_cache();
        assert!(cache.lookarounds.nested.is_none());

        let slots = vm.search(&mut cache, "xzxy", 0, false, None).unwrap();
        assert_eq!(Program::span(&slots, 0), Some((2, 3)));
        let nested: *const Cache = match cache.lookarounds.nested {
            Some(ref nested) => &**nested,
            None => panic!("no nested cache after a lookaround"),
        };

        let slots = vm.search(&mut cache, "zzx", 0, false, None).unwrap();
        assert_eq!(Program::span(&slots, 0), Some((1, 2)));
        let again = cache.lookarounds.nested.as_ref().map(|c| &**c as *const Cache);
        assert_eq!(again, Some(nested));
    }

    #[test]
    fn exact_mode_keeps_diverging_captures() {
        // Merging by op alone would keep only the thread with \1 = "a".
        assert_eq!(find(r"(a|ab)(b?)\1$", "abab"), Some((0, 4)));
        assert_eq!(find("(a?)*?b", "aab"), Some((0, 3)));
    }

    #[test]
    fn simple_refuses_groups() {
        assert!(vm("(a)", true, false).unwrap_err().is_unsupported());
        assert!(vm("(?:a)|b", true, false).is_ok());
        assert!(vm("(?=a)a", true, false).is_ok());
    }
}
