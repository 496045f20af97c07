/*!
The opcode graph shared by every regex engine, and the compiler producing
it from a parsed pattern.

A [`Program`] is a flat list of [`Op`]s. Most ops continue with the op that
follows them, while `Split`, `Jmp`, `Cond` and `Lookaround` name their
successors explicitly. Execution starts at op 0 and succeeds upon reaching
`Match`.

Slots hold offsets into the haystack. The first `2 * group_len` slots are
the start and end of each capture group, with group 0 being the overall
match. The slots after them are loop registers: an unbounded repetition
whose body can match the empty string records the offset at which each
iteration began (`Mark`), and refuses to finish an iteration that did not
move past it (`Progress`). This is what keeps `(a?)*` from looping forever.

Counted repetitions are unrolled: `e{2,4}` becomes `e e (e (e)?)?`, so the
engines never need loop counters.
*/

use memchr::memmem;

use crate::{
    re::{
        classes,
        error::Error,
        look::Look,
        syntax::{Ast, Parsed},
    },
    util::{
        interval::IntervalSet,
        primitives::{NonMaxUsize, StateID},
    },
};

/// A single offset into the haystack, or nothing.
pub(crate) type Slot = Option<NonMaxUsize>;

/// A placeholder for a jump target that has not been compiled yet.
const HOLE: usize = usize::MAX;

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Op {
    /// Consume this character.
    Char(char),
    /// Consume this string. Only emitted when literals are fused.
    Str(Box<str>),
    /// Consume one character from the set.
    Class(IntervalSet),
    /// Record the current offset in a capture slot.
    Save(usize),
    /// Try the first target, then the second.
    Split(usize, usize),
    Jmp(usize),
    /// Continue only if the assertion holds here.
    Look(Look),
    /// Record the current offset in a loop register.
    Mark(usize),
    /// Fail if the loop register holds the current offset.
    Progress(usize),
    /// Run the sub-program at `body` (which ends in its own `Match`) as an
    /// assertion, then continue at `next`.
    ///
    /// A lookbehind's body must match ending exactly at the current offset.
    /// When `cacheable` is set, the body neither reads nor writes any capture
    /// group, so its outcome only depends on the offset.
    Lookaround {
        id: usize,
        body: usize,
        next: usize,
        ahead: bool,
        negated: bool,
        cacheable: bool,
    },
    /// Consume the text last captured by the group. A group that did not
    /// participate in the match makes this fail.
    Backref { group: usize, fold: bool, ascii: bool },
    /// Continue with the next op if the group participated in the match,
    /// otherwise at `no`.
    Cond { group: usize, no: usize },
    Match,
}

/// A compiled pattern.
#[derive(Clone, Debug)]
pub(crate) struct Program {
    pub(crate) ops: Vec<Op>,
    /// The number of capture groups, including group 0.
    pub(crate) group_len: usize,
    /// The number of slots, capture slots and loop registers together.
    pub(crate) slot_len: usize,
    pub(crate) lookaround_len: usize,
    pub(crate) has_backrefs: bool,
    pub(crate) has_conditionals: bool,
    /// A literal that every match begins with, if any.
    pub(crate) prefix: String,
}

impl Program {
    /// Returns the capture span of `group` recorded in `slots`.
    #[inline]
    pub(crate) fn span(slots: &[Slot], group: usize) -> Option<(usize, usize)> {
        match (slots.get(group * 2), slots.get(group * 2 + 1)) {
            (Some(&Some(start)), Some(&Some(end))) if start <= end => {
                Some((start.get(), end.get()))
            }
            _ => None,
        }
    }
}

/// Compiles a parsed pattern into a program.
#[derive(Clone, Debug)]
pub(crate) struct Compiler {
    fuse_literals: bool,
    size_limit: usize,
}

impl Compiler {
    pub(crate) fn new(fuse_literals: bool, size_limit: usize) -> Compiler {
        Compiler { fuse_literals, size_limit: size_limit.min(StateID::LIMIT) }
    }

    pub(crate) fn compile(&self, parsed: &Parsed) -> Result<Program, Error> {
        let group_len = parsed.names.len();
        let mut c = Compilation {
            compiler: self,
            ops: vec![],
            loops: 0,
            group_len,
            lookarounds: 0,
        };
        c.emit(Op::Save(0))?;
        c.c(&parsed.ast)?;
        c.emit(Op::Save(1))?;
        c.emit(Op::Match)?;
        let ops = c.ops;
        let program = Program {
            has_backrefs: ops.iter().any(|op| matches!(*op, Op::Backref { .. })),
            has_conditionals: ops.iter().any(|op| matches!(*op, Op::Cond { .. })),
            slot_len: group_len * 2 + c.loops,
            lookaround_len: c.lookarounds,
            group_len,
            prefix: parsed.ast.prefix(),
            ops,
        };
        trace!(
            "compiled regex program with {} ops, {} groups, {} loop \
             registers and {} lookarounds",
            program.ops.len(),
            program.group_len,
            c.loops,
            program.lookaround_len,
        );
        Ok(program)
    }
}

struct Compilation<'c> {
    compiler: &'c Compiler,
    ops: Vec<Op>,
    loops: usize,
    group_len: usize,
    lookarounds: usize,
}

impl<'c> Compilation<'c> {
    fn pc(&self) -> usize {
        self.ops.len()
    }

    fn emit(&mut self, op: Op) -> Result<usize, Error> {
        if self.ops.len() >= self.compiler.size_limit {
            return Err(Error::exceeded_size_limit(self.compiler.size_limit));
        }
        self.ops.push(op);
        Ok(self.ops.len() - 1)
    }

    /// Point the unfilled target of the op at `pc` to `to`.
    fn patch(&mut self, pc: usize, to: usize) {
        match self.ops[pc] {
            Op::Split(ref mut first, ref mut second) => {
                if *first == HOLE {
                    *first = to;
                } else {
                    *second = to;
                }
            }
            Op::Jmp(ref mut next)
            | Op::Cond { no: ref mut next, .. }
            | Op::Lookaround { ref mut next, .. } => *next = to,
            _ => {}
        }
    }

    /// Emit a split preferring the next op when `greedy`, leaving the other
    /// target to be patched.
    fn split(&mut self, greedy: bool) -> Result<usize, Error> {
        let next = self.pc() + 1;
        if greedy {
            self.emit(Op::Split(next, HOLE))
        } else {
            self.emit(Op::Split(HOLE, next))
        }
    }

    fn c(&mut self, ast: &Ast) -> Result<(), Error> {
        match *ast {
            Ast::Empty => {}
            Ast::Literal(ch) => {
                self.emit(Op::Char(ch))?;
            }
            Ast::Class(ref set) => {
                match set.as_single() {
                    Some(ch) => self.emit(Op::Char(ch))?,
                    None => self.emit(Op::Class(set.clone()))?,
                };
            }
            Ast::Look(look) => {
                self.emit(Op::Look(look))?;
            }
            Ast::Group { index, ref ast } => {
                self.emit(Op::Save(index * 2))?;
                self.c(ast)?;
                self.emit(Op::Save(index * 2 + 1))?;
            }
            Ast::Concat(ref asts) => self.c_concat(asts)?,
            Ast::Alternation(ref asts) => self.c_alternation(asts)?,
            Ast::Repetition { ref ast, min, max, greedy } => {
                self.c_repetition(ast, min, max, greedy)?
            }
            Ast::Lookaround { ref ast, ahead, negated } => {
                let id = self.lookarounds;
                self.lookarounds += 1;
                let pc = self.emit(Op::Lookaround {
                    id,
                    body: self.pc() + 1,
                    next: HOLE,
                    ahead,
                    negated,
                    cacheable: !has_groups(ast) && !ast.has_references(),
                })?;
                self.c(ast)?;
                self.emit(Op::Match)?;
                let end = self.pc();
                self.patch(pc, end);
            }
            Ast::Backref { index, fold, ascii } => {
                self.emit(Op::Backref { group: index, fold, ascii })?;
            }
            Ast::Conditional { index, ref yes, ref no } => {
                let cond = self.emit(Op::Cond { group: index, no: HOLE })?;
                self.c(yes)?;
                let jmp = self.emit(Op::Jmp(HOLE))?;
                let no_pc = self.pc();
                self.patch(cond, no_pc);
                self.c(no)?;
                let end = self.pc();
                self.patch(jmp, end);
            }
        }
        Ok(())
    }

    fn c_concat(&mut self, asts: &[Ast]) -> Result<(), Error> {
        let mut i = 0;
        while i < asts.len() {
            if self.compiler.fuse_literals {
                let mut run = String::new();
                let mut n = 0;
                while let Some(&Ast::Literal(ch)) = asts.get(i + n) {
                    run.push(ch);
                    n += 1;
                }
                if n > 1 {
                    self.emit(Op::Str(run.into_boxed_str()))?;
                    i += n;
                    continue;
                }
            }
            self.c(&asts[i])?;
            i += 1;
        }
        Ok(())
    }

    fn c_alternation(&mut self, asts: &[Ast]) -> Result<(), Error> {
        let mut jumps = vec![];
        for (i, ast) in asts.iter().enumerate() {
            if i + 1 == asts.len() {
                self.c(ast)?;
                break;
            }
            let split = self.split(true)?;
            self.c(ast)?;
            jumps.push(self.emit(Op::Jmp(HOLE))?);
            let next = self.pc();
            self.patch(split, next);
        }
        let end = self.pc();
        for jmp in jumps {
            self.patch(jmp, end);
        }
        Ok(())
    }

    fn c_repetition(
        &mut self,
        ast: &Ast,
        min: u32,
        max: Option<u32>,
        greedy: bool,
    ) -> Result<(), Error> {
        for _ in 0..min {
            self.c(ast)?;
        }
        let max = match max {
            None => return self.c_star(ast, greedy),
            Some(max) => max,
        };
        let mut splits = vec![];
        for _ in min..max {
            splits.push(self.split(greedy)?);
            self.c(ast)?;
        }
        let end = self.pc();
        for split in splits {
            self.patch(split, end);
        }
        Ok(())
    }

    fn c_star(&mut self, ast: &Ast, greedy: bool) -> Result<(), Error> {
        let guard = if ast.min_len() == 0 {
            let register = self.group_len * 2 + self.loops;
            self.loops += 1;
            Some(register)
        } else {
            None
        };
        let top = self.split(greedy)?;
        if let Some(register) = guard {
            self.emit(Op::Mark(register))?;
        }
        self.c(ast)?;
        if let Some(register) = guard {
            self.emit(Op::Progress(register))?;
        }
        self.emit(Op::Jmp(top))?;
        let end = self.pc();
        self.patch(top, end);
        Ok(())
    }
}

fn has_groups(ast: &Ast) -> bool {
    match *ast {
        Ast::Group { .. } => true,
        Ast::Empty
        | Ast::Literal(_)
        | Ast::Class(_)
        | Ast::Look(_)
        | Ast::Backref { .. } => false,
        Ast::Repetition { ref ast, .. } | Ast::Lookaround { ref ast, .. } => {
            has_groups(ast)
        }
        Ast::Concat(ref asts) | Ast::Alternation(ref asts) => {
            asts.iter().any(has_groups)
        }
        Ast::Conditional { ref yes, ref no, .. } => {
            has_groups(yes) || has_groups(no)
        }
    }
}

/// Returns the number of bytes of `haystack` at `at` that match `text`,
/// comparing under simple case folding when `fold` is set.
pub(crate) fn match_text(
    haystack: &str,
    at: usize,
    text: &str,
    fold: bool,
    ascii: bool,
) -> Option<usize> {
    let rest = &haystack[at..];
    if !fold {
        return if rest.starts_with(text) { Some(text.len()) } else { None };
    }
    let mut len = 0;
    let mut hay = rest.chars();
    for want in text.chars() {
        let got = hay.next()?;
        if !classes::fold_eq(want, got, ascii) {
            return None;
        }
        len += got.len_utf8();
    }
    Some(len)
}

/// Finds candidate match starts by searching for a required literal prefix.
#[derive(Clone, Debug)]
pub(crate) struct Prefilter {
    finder: memmem::Finder<'static>,
}

impl Prefilter {
    pub(crate) fn new(prefix: &str) -> Option<Prefilter> {
        if prefix.is_empty() {
            return None;
        }
        debug!("prefilter built: memmem for {:?}", prefix);
        Some(Prefilter { finder: memmem::Finder::new(prefix).into_owned() })
    }

    /// The first offset at or after `at` where the prefix occurs.
    #[inline]
    pub(crate) fn find(&self, haystack: &str, at: usize) -> Option<usize> {
        self.finder.find(haystack[at..].as_bytes()).map(|i| at + i)
    }
}

/// Returns the offset of the character boundary following `at`.
#[inline]
pub(crate) fn next_boundary(haystack: &str, at: usize) -> usize {
    at + haystack[at..].chars().next().map_or(1, char::len_utf8)
}
