/*!
The regex pattern parser.

The parser turns a pattern into an [`Ast`], resolving everything that
depends on flags as it goes: case insensitive literals become classes of
their case variants, `.` becomes a class with or without `\n`, and `^`/`$`
become line or text anchors. What is left for the compiler is the structure
of the pattern.

Group references are resolved to group indices here too, so a reference
to a group that does not exist (or that is still open, for
backreferences) is reported at parse time.
*/

use crate::{
    re::{
        classes::{self, Perl},
        error::{Error, SyntaxErrorKind},
        look::Look,
    },
    util::interval::{Interval, IntervalSet},
};

/// Flags that change how a pattern is interpreted.
///
/// Each flag can also be set inside a pattern, either for the remainder of
/// the enclosing group with `(?flags)` or for a group with `(?flags:...)`.
/// A `-` turns the following flags off.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Flags {
    case_insensitive: bool,
    multi_line: bool,
    dot_matches_new_line: bool,
    verbose: bool,
    ascii: bool,
    swap_greed: bool,
}

impl Flags {
    /// All flags off.
    pub fn new() -> Flags {
        Flags::default()
    }

    /// `i`: letters match their case variants.
    pub fn case_insensitive(mut self, yes: bool) -> Flags {
        self.case_insensitive = yes;
        self
    }

    /// `m`: `^` and `$` match at line boundaries.
    pub fn multi_line(mut self, yes: bool) -> Flags {
        self.multi_line = yes;
        self
    }

    /// `s`: `.` matches `\n`.
    pub fn dot_matches_new_line(mut self, yes: bool) -> Flags {
        self.dot_matches_new_line = yes;
        self
    }

    /// `x`: whitespace is ignored and `#` starts a comment, outside of
    /// classes.
    pub fn verbose(mut self, yes: bool) -> Flags {
        self.verbose = yes;
        self
    }

    /// `a`: Perl classes, word boundaries and case folding use their ASCII
    /// definitions. `u` turns this off.
    pub fn ascii(mut self, yes: bool) -> Flags {
        self.ascii = yes;
        self
    }

    /// `U`: repetitions are lazy by default and `?` makes them greedy.
    pub fn swap_greed(mut self, yes: bool) -> Flags {
        self.swap_greed = yes;
        self
    }

    /// Returns true if the `i` flag is set.
    pub fn get_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Returns true if the `m` flag is set.
    pub fn get_multi_line(&self) -> bool {
        self.multi_line
    }

    /// Returns true if the `s` flag is set.
    pub fn get_dot_matches_new_line(&self) -> bool {
        self.dot_matches_new_line
    }

    /// Returns true if the `x` flag is set.
    pub fn get_verbose(&self) -> bool {
        self.verbose
    }

    /// Returns true if the `a` flag is set.
    pub fn get_ascii(&self) -> bool {
        self.ascii
    }

    /// Returns true if the `U` flag is set.
    pub fn get_swap_greed(&self) -> bool {
        self.swap_greed
    }
}

/// A parsed pattern.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Ast {
    Empty,
    Literal(char),
    Class(IntervalSet),
    Look(Look),
    /// A capturing group. Non-capturing groups leave no trace.
    Group { index: usize, ast: Box<Ast> },
    Concat(Vec<Ast>),
    Alternation(Vec<Ast>),
    Repetition { ast: Box<Ast>, min: u32, max: Option<u32>, greedy: bool },
    Lookaround { ast: Box<Ast>, ahead: bool, negated: bool },
    Backref { index: usize, fold: bool, ascii: bool },
    Conditional { index: usize, yes: Box<Ast>, no: Box<Ast> },
}

impl Ast {
    /// The fewest characters any match of this node can consume.
    pub(crate) fn min_len(&self) -> usize {
        match *self {
            Ast::Empty
            | Ast::Look(_)
            | Ast::Lookaround { .. }
            | Ast::Backref { .. } => 0,
            Ast::Literal(_) | Ast::Class(_) => 1,
            Ast::Group { ref ast, .. } => ast.min_len(),
            Ast::Concat(ref asts) => asts.iter().map(Ast::min_len).sum(),
            Ast::Alternation(ref asts) => {
                asts.iter().map(Ast::min_len).min().unwrap_or(0)
            }
            Ast::Repetition { ref ast, min, .. } => {
                ast.min_len().saturating_mul(min as usize)
            }
            Ast::Conditional { ref yes, ref no, .. } => {
                yes.min_len().min(no.min_len())
            }
        }
    }

    /// Returns true if this node contains a backreference or conditional.
    pub(crate) fn has_references(&self) -> bool {
        match *self {
            Ast::Backref { .. } | Ast::Conditional { .. } => true,
            Ast::Empty | Ast::Literal(_) | Ast::Class(_) | Ast::Look(_) => {
                false
            }
            Ast::Group { ref ast, .. }
            | Ast::Repetition { ref ast, .. }
            | Ast::Lookaround { ref ast, .. } => ast.has_references(),
            Ast::Concat(ref asts) | Ast::Alternation(ref asts) => {
                asts.iter().any(Ast::has_references)
            }
        }
    }

    /// The literal every match must begin with. Empty if there is none.
    pub(crate) fn prefix(&self) -> String {
        let mut prefix = String::new();
        self.write_prefix(&mut prefix);
        prefix
    }

    /// Appends this node's literal prefix, returning true if the whole node
    /// is that literal.
    fn write_prefix(&self, out: &mut String) -> bool {
        match *self {
            Ast::Empty => true,
            Ast::Literal(c) => {
                out.push(c);
                true
            }
            Ast::Group { ref ast, .. } => ast.write_prefix(out),
            Ast::Concat(ref asts) => {
                asts.iter().all(|ast| ast.write_prefix(out))
            }
            Ast::Repetition { ref ast, min, max, .. } if min > 0 => {
                ast.write_prefix(out) && min == 1 && max == Some(1)
            }
            _ => false,
        }
    }
}

/// The result of parsing a pattern.
#[derive(Clone, Debug)]
pub(crate) struct Parsed {
    pub(crate) ast: Ast,
    /// The name of each group, by index. Group 0 is the whole match.
    pub(crate) names: Vec<Option<String>>,
}

/// Parse `pattern` with the given initial flags.
pub(crate) fn parse(pattern: &str, flags: Flags) -> Result<Parsed, Error> {
    let mut p = Parser { pattern, pos: 0, flags, names: vec![None], open: vec![] };
    let ast = p.alternation()?;
    if p.peek().is_some() {
        return Err(p.err(SyntaxErrorKind::UnopenedGroup));
    }
    Ok(Parsed { ast, names: p.names })
}

/// Either a single character or a class, as produced by an escape inside a
/// class.
enum ClassItem {
    Char(char),
    Set(IntervalSet),
}

struct Parser<'p> {
    pattern: &'p str,
    pos: usize,
    flags: Flags,
    names: Vec<Option<String>>,
    /// Capture groups that are currently open.
    open: Vec<usize>,
}

impl<'p> Parser<'p> {
    fn peek(&self) -> Option<char> {
        self.pattern[self.pos..].chars().next()
    }

    fn peek2(&self) -> Option<char> {
        let mut it = self.pattern[self.pos..].chars();
        it.next()?;
        it.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn err(&self, kind: SyntaxErrorKind) -> Error {
        Error::syntax(self.pos, kind)
    }

    fn ascii(&self) -> bool {
        self.flags.ascii || !cfg!(feature = "unicode")
    }

    fn skip_verbose(&mut self) {
        if !self.flags.verbose {
            return;
        }
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn alternation(&mut self) -> Result<Ast, Error> {
        let mut alternatives = vec![self.concat()?];
        while self.eat('|') {
            alternatives.push(self.concat()?);
        }
        Ok(if alternatives.len() == 1 {
            alternatives.pop().unwrap_or(Ast::Empty)
        } else {
            Ast::Alternation(alternatives)
        })
    }

    fn concat(&mut self) -> Result<Ast, Error> {
        let mut items = vec![];
        loop {
            self.skip_verbose();
            match self.peek() {
                None | Some('|') | Some(')') => break,
                _ => {}
            }
            let atom = match self.atom()? {
                None => {
                    self.skip_verbose();
                    if self.at_quantifier() {
                        return Err(self.err(SyntaxErrorKind::RepetitionMissing));
                    }
                    continue;
                }
                Some(atom) => atom,
            };
            let item = self.quantified(atom)?;
            items.push(item);
        }
        Ok(match items.len() {
            0 => Ast::Empty,
            1 => items.pop().unwrap_or(Ast::Empty),
            _ => Ast::Concat(items),
        })
    }

    fn at_quantifier(&self) -> bool {
        matches!(self.peek(), Some('*') | Some('+') | Some('?'))
    }

    /// Applies at most one quantifier to `atom`.
    fn quantified(&mut self, atom: Ast) -> Result<Ast, Error> {
        self.skip_verbose();
        let (min, max) = match self.peek() {
            Some('*') => {
                self.bump();
                (0, None)
            }
            Some('+') => {
                self.bump();
                (1, None)
            }
            Some('?') => {
                self.bump();
                (0, Some(1))
            }
            Some('{') => match self.counted()? {
                None => return Ok(atom),
                Some(counts) => counts,
            },
            _ => return Ok(atom),
        };
        let lazy = self.eat('?');
        let greedy = lazy == self.flags.swap_greed;
        self.skip_verbose();
        if self.at_quantifier() || self.peek() == Some('{') && self.is_counted()
        {
            return Err(self.err(SyntaxErrorKind::RepetitionMissing));
        }
        Ok(Ast::Repetition { ast: Box::new(atom), min, max, greedy })
    }

    fn is_counted(&mut self) -> bool {
        let saved = self.pos;
        let ok = matches!(self.counted(), Ok(Some(_)));
        self.pos = saved;
        ok
    }

    /// Parses `{m}`, `{m,}`, `{,n}` or `{m,n}`. A `{` that does not begin
    /// one of these is left alone so that it is taken literally.
    fn counted(&mut self) -> Result<Option<(u32, Option<u32>)>, Error> {
        let open = self.pos;
        self.bump();
        let min = self.digits();
        let comma = self.eat(',');
        let max = if comma { self.digits() } else { None };
        if !self.eat('}') || (min.is_none() && max.is_none()) {
            self.pos = open;
            return Ok(None);
        }
        let invalid =
            || Error::syntax(open, SyntaxErrorKind::InvalidRepetitionCount);
        let min = match min {
            None => 0,
            Some(n) => n.ok_or_else(invalid)?,
        };
        let max = match (comma, max) {
            (false, _) => Some(min),
            (true, None) => None,
            (true, Some(n)) => Some(n.ok_or_else(invalid)?),
        };
        if max.map_or(false, |max| max < min) {
            return Err(invalid());
        }
        Ok(Some((min, max)))
    }

    /// Parses a run of decimal digits. The outer `None` means there were no
    /// digits, the inner `None` that the number does not fit in a `u32`.
    fn digits(&mut self) -> Option<Option<u32>> {
        let start = self.pos;
        while self.peek().map_or(false, |c| c.is_ascii_digit()) {
            self.bump();
        }
        if start == self.pos {
            return None;
        }
        Some(self.pattern[start..self.pos].parse().ok())
    }

    /// Parses one atom. Returns `None` for constructs that match nothing at
    /// all, such as `(?i)` and comments.
    fn atom(&mut self) -> Result<Option<Ast>, Error> {
        let start = self.pos;
        let c = match self.bump() {
            None => return Err(self.err(SyntaxErrorKind::UnexpectedEnd)),
            Some(c) => c,
        };
        let ast = match c {
            '(' => return self.group(start),
            '[' => self.class(start)?,
            '.' => Ast::Class(classes::dot(self.flags.dot_matches_new_line)),
            '^' => Ast::Look(if self.flags.multi_line {
                Look::StartLine
            } else {
                Look::Start
            }),
            '$' => Ast::Look(if self.flags.multi_line {
                Look::EndLine
            } else {
                Look::EndFinalNewline
            }),
            '\\' => self.escape(start)?,
            '*' | '+' | '?' => {
                return Err(Error::syntax(
                    start,
                    SyntaxErrorKind::RepetitionMissing,
                ))
            }
            c => self.literal(c),
        };
        Ok(Some(ast))
    }

    fn literal(&self, c: char) -> Ast {
        if !self.flags.case_insensitive {
            return Ast::Literal(c);
        }
        let mut set = IntervalSet::single(c);
        classes::case_fold(&mut set, self.ascii());
        match set.as_single() {
            Some(c) => Ast::Literal(c),
            None => Ast::Class(set),
        }
    }

    fn group(&mut self, open: usize) -> Result<Option<Ast>, Error> {
        if !self.eat('?') {
            let index = self.names.len();
            self.names.push(None);
            return self.capture(open, index).map(Some);
        }
        let kind_at = self.pos;
        match self.bump() {
            None => Err(self.err(SyntaxErrorKind::UnexpectedEnd)),
            Some(':') => self.group_body(open).map(Some),
            Some('P') => {
                if self.eat('=') {
                    let name = self.name(')')?;
                    let index = self.resolve_name(&name)?;
                    return Ok(Some(self.backref(kind_at, index)?));
                }
                if !self.eat('<') {
                    return Err(Error::syntax(
                        kind_at,
                        SyntaxErrorKind::InvalidGroupKind,
                    ));
                }
                if self.eat('=') {
                    let name = self.name('>')?;
                    let index = self.resolve_name(&name)?;
                    if !self.eat(')') {
                        return Err(self.err(SyntaxErrorKind::InvalidGroupKind));
                    }
                    return Ok(Some(self.backref(kind_at, index)?));
                }
                self.named(open).map(Some)
            }
            Some('<') => match self.peek() {
                Some('=') => {
                    self.bump();
                    self.lookaround(open, false, false).map(Some)
                }
                Some('!') => {
                    self.bump();
                    self.lookaround(open, false, true).map(Some)
                }
                _ => self.named(open).map(Some),
            },
            Some('=') => self.lookaround(open, true, false).map(Some),
            Some('!') => self.lookaround(open, true, true).map(Some),
            Some('(') => self.conditional(open).map(Some),
            Some('#') => {
                loop {
                    match self.bump() {
                        None => {
                            return Err(Error::syntax(
                                open,
                                SyntaxErrorKind::UnclosedGroup,
                            ))
                        }
                        Some(')') => return Ok(None),
                        Some(_) => {}
                    }
                }
            }
            Some(_) => {
                self.pos = kind_at;
                self.flag_group(open)
            }
        }
    }

    fn named(&mut self, open: usize) -> Result<Ast, Error> {
        let name_at = self.pos;
        let name = self.name('>')?;
        if self.names.iter().any(|n| n.as_deref() == Some(name.as_str())) {
            return Err(Error::syntax(
                name_at,
                SyntaxErrorKind::DuplicateGroupName,
            ));
        }
        let index = self.names.len();
        self.names.push(Some(name));
        self.capture(open, index)
    }

    fn capture(&mut self, open: usize, index: usize) -> Result<Ast, Error> {
        self.open.push(index);
        let ast = self.group_body(open)?;
        self.open.pop();
        Ok(Ast::Group { index, ast: Box::new(ast) })
    }

    /// Parses up to and including the `)` closing a group opened at `open`.
    /// Flags set inside the group do not outlive it.
    fn group_body(&mut self, open: usize) -> Result<Ast, Error> {
        let saved = self.flags;
        let ast = self.alternation()?;
        self.flags = saved;
        if !self.eat(')') {
            return Err(Error::syntax(open, SyntaxErrorKind::UnclosedGroup));
        }
        Ok(ast)
    }

    fn lookaround(
        &mut self,
        open: usize,
        ahead: bool,
        negated: bool,
    ) -> Result<Ast, Error> {
        let ast = self.group_body(open)?;
        Ok(Ast::Lookaround { ast: Box::new(ast), ahead, negated })
    }

    fn conditional(&mut self, open: usize) -> Result<Ast, Error> {
        let name_at = self.pos;
        let name = self.name(')')?;
        let index = if name.chars().all(|c| c.is_ascii_digit()) {
            match name.parse::<usize>() {
                Ok(i) if i > 0 && i < self.names.len() => i,
                _ => {
                    return Err(Error::syntax(
                        name_at,
                        SyntaxErrorKind::InvalidBackreference,
                    ))
                }
            }
        } else {
            self.names
                .iter()
                .position(|n| n.as_deref() == Some(name.as_str()))
                .ok_or_else(|| Error::unknown_group(&name))?
        };
        let saved = self.flags;
        let yes = self.concat()?;
        let no = if self.eat('|') { self.concat()? } else { Ast::Empty };
        self.flags = saved;
        if self.peek() == Some('|') {
            return Err(self.err(SyntaxErrorKind::InvalidConditional));
        }
        if !self.eat(')') {
            return Err(Error::syntax(open, SyntaxErrorKind::UnclosedGroup));
        }
        Ok(Ast::Conditional { index, yes: Box::new(yes), no: Box::new(no) })
    }

    /// Parses `(?flags)` or `(?flags:...)`, with the `(?` already consumed.
    fn flag_group(&mut self, open: usize) -> Result<Option<Ast>, Error> {
        let mut flags = self.flags;
        let mut on = true;
        loop {
            let at = self.pos;
            let c = match self.bump() {
                None => return Err(self.err(SyntaxErrorKind::UnexpectedEnd)),
                Some(c) => c,
            };
            match c {
                'i' => flags.case_insensitive = on,
                'm' => flags.multi_line = on,
                's' => flags.dot_matches_new_line = on,
                'x' => flags.verbose = on,
                'a' => flags.ascii = on,
                'u' => {
                    if !cfg!(feature = "unicode") {
                        return Err(Error::syntax(
                            at,
                            SyntaxErrorKind::UnicodeUnavailable,
                        ));
                    }
                    flags.ascii = !on;
                }
                'U' => flags.swap_greed = on,
                '-' if on => on = false,
                ')' => {
                    self.flags = flags;
                    return Ok(None);
                }
                ':' => {
                    let saved = self.flags;
                    self.flags = flags;
                    let ast = self.group_body(open);
                    self.flags = saved;
                    return ast.map(Some);
                }
                _ => {
                    return Err(Error::syntax(at, SyntaxErrorKind::InvalidFlag))
                }
            }
        }
    }

    /// Parses a group name terminated by `end`, consuming the terminator.
    fn name(&mut self, end: char) -> Result<String, Error> {
        let start = self.pos;
        loop {
            match self.bump() {
                None => return Err(self.err(SyntaxErrorKind::UnexpectedEnd)),
                Some(c) if c == end => break,
                Some(c) if c.is_alphanumeric() || c == '_' => {}
                Some(_) => {
                    return Err(Error::syntax(
                        start,
                        SyntaxErrorKind::InvalidGroupName,
                    ))
                }
            }
        }
        let name = &self.pattern[start..self.pos - end.len_utf8()];
        let starts_with_digit =
            name.chars().next().map_or(true, |c| c.is_ascii_digit());
        if starts_with_digit && !(end == ')' && name.chars().all(|c| c.is_ascii_digit())) {
            return Err(Error::syntax(start, SyntaxErrorKind::InvalidGroupName));
        }
        Ok(name.to_string())
    }

    fn resolve_name(&self, name: &str) -> Result<usize, Error> {
        self.names
            .iter()
            .position(|n| n.as_deref() == Some(name))
            .ok_or_else(|| Error::unknown_group(name))
    }

    fn backref(&self, at: usize, index: usize) -> Result<Ast, Error> {
        if index == 0 || index >= self.names.len() || self.open.contains(&index)
        {
            return Err(Error::syntax(at, SyntaxErrorKind::InvalidBackreference));
        }
        Ok(Ast::Backref {
            index,
            fold: self.flags.case_insensitive,
            ascii: self.ascii(),
        })
    }

    /// Parses an escape outside of a class, with the `\` consumed.
    fn escape(&mut self, start: usize) -> Result<Ast, Error> {
        let c = match self.peek() {
            None => return Err(self.err(SyntaxErrorKind::UnexpectedEnd)),
            Some(c) => c,
        };
        let ast = match c {
            'A' => Ast::Look(Look::Start),
            'Z' => Ast::Look(Look::End),
            'b' => Ast::Look(if self.ascii() {
                Look::WordAscii
            } else {
                Look::WordUnicode
            }),
            'B' => Ast::Look(if self.ascii() {
                Look::WordAsciiNegate
            } else {
                Look::WordUnicodeNegate
            }),
            '1'..='9' if !self.is_octal3() => {
                let mut index = 0;
                for _ in 0..2 {
                    match self.peek().and_then(|c| c.to_digit(10)) {
                        Some(d) => {
                            self.bump();
                            index = index * 10 + d as usize;
                        }
                        None => break,
                    }
                }
                return self.backref(start, index);
            }
            _ => {
                return Ok(match self.class_escape(start, false)? {
                    ClassItem::Char(c) => self.literal(c),
                    ClassItem::Set(set) => Ast::Class(set),
                });
            }
        };
        self.bump();
        Ok(ast)
    }

    fn is_octal3(&self) -> bool {
        let mut it = self.pattern[self.pos..].chars();
        (0..3).all(|_| it.next().map_or(false, |c| ('0'..='7').contains(&c)))
    }

    /// Parses an escape denoting a character or a class, with the `\`
    /// consumed. Inside a class, `\b` is a backspace.
    fn class_escape(
        &mut self,
        start: usize,
        in_class: bool,
    ) -> Result<ClassItem, Error> {
        let c = match self.bump() {
            None => return Err(self.err(SyntaxErrorKind::UnexpectedEnd)),
            Some(c) => c,
        };
        let (kind, negated) = match c {
            'n' => return Ok(ClassItem::Char('\n')),
            'r' => return Ok(ClassItem::Char('\r')),
            't' => return Ok(ClassItem::Char('\t')),
            'f' => return Ok(ClassItem::Char('\x0C')),
            'v' => return Ok(ClassItem::Char('\x0B')),
            'a' => return Ok(ClassItem::Char('\x07')),
            'b' if in_class => return Ok(ClassItem::Char('\x08')),
            'x' => return self.hex(start, 2).map(ClassItem::Char),
            'u' => return self.hex(start, 4).map(ClassItem::Char),
            'U' => return self.hex(start, 8).map(ClassItem::Char),
            '0'..='7' => {
                let mut value = c.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            self.bump();
                            value = value * 8 + d;
                        }
                        None => break,
                    }
                }
                return char::from_u32(value)
                    .map(ClassItem::Char)
                    .ok_or_else(|| Error::syntax(start, SyntaxErrorKind::InvalidHex));
            }
            'd' => (Perl::Digit, false),
            'D' => (Perl::Digit, true),
            'w' => (Perl::Word, false),
            'W' => (Perl::Word, true),
            's' => (Perl::Space, false),
            'S' => (Perl::Space, true),
            c if c.is_alphanumeric() => {
                return Err(Error::syntax(start, SyntaxErrorKind::InvalidEscape))
            }
            c => return Ok(ClassItem::Char(c)),
        };
        classes::perl(kind, negated, self.ascii())
            .map(ClassItem::Set)
            .ok_or_else(|| Error::syntax(start, SyntaxErrorKind::UnicodeUnavailable))
    }

    fn hex(&mut self, start: usize, digits: usize) -> Result<char, Error> {
        let mut value = 0u32;
        for _ in 0..digits {
            let d = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| Error::syntax(start, SyntaxErrorKind::InvalidHex))?;
            value = value * 16 + d;
        }
        char::from_u32(value)
            .ok_or_else(|| Error::syntax(start, SyntaxErrorKind::InvalidHex))
    }

    /// Parses a bracketed class, with the `[` consumed.
    fn class(&mut self, open: usize) -> Result<Ast, Error> {
        let negated = self.eat('^');
        let mut set = IntervalSet::empty();
        let mut first = true;
        loop {
            let item_at = self.pos;
            let c = match self.bump() {
                None => {
                    return Err(Error::syntax(open, SyntaxErrorKind::UnclosedClass))
                }
                Some(']') if !first => break,
                Some(c) => c,
            };
            first = false;
            let lo = match c {
                '\\' => match self.class_escape(item_at, true)? {
                    ClassItem::Char(c) => c,
                    ClassItem::Set(s) => {
                        set.union(&s);
                        continue;
                    }
                },
                c => c,
            };
            let range = self.peek() == Some('-')
                && self.peek2().map_or(false, |c| c != ']');
            if !range {
                set.push(Interval::single(lo));
                continue;
            }
            self.bump();
            let hi_at = self.pos;
            let hi = match self.bump() {
                None => {
                    return Err(Error::syntax(open, SyntaxErrorKind::UnclosedClass))
                }
                Some('\\') => match self.class_escape(hi_at, true)? {
                    ClassItem::Char(c) => c,
                    ClassItem::Set(_) => {
                        return Err(Error::syntax(
                            hi_at,
                            SyntaxErrorKind::InvalidClassRange,
                        ))
                    }
                },
                Some(c) => c,
            };
            if lo > hi {
                return Err(Error::syntax(
                    item_at,
                    SyntaxErrorKind::InvalidClassRange,
                ));
            }
            set.push(Interval::new(lo, hi));
        }
        if self.flags.case_insensitive {
            classes::case_fold(&mut set, self.ascii());
        }
        if negated {
            set.negate();
        }
        Ok(Ast::Class(set))
    }
}
