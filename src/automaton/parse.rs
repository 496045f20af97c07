/*!
A parser for the token pattern syntax.

The syntax is deliberately small: literal characters, `\` escapes,
bracketed classes with ranges and `^` negation, `.`, grouping with `(...)`,
alternation with `|`, and the postfix operators `*`, `+` and `?`. A group
written `(?P<name>...)` labels a top level alternative.

Nested sequences and nested alternations are flattened as they are parsed,
so the tree printed by `Display` parses back to an identical tree.
*/

use crate::{
    automaton::{error::Error, tree::Node},
    util::interval::{Interval, IntervalSet},
};

/// Parse a pattern into its top level alternatives.
pub(crate) fn parse(pattern: &str) -> Result<Vec<Node>, Error> {
    let mut p = Parser::new(pattern);
    let alternatives = p.alternation()?;
    p.finish()?;
    Ok(alternatives)
}

/// Parse a pattern into a single node.
pub(crate) fn parse_node(pattern: &str) -> Result<Node, Error> {
    Ok(choice(parse(pattern)?))
}

fn choice(mut alternatives: Vec<Node>) -> Node {
    if alternatives.len() == 1 {
        alternatives.pop().unwrap_or(Node::Sequence(vec![]))
    } else {
        Node::Choice(alternatives)
    }
}

fn sequence(mut items: Vec<Node>) -> Node {
    if items.len() == 1 {
        items.pop().unwrap_or(Node::Sequence(vec![]))
    } else {
        Node::Sequence(items)
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(pattern: &str) -> Parser {
        Parser { chars: pattern.chars().collect(), pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn err(&self, reason: &'static str) -> Error {
        Error::syntax(self.pos, reason)
    }

    fn finish(&self) -> Result<(), Error> {
        match self.peek() {
            None => Ok(()),
            Some(')') => Err(self.err("unopened group")),
            Some(_) => Err(self.err("unexpected character")),
        }
    }

    fn alternation(&mut self) -> Result<Vec<Node>, Error> {
        let mut alternatives = vec![];
        loop {
            match self.sequence()? {
                Node::Choice(nested) => alternatives.extend(nested),
                node => alternatives.push(node),
            }
            if !self.eat('|') {
                return Ok(alternatives);
            }
        }
    }

    fn sequence(&mut self) -> Result<Node, Error> {
        let mut items = vec![];
        while let Some(c) = self.peek() {
            if c == '|' || c == ')' {
                break;
            }
            match self.repeat()? {
                Node::Sequence(nested) => items.extend(nested),
                node => items.push(node),
            }
        }
        Ok(sequence(items))
    }

    fn repeat(&mut self) -> Result<Node, Error> {
        let mut node = self.atom()?;
        loop {
            node = if self.eat('*') {
                Node::Repeat(Box::new(node))
            } else if self.eat('?') {
                Node::Option(Box::new(node))
            } else if self.eat('+') {
                let again = Node::Repeat(Box::new(node.clone()));
                match node {
                    Node::Sequence(mut items) => {
                        items.push(again);
                        Node::Sequence(items)
                    }
                    node => Node::Sequence(vec![node, again]),
                }
            } else {
                return Ok(node);
            };
        }
    }

    fn atom(&mut self) -> Result<Node, Error> {
        let start = self.pos;
        let c = match self.bump() {
            None => return Err(self.err("expected an atom")),
            Some(c) => c,
        };
        match c {
            '(' => self.group(),
            '[' => self.class().map(Node::Character),
            '.' => Ok(Node::Character(IntervalSet::any())),
            '\\' => self.escape().map(Node::Character),
            '*' | '+' | '?' => {
                Err(Error::syntax(start, "repetition operator missing an operand"))
            }
            ']' => Err(Error::syntax(start, "unopened class")),
            c => Ok(Node::Character(IntervalSet::single(c))),
        }
    }

    fn group(&mut self) -> Result<Node, Error> {
        let label = if self.eat('?') {
            if !self.eat('P') || !self.eat('<') {
                return Err(self.err("expected (?P<name>...)"));
            }
            let mut name = String::new();
            loop {
                match self.bump() {
                    None => return Err(self.err("unclosed group name")),
                    Some('>') => break,
                    Some(c) if c.is_alphanumeric() || c == '_' => name.push(c),
                    Some(_) => {
                        self.pos -= 1;
                        return Err(self.err("invalid character in group name"));
                    }
                }
            }
            if name.is_empty() {
                return Err(self.err("empty group name"));
            }
            Some(name)
        } else {
            None
        };
        let alternatives = self.alternation()?;
        if !self.eat(')') {
            return Err(self.err("unclosed group"));
        }
        let node = choice(alternatives);
        Ok(match label {
            None => node,
            Some(label) => Node::Labelled(label, Box::new(node)),
        })
    }

    fn class(&mut self) -> Result<IntervalSet, Error> {
        let negated = self.eat('^');
        let mut set = IntervalSet::empty();
        let mut first = true;
        loop {
            let c = match self.bump() {
                None => return Err(self.err("unclosed class")),
                Some(']') if !first => break,
                Some(c) => c,
            };
            first = false;
            let lo = match c {
                '\\' => {
                    let escaped = self.escape()?;
                    match escaped.as_single() {
                        Some(c) => c,
                        None => {
                            set.union(&escaped);
                            continue;
                        }
                    }
                }
                c => c,
            };
            let hi = if self.peek() == Some('-')
                && self.chars.get(self.pos + 1).map_or(false, |&c| c != ']')
            {
                self.pos += 1;
                match self.bump() {
                    Some('\\') => {
                        let escaped = self.escape()?;
                        match escaped.as_single() {
                            Some(c) => c,
                            None => return Err(self.err("class in range")),
                        }
                    }
                    Some(c) => c,
                    None => return Err(self.err("unclosed class")),
                }
            } else {
                lo
            };
            set.push(Interval::new(lo, hi));
        }
        if negated {
            set.negate();
        }
        Ok(set)
    }

    /// Parse the escape following a `\`.
    fn escape(&mut self) -> Result<IntervalSet, Error> {
        let c = match self.bump() {
            None => return Err(self.err("incomplete escape")),
            Some(c) => c,
        };
        let single = match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'x' => self.hex(2)?,
            'u' => self.hex(4)?,
            'U' => self.hex(8)?,
            'd' => return Ok(IntervalSet::range('0', '9')),
            'w' => {
                return Ok(IntervalSet::new(vec![
                    Interval::new('0', '9'),
                    Interval::new('A', 'Z'),
                    Interval::single('_'),
                    Interval::new('a', 'z'),
                ]));
            }
            's' => {
                return Ok(IntervalSet::new(vec![
                    Interval::new('\t', '\r'),
                    Interval::single(' '),
                ]));
            }
            c => c,
        };
        Ok(IntervalSet::single(single))
    }

    fn hex(&mut self, digits: usize) -> Result<char, Error> {
        let start = self.pos;
        let mut value = 0u32;
        for _ in 0..digits {
            let d = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| Error::syntax(start, "invalid hex escape"))?;
            value = value * 16 + d;
        }
        char::from_u32(value)
            .ok_or_else(|| Error::syntax(start, "invalid code point"))
    }
}
