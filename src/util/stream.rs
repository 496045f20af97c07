/*!
The input interface consumed by the matcher engine.

A [`Stream`] is a persistent view of a sequence of characters: advancing
produces a new view and leaves the old one untouched, which is what lets a
backtracking search hold on to many positions at once. Two views are equal
(and hash equally) exactly when they view the same source at the same
offset, which makes a stream usable directly as a memoization key.

[`Text`] is the stock implementation over an in-memory string.
*/

use core::{
    fmt,
    hash::{Hash, Hasher},
};

use std::rc::Rc;

/// A persistent, sliceable, location-aware view of input symbols.
pub trait Stream: Clone + Eq + Hash + fmt::Debug {
    /// Returns the symbol `offset` positions past the start of this view, or
    /// `None` if that is past the end.
    fn at(&self, offset: usize) -> Option<char>;

    /// Returns the number of symbols remaining in this view.
    fn len(&self) -> usize;

    /// Returns true when no symbols remain.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the symbols in `[start, stop)`, relative to this view. Offsets
    /// past the end are clamped.
    fn slice(&self, start: usize, stop: usize) -> String;

    /// Returns the view starting `n` symbols past the start of this one.
    /// Advancing past the end yields an empty view.
    fn advance(&self, n: usize) -> Self;

    /// The absolute offset of this view into its source.
    fn offset(&self) -> usize;

    /// A human readable description of the position `offset` symbols past the
    /// start of this view. Only used for diagnostics.
    fn describe(&self, offset: usize) -> String;

    /// Returns true if this view begins with `text`.
    fn starts_with(&self, text: &str) -> bool {
        text.chars().enumerate().all(|(i, c)| self.at(i) == Some(c))
    }
}

#[derive(Debug)]
struct Source {
    name: Option<String>,
    chars: Box<[char]>,
    /// The offset (in chars) of the first character of each line.
    line_starts: Vec<usize>,
}

/// A stream over an in-memory string.
///
/// Cloning and advancing are O(1): all views share the decoded source.
#[derive(Clone)]
pub struct Text {
    source: Rc<Source>,
    offset: usize,
}

impl Text {
    /// Create a stream over the given text.
    pub fn new(text: &str) -> Text {
        Text::build(None, text)
    }

    /// Create a stream over the given text, using `name` when describing
    /// locations.
    pub fn named(name: &str, text: &str) -> Text {
        Text::build(Some(name.to_string()), text)
    }

    fn build(name: Option<String>, text: &str) -> Text {
        let chars: Box<[char]> = text.chars().collect();
        let mut line_starts = vec![0];
        for (i, &c) in chars.iter().enumerate() {
            if c == '\n' {
                line_starts.push(i + 1);
            }
        }
        Text { source: Rc::new(Source { name, chars, line_starts }), offset: 0 }
    }

    /// Returns the remaining text of this view as a string.
    pub fn rest(&self) -> String {
        self.source.chars[self.offset..].iter().collect()
    }

    fn remaining(&self) -> &[char] {
        &self.source.chars[self.offset..]
    }
}

impl Stream for Text {
    fn at(&self, offset: usize) -> Option<char> {
        self.remaining().get(offset).copied()
    }

    fn len(&self) -> usize {
        self.source.chars.len() - self.offset
    }

    fn slice(&self, start: usize, stop: usize) -> String {
        let rest = self.remaining();
        let stop = core::cmp::min(stop, rest.len());
        let start = core::cmp::min(start, stop);
        rest[start..stop].iter().collect()
    }

    fn advance(&self, n: usize) -> Text {
        let offset = core::cmp::min(self.offset + n, self.source.chars.len());
        Text { source: Rc::clone(&self.source), offset }
    }

    fn offset(&self) -> usize {
        self.offset
    }

    fn describe(&self, offset: usize) -> String {
        let at = core::cmp::min(self.offset + offset, self.source.chars.len());
        let line = match self.source.line_starts.binary_search(&at) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let column = at - self.source.line_starts[line];
        match self.source.name {
            None => format!("line {}, column {}", line + 1, column + 1),
            Some(ref name) => {
                format!("{}: line {}, column {}", name, line + 1, column + 1)
            }
        }
    }
}

impl PartialEq for Text {
    fn eq(&self, other: &Text) -> bool {
        Rc::ptr_eq(&self.source, &other.source) && self.offset == other.offset
    }
}

impl Eq for Text {}

impl Hash for Text {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.source) as *const u8 as usize).hash(state);
        self.offset.hash(state);
    }
}

impl fmt::Debug for Text {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let preview: String = self.remaining().iter().take(16).collect();
        write!(f, "Text({}, {:?})", self.offset, preview)
    }
}

impl<'a> From<&'a str> for Text {
    fn from(text: &'a str) -> Text {
        Text::new(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn views_are_persistent() {
        let s = Text::new("héllo");
        let t = s.advance(2);
        assert_eq!(s.len(), 5);
        assert_eq!(t.len(), 3);
        assert_eq!(t.at(0), Some('l'));
        assert_eq!(s.at(1), Some('é'));
        assert_eq!(t.slice(0, 10), "llo");
        assert_eq!(s.slice(1, 3), "él");
        assert!(s.advance(9).is_empty());
    }

    #[test]
    fn equality_is_source_and_offset() {
        let s = Text::new("abc");
        assert_eq!(s.advance(1), s.advance(1));
        assert_ne!(s.advance(1), s.advance(2));
        assert_ne!(Text::new("abc"), s);
    }

    #[test]
    fn describe_lines() {
        let s = Text::named("input", "ab\ncd");
        assert_eq!(s.describe(0), "input: line 1, column 1");
        assert_eq!(s.advance(3).describe(1), "input: line 2, column 2");
        assert_eq!(Text::new("x\n").describe(2), "line 2, column 1");
    }

    #[test]
    fn starts_with() {
        let s = Text::new("abc");
        assert!(s.starts_with("ab"));
        assert!(s.starts_with(""));
        assert!(!s.starts_with("abcd"));
    }
}
