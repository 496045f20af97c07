/*!
Sets of closed code point intervals.

Both the token automata and the regex engines describe "which characters may
be consumed here" as a canonical, sorted list of closed intervals `[a, b]`.
Canonical means: every interval has `start <= end`, intervals are sorted by
start, and no two intervals overlap or touch (`b + 1 == c` merges into one
interval). The canonical form is what [`IntervalSet`]'s `Display` impl
prints, and re-parsing that text reproduces the same set.
*/

use core::fmt;

/// The smallest code point.
pub(crate) const MIN_CHAR: char = '\0';
/// The largest code point.
pub(crate) const MAX_CHAR: char = '\u{10FFFF}';

/// Returns the code point following `c`, skipping the surrogate gap. Returns
/// `None` for `MAX_CHAR`.
pub(crate) fn char_succ(c: char) -> Option<char> {
    match c {
        '\u{D7FF}' => Some('\u{E000}'),
        MAX_CHAR => None,
        _ => char::from_u32(u32::from(c) + 1),
    }
}

/// Returns the code point preceding `c`, skipping the surrogate gap. Returns
/// `None` for `MIN_CHAR`.
pub(crate) fn char_pred(c: char) -> Option<char> {
    match c {
        '\u{E000}' => Some('\u{D7FF}'),
        MIN_CHAR => None,
        _ => char::from_u32(u32::from(c) - 1),
    }
}

/// A single closed interval of code points.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Interval {
    start: char,
    end: char,
}

impl Interval {
    /// Create a new interval. The bounds may be given in either order.
    pub fn new(a: char, b: char) -> Interval {
        if a <= b {
            Interval { start: a, end: b }
        } else {
            Interval { start: b, end: a }
        }
    }

    /// An interval containing exactly one code point.
    pub fn single(c: char) -> Interval {
        Interval { start: c, end: c }
    }

    /// The first code point in this interval.
    pub fn start(&self) -> char {
        self.start
    }

    /// The last code point in this interval.
    pub fn end(&self) -> char {
        self.end
    }

    /// Returns true if `c` is inside this interval.
    pub fn contains(&self, c: char) -> bool {
        self.start <= c && c <= self.end
    }

    /// Returns true if the two intervals overlap or touch, and can therefore
    /// be merged into one.
    fn is_contiguous(&self, other: &Interval) -> bool {
        let (lo, hi) = if self <= other { (self, other) } else { (other, self) };
        match char_succ(lo.end) {
            None => true,
            Some(next) => hi.start <= next,
        }
    }
}

/// A canonical set of code points, stored as sorted, disjoint, non-adjacent
/// closed intervals.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct IntervalSet {
    ranges: Vec<Interval>,
}

impl IntervalSet {
    /// Create a new set from any collection of intervals. The result is
    /// canonicalized.
    pub fn new<I: IntoIterator<Item = Interval>>(intervals: I) -> IntervalSet {
        let mut set = IntervalSet { ranges: intervals.into_iter().collect() };
        set.canonicalize();
        set
    }

    /// The empty set.
    pub fn empty() -> IntervalSet {
        IntervalSet { ranges: vec![] }
    }

    /// The set of every code point.
    pub fn any() -> IntervalSet {
        IntervalSet { ranges: vec![Interval::new(MIN_CHAR, MAX_CHAR)] }
    }

    /// The set containing exactly `c`.
    pub fn single(c: char) -> IntervalSet {
        IntervalSet { ranges: vec![Interval::single(c)] }
    }

    /// The set containing every code point in `[a, b]` (in either order).
    pub fn range(a: char, b: char) -> IntervalSet {
        IntervalSet { ranges: vec![Interval::new(a, b)] }
    }

    /// The intervals of this set, in canonical order.
    pub fn intervals(&self) -> &[Interval] {
        &self.ranges
    }

    /// Returns true if this set contains no code points.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Returns true if this set contains every code point.
    pub fn is_any(&self) -> bool {
        self.ranges.len() == 1
            && self.ranges[0].start == MIN_CHAR
            && self.ranges[0].end == MAX_CHAR
    }

    /// If this set contains exactly one code point, return it.
    pub fn as_single(&self) -> Option<char> {
        match self.ranges.as_slice() {
            [r] if r.start == r.end => Some(r.start),
            _ => None,
        }
    }

    /// Returns true if `c` is a member of this set.
    pub fn contains(&self, c: char) -> bool {
        self.ranges
            .binary_search_by(|r| {
                if r.end < c {
                    core::cmp::Ordering::Less
                } else if r.start > c {
                    core::cmp::Ordering::Greater
                } else {
                    core::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// Add an interval to this set, keeping it canonical.
    pub fn push(&mut self, interval: Interval) {
        self.ranges.push(interval);
        self.canonicalize();
    }

    /// Add every member of `other` to this set.
    pub fn union(&mut self, other: &IntervalSet) {
        self.ranges.extend_from_slice(&other.ranges);
        self.canonicalize();
    }

    /// Replace this set with its complement over all code points.
    pub fn negate(&mut self) {
        let mut out = Vec::with_capacity(self.ranges.len() + 1);
        let mut next = Some(MIN_CHAR);
        for r in self.ranges.iter() {
            if let Some(lo) = next {
                if lo < r.start {
                    // OK since r.start > lo >= MIN_CHAR.
                    if let Some(hi) = char_pred(r.start) {
                        out.push(Interval::new(lo, hi));
                    }
                }
            }
            next = char_succ(r.end);
        }
        if let Some(lo) = next {
            out.push(Interval::new(lo, MAX_CHAR));
        }
        self.ranges = out;
    }

    /// Retain only the members that are also members of `other`.
    pub fn intersect(&mut self, other: &IntervalSet) {
        let mut out = vec![];
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < other.ranges.len() {
            let (a, b) = (self.ranges[i], other.ranges[j]);
            let lo = core::cmp::max(a.start, b.start);
            let hi = core::cmp::min(a.end, b.end);
            if lo <= hi {
                out.push(Interval::new(lo, hi));
            }
            if a.end < b.end {
                i += 1;
            } else {
                j += 1;
            }
        }
        self.ranges = out;
    }

    fn canonicalize(&mut self) {
        if self.is_canonical() {
            return;
        }
        self.ranges.sort();
        let mut merged: Vec<Interval> = Vec::with_capacity(self.ranges.len());
        for r in self.ranges.drain(..) {
            if let Some(last) = merged.last_mut() {
                if last.is_contiguous(&r) {
                    last.end = core::cmp::max(last.end, r.end);
                    continue;
                }
            }
            merged.push(r);
        }
        self.ranges = merged;
    }

    fn is_canonical(&self) -> bool {
        self.ranges.windows(2).all(|w| {
            w[0] < w[1] && !w[0].is_contiguous(&w[1])
        })
    }
}

impl fmt::Display for IntervalSet {
    /// Writes the canonical form: `.` for every code point, a lone escaped
    /// character for a singleton, and otherwise a bracketed class such as
    /// `[a-dx]`.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_any() {
            return write!(f, ".");
        }
        if let Some(c) = self.as_single() {
            return write_escaped(f, c, false);
        }
        write!(f, "[")?;
        for r in self.ranges.iter() {
            write_escaped(f, r.start, true)?;
            if r.start != r.end {
                write!(f, "-")?;
                write_escaped(f, r.end, true)?;
            }
        }
        write!(f, "]")
    }
}

/// Writes `c` so that it re-parses as a literal, inside or outside of a
/// bracketed class.
pub(crate) fn write_escaped(
    f: &mut fmt::Formatter,
    c: char,
    in_class: bool,
) -> fmt::Result {
    let special = if in_class {
        matches!(c, '\\' | ']' | '[' | '-' | '^')
    } else {
        matches!(
            c,
            '\\' | '[' | ']' | '(' | ')' | '|' | '*' | '+' | '?' | '.'
        )
    };
    if special {
        write!(f, "\\{}", c)
    } else if c == '\n' {
        write!(f, "\\n")
    } else if c == '\t' {
        write!(f, "\\t")
    } else if c == '\r' {
        write!(f, "\\r")
    } else if c.is_control() || c.is_whitespace() && c != ' ' {
        let cp = u32::from(c);
        if cp <= 0xFF {
            write!(f, "\\x{:02X}", cp)
        } else if cp <= 0xFFFF {
            write!(f, "\\u{:04X}", cp)
        } else {
            write!(f, "\\U{:08X}", cp)
        }
    } else {
        write!(f, "{}", c)
    }
}

/// A set of boundaries that partitions the code point space.
///
/// Adding an interval marks its start and the point just past its end as
/// boundaries. After every interval of interest has been added, the
/// boundaries split the union of those intervals into disjoint fragments such
/// that each added interval is exactly a union of fragments. This is the
/// "distinguishing fragments" computation used by subset construction, where
/// outgoing NFA edges may partially overlap.
#[derive(Clone, Debug, Default)]
pub(crate) struct Boundaries {
    /// Pairs of (position, +1/-1 coverage delta). A position of 0x110000
    /// stands for "past the last code point".
    events: Vec<(u32, i32)>,
}

impl Boundaries {
    pub(crate) fn new() -> Boundaries {
        Boundaries::default()
    }

    pub(crate) fn add(&mut self, interval: Interval) {
        let start = u32::from(interval.start);
        let past = char_succ(interval.end).map(u32::from).unwrap_or(0x110000);
        self.events.push((start, 1));
        self.events.push((past, -1));
    }

    pub(crate) fn add_set(&mut self, set: &IntervalSet) {
        for &r in set.intervals() {
            self.add(r);
        }
    }

    /// Returns the disjoint fragments covering the union of every interval
    /// added, in ascending order.
    pub(crate) fn fragments(&self) -> Vec<Interval> {
        let mut events = self.events.clone();
        events.sort();
        let mut out = vec![];
        let mut coverage = 0i32;
        let mut i = 0;
        while i < events.len() {
            let at = events[i].0;
            while i < events.len() && events[i].0 == at {
                coverage += events[i].1;
                i += 1;
            }
            if coverage <= 0 || i >= events.len() {
                continue;
            }
            let next = events[i].0;
            // Boundaries are never inside the surrogate gap since they are
            // produced by char_succ or are the start of a char interval.
            let lo = char::from_u32(at);
            let hi = char::from_u32(next).and_then(char_pred).or_else(|| {
                if next == 0x110000 {
                    Some(MAX_CHAR)
                } else {
                    None
                }
            });
            if let (Some(lo), Some(hi)) = (lo, hi) {
                out.push(Interval::new(lo, hi));
            }
        }
        out
    }
}
