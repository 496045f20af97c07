/*!
Capture group state.

During a backtracking search, every branch point needs its own copy of the
group offsets so that a failing alternative never leaks a capture into the
next one. [`Groups`] shares its slots behind an `Rc` and only copies them
when a branch writes a slot whose value actually changes. Branches that
never touch a group (the usual case inside a `.*` scan) keep sharing one
allocation, which is also what lets the backtracking stack recognize runs
of otherwise identical entries.

[`Captures`] and [`Span`] are the public view of a finished match.
*/

use std::{rc::Rc, sync::Arc};

use crate::re::program::{Program, Slot};

#[derive(Clone, Debug)]
pub(crate) struct Groups {
    slots: Rc<Vec<Slot>>,
}

impl Groups {
    pub(crate) fn new(slot_len: usize) -> Groups {
        Groups { slots: Rc::new(vec![None; slot_len]) }
    }

    #[inline]
    pub(crate) fn get(&self, slot: usize) -> Slot {
        self.slots[slot]
    }

    /// Set a slot, copying the shared slots first if another branch still
    /// refers to them.
    #[inline]
    pub(crate) fn set(&mut self, slot: usize, value: Slot) {
        if self.slots[slot] != value {
            Rc::make_mut(&mut self.slots)[slot] = value;
        }
    }

    #[inline]
    pub(crate) fn span(&self, group: usize) -> Option<(usize, usize)> {
        Program::span(&self.slots, group)
    }

    /// Returns true if both refer to the very same slots.
    #[inline]
    pub(crate) fn ptr_eq(&self, other: &Groups) -> bool {
        Rc::ptr_eq(&self.slots, &other.slots)
    }

    pub(crate) fn as_slice(&self) -> &[Slot] {
        &self.slots
    }
}

/// A range of byte offsets into a haystack. `start` is inclusive and `end`
/// is exclusive.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Span {
    /// The start offset of the span, inclusive.
    pub start: usize,
    /// The end offset of the span, exclusive.
    pub end: usize,
}

impl Span {
    /// Create a new span from its start and end offsets.
    pub fn new(start: usize, end: usize) -> Span {
        Span { start, end }
    }

    /// Returns the number of bytes in this span.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns true when this span covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Returns this span as a range, for slicing the haystack.
    pub fn range(&self) -> core::ops::Range<usize> {
        self.start..self.end
    }
}

impl From<core::ops::Range<usize>> for Span {
    fn from(range: core::ops::Range<usize>) -> Span {
        Span::new(range.start, range.end)
    }
}

/// The capture groups of a single match.
///
/// Group 0 is always present and spans the whole match. Other groups are
/// absent when they did not participate in the match.
#[derive(Clone, Debug)]
pub struct Captures {
    slots: Vec<Slot>,
    names: Arc<[Option<String>]>,
}

impl Captures {
    pub(crate) fn new(
        mut slots: Vec<Slot>,
        names: Arc<[Option<String>]>,
    ) -> Captures {
        slots.truncate(names.len() * 2);
        Captures { slots, names }
    }

    /// The span of group `index`, if it participated in the match.
    pub fn get(&self, index: usize) -> Option<Span> {
        Program::span(&self.slots, index).map(|(s, e)| Span::new(s, e))
    }

    /// The span of the group with the given name, if it participated in the
    /// match.
    pub fn name(&self, name: &str) -> Option<Span> {
        let index = self
            .names
            .iter()
            .position(|n| n.as_ref().map_or(false, |n| n == name))?;
        self.get(index)
    }

    /// The overall match.
    pub fn get_match(&self) -> Span {
        self.get(0).unwrap_or_else(|| Span::new(0, 0))
    }

    /// The number of groups, including group 0.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false, since group 0 exists.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate over the span of every group, in index order.
    pub fn iter(&self) -> impl Iterator<Item = Option<Span>> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::primitives::NonMaxUsize;

    fn slot(at: usize) -> Slot {
        NonMaxUsize::new(at)
    }

    #[test]
    fn copy_on_write() {
        let mut a = Groups::new(4);
        let mut b = a.clone();
        assert!(a.ptr_eq(&b));
        b.set(2, None);
        assert!(a.ptr_eq(&b));
        b.set(2, slot(3));
        assert!(!a.ptr_eq(&b));
        assert_eq!(a.get(2), None);
        assert_eq!(b.get(2), slot(3));
        a.set(2, slot(1));
        a.set(3, slot(4));
        assert_eq!(a.span(1), Some((1, 4)));
        assert_eq!(b.span(1), None);
    }

    #[test]
    fn captures_by_name() {
        let names: Arc<[Option<String>]> =
            vec![None, Some("x".to_string()), None].into();
        let caps = Captures::new(
            vec![slot(0), slot(5), slot(1), slot(2), None, None, slot(9)],
            names,
        );
        assert_eq!(caps.len(), 3);
        assert_eq!(caps.get_match(), Span::new(0, 5));
        assert_eq!(caps.name("x"), Some(Span::new(1, 2)));
        assert_eq!(caps.name("y"), None);
        assert_eq!(caps.get(2), None);
        assert_eq!(caps.get(3), None);
        assert_eq!(caps.iter().filter(Option::is_some).count(), 2);
    }
}
