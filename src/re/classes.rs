/*!
Character classes used by the regex parser: the Perl shorthands `\d`, `\w`
and `\s` in their ASCII and Unicode flavors, and simple case folding.

The Unicode tables come from `regex-syntax` when the `unicode` feature is
enabled. Without it, only the ASCII flavors exist and folding only relates
ASCII letters.
*/

use crate::util::interval::{Interval, IntervalSet};

/// One of the Perl class shorthands.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Perl {
    Digit,
    Word,
    Space,
}

/// Returns the class for a Perl shorthand.
///
/// This returns `None` when a Unicode class is asked for but Unicode support
/// is not available.
pub(crate) fn perl(kind: Perl, negated: bool, ascii: bool) -> Option<IntervalSet> {
    let mut set = if ascii { perl_ascii(kind) } else { perl_unicode(kind)? };
    if negated {
        set.negate();
    }
    Some(set)
}

fn perl_ascii(kind: Perl) -> IntervalSet {
    match kind {
        Perl::Digit => IntervalSet::range('0', '9'),
        Perl::Word => IntervalSet::new(vec![
            Interval::new('0', '9'),
            Interval::new('A', 'Z'),
            Interval::single('_'),
            Interval::new('a', 'z'),
        ]),
        Perl::Space => IntervalSet::new(vec![
            Interval::new('\t', '\r'),
            Interval::single(' '),
        ]),
    }
}

#[cfg(feature = "unicode")]
fn perl_unicode(kind: Perl) -> Option<IntervalSet> {
    use regex_syntax::hir::{Class, HirKind};

    let pattern = match kind {
        Perl::Digit => r"\d",
        Perl::Word => r"\w",
        Perl::Space => r"\s",
    };
    let hir = regex_syntax::ParserBuilder::new().build().parse(pattern).ok()?;
    match *hir.kind() {
        HirKind::Class(Class::Unicode(ref cls)) => Some(IntervalSet::new(
            cls.ranges().iter().map(|r| Interval::new(r.start(), r.end())),
        )),
        _ => None,
    }
}

#[cfg(not(feature = "unicode"))]
fn perl_unicode(_: Perl) -> Option<IntervalSet> {
    None
}

/// Add the simple case folding equivalents of every character in `set`.
///
/// With `ascii`, or without Unicode support, only ASCII letters are folded.
pub(crate) fn case_fold(set: &mut IntervalSet, ascii: bool) {
    if !ascii && case_fold_unicode(set) {
        return;
    }
    let mut folded = set.clone();
    for r in set.intervals() {
        for &(lo, hi, delta) in &[('a', 'z', -32i32), ('A', 'Z', 32i32)] {
            let start = r.start().max(lo);
            let end = r.end().min(hi);
            if start > end {
                continue;
            }
            let shift = |c: char| {
                char::from_u32((u32::from(c) as i32 + delta) as u32)
            };
            if let (Some(a), Some(b)) = (shift(start), shift(end)) {
                folded.push(Interval::new(a, b));
            }
        }
    }
    *set = folded;
}

#[cfg(feature = "unicode")]
fn case_fold_unicode(set: &mut IntervalSet) -> bool {
    use regex_syntax::hir::{ClassUnicode, ClassUnicodeRange};

    let mut cls = ClassUnicode::new(
        set.intervals().iter().map(|r| ClassUnicodeRange::new(r.start(), r.end())),
    );
    if cls.try_case_fold_simple().is_err() {
        return false;
    }
    *set = IntervalSet::new(
        cls.ranges().iter().map(|r| Interval::new(r.start(), r.end())),
    );
    true
}

#[cfg(not(feature = "unicode"))]
fn case_fold_unicode(_: &mut IntervalSet) -> bool {
    false
}

/// Returns true if `a` and `b` are equal under simple case folding.
pub(crate) fn fold_eq(a: char, b: char, ascii: bool) -> bool {
    if a == b {
        return true;
    }
    if ascii || a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(&b);
    }
    let mut set = IntervalSet::single(a);
    case_fold(&mut set, ascii);
    set.contains(b)
}

/// The class matched by `.`.
pub(crate) fn dot(dot_matches_new_line: bool) -> IntervalSet {
    let mut set = IntervalSet::any();
    if !dot_matches_new_line {
        let mut nl = IntervalSet::single('\n');
        nl.negate();
        set.intersect(&nl);
    }
    set
}
