use crate::{
    automaton,
    util::primitives::{MatcherID, SmallIndex},
};

/// An error that can occur while building a grammar or running a parser.
///
/// Ordinary match failure is never an error: a matcher that cannot match
/// simply produces no alternatives. Errors are reserved for grammars that
/// are misconfigured (an unbound or doubly bound `Delayed` matcher), for
/// left recursion hitting a memo that cannot handle it, and for configured
/// limits being exceeded. All of these abort the run that hit them.
#[derive(Clone, Debug)]
pub struct Error {
    kind: ErrorKind,
}

/// The kind of error that occurred.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// A `Delayed` matcher was invoked before it was bound.
    Unbound {
        /// The unbound matcher.
        matcher: MatcherID,
    },
    /// A `Delayed` matcher was bound a second time.
    AlreadyBound {
        /// The matcher that was already bound.
        matcher: MatcherID,
    },
    /// An attempt was made to bind a matcher that is not `Delayed`.
    NotDelayed {
        /// The matcher given.
        matcher: MatcherID,
    },
    /// An attempt was made to invert a matcher that is not a lookahead.
    NotLookahead {
        /// The matcher given.
        matcher: MatcherID,
    },
    /// A chain of `Delayed` matchers refers back to itself without ever
    /// reaching a concrete matcher.
    DelayedCycle {
        /// A matcher on the cycle.
        matcher: MatcherID,
    },
    /// A matcher identifier does not belong to the grammar it was used with.
    UnknownMatcher {
        /// The offending identifier.
        matcher: MatcherID,
    },
    /// A matcher behind an ordinary (right) memo was re-entered at the same
    /// position before producing its first result. The grammar is left
    /// recursive and needs the left-recursion memo there.
    LeftRecursion {
        /// The memoized matcher.
        matcher: MatcherID,
        /// The absolute stream offset of the re-entry.
        offset: usize,
    },
    /// The configured bound on trampoline steps was exceeded.
    StepLimitExceeded {
        /// The configured limit.
        limit: u64,
    },
    /// Too many matchers were added to a grammar.
    TooManyMatchers {
        /// The number of matchers requested.
        given: usize,
        /// The limit on the number of matchers.
        limit: usize,
    },
    /// More coroutines were alive at once than can be addressed.
    TooManyCoroutines {
        /// The limit on the number of simultaneously live coroutines.
        limit: usize,
    },
    /// A token automaton could not be built.
    Automaton(automaton::Error),
}

impl Error {
    /// Return the kind of this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns true if this error reports left recursion detected by an
    /// ordinary memo.
    pub fn is_left_recursion(&self) -> bool {
        matches!(self.kind, ErrorKind::LeftRecursion { .. })
    }

    pub(crate) fn unbound(matcher: MatcherID) -> Error {
        Error { kind: ErrorKind::Unbound { matcher } }
    }

    pub(crate) fn already_bound(matcher: MatcherID) -> Error {
        Error { kind: ErrorKind::AlreadyBound { matcher } }
    }

    pub(crate) fn not_delayed(matcher: MatcherID) -> Error {
        Error { kind: ErrorKind::NotDelayed { matcher } }
    }

    pub(crate) fn not_lookahead(matcher: MatcherID) -> Error {
        Error { kind: ErrorKind::NotLookahead { matcher } }
    }

    pub(crate) fn delayed_cycle(matcher: MatcherID) -> Error {
        Error { kind: ErrorKind::DelayedCycle { matcher } }
    }

    pub(crate) fn unknown_matcher(matcher: MatcherID) -> Error {
        Error { kind: ErrorKind::UnknownMatcher { matcher } }
    }

    pub(crate) fn left_recursion(matcher: MatcherID, offset: usize) -> Error {
        Error { kind: ErrorKind::LeftRecursion { matcher, offset } }
    }

    pub(crate) fn step_limit_exceeded(limit: u64) -> Error {
        Error { kind: ErrorKind::StepLimitExceeded { limit } }
    }

    pub(crate) fn too_many_matchers(given: usize) -> Error {
        let limit = MatcherID::LIMIT;
        Error { kind: ErrorKind::TooManyMatchers { given, limit } }
    }

    pub(crate) fn too_many_coroutines() -> Error {
        let limit = SmallIndex::LIMIT;
        Error { kind: ErrorKind::TooManyCoroutines { limit } }
    }
}

impl From<automaton::Error> for Error {
    fn from(err: automaton::Error) -> Error {
        Error { kind: ErrorKind::Automaton(err) }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.kind {
            ErrorKind::Automaton(ref err) => Some(err),
            _ => None,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.kind {
            ErrorKind::Unbound { matcher } => {
                write!(f, "Delayed matcher {} still unbound", matcher)
            }
            ErrorKind::AlreadyBound { matcher } => {
                write!(f, "Delayed matcher {} already bound", matcher)
            }
            ErrorKind::NotDelayed { matcher } => {
                write!(f, "matcher {} is not a Delayed matcher", matcher)
            }
            ErrorKind::NotLookahead { matcher } => {
                write!(f, "matcher {} is not a lookahead", matcher)
            }
            ErrorKind::DelayedCycle { matcher } => write!(
                f,
                "Delayed matcher {} only refers to other Delayed matchers",
                matcher,
            ),
            ErrorKind::UnknownMatcher { matcher } => {
                write!(f, "matcher {} does not exist in this grammar", matcher)
            }
            ErrorKind::LeftRecursion { matcher, offset } => write!(
                f,
                "left recursion detected in matcher {} at offset {} \
                 (use the left recursive memo for this matcher)",
                matcher, offset,
            ),
            ErrorKind::StepLimitExceeded { limit } => {
                write!(f, "parse exceeded the limit of {} steps", limit)
            }
            ErrorKind::TooManyMatchers { given, limit } => write!(
                f,
                "attempted to add {} matchers, which exceeds the limit of {}",
                given, limit,
            ),
            ErrorKind::TooManyCoroutines { limit } => write!(
                f,
                "more than {} coroutines alive at once (set max_coroutines)",
                limit,
            ),
            ErrorKind::Automaton(_) => write!(f, "error building token matcher"),
        }
    }
}
