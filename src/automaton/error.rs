/// An error that occurred while parsing a token pattern or building an
/// automaton from it.
///
/// The error is either a syntax error (with the character offset where
/// parsing stopped), a misplaced label, or a configured size limit being
/// exceeded.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Error {
    kind: ErrorKind,
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum ErrorKind {
    Syntax { offset: usize, reason: &'static str },
    LabelNotAtTop { label: String },
    TooManyStates { given: usize, limit: usize },
}

impl Error {
    pub(crate) fn syntax(offset: usize, reason: &'static str) -> Error {
        Error { kind: ErrorKind::Syntax { offset, reason } }
    }

    pub(crate) fn label_not_at_top(label: &str) -> Error {
        Error { kind: ErrorKind::LabelNotAtTop { label: label.to_string() } }
    }

    pub(crate) fn too_many_states(given: usize, limit: usize) -> Error {
        Error { kind: ErrorKind::TooManyStates { given, limit } }
    }

    /// For a syntax error, the character offset into the pattern at which
    /// the error was detected.
    pub fn offset(&self) -> Option<usize> {
        match self.kind {
            ErrorKind::Syntax { offset, .. } => Some(offset),
            _ => None,
        }
    }

    /// Returns true if this error was caused by an invalid pattern.
    pub fn is_syntax(&self) -> bool {
        matches!(self.kind, ErrorKind::Syntax { .. })
    }

    /// Returns true if this error was caused by a labelled node nested
    /// below the top level.
    pub fn is_label_not_at_top(&self) -> bool {
        matches!(self.kind, ErrorKind::LabelNotAtTop { .. })
    }

    /// Returns true if this error was caused by the state limit.
    pub fn is_too_many_states(&self) -> bool {
        matches!(self.kind, ErrorKind::TooManyStates { .. })
    }
}

impl std::error::Error for Error {}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.kind {
            ErrorKind::Syntax { offset, reason } => {
                write!(f, "syntax error at offset {}: {}", offset, reason)
            }
            ErrorKind::LabelNotAtTop { ref label } => write!(
                f,
                "label '{}' is only allowed on a top level alternative",
                label,
            ),
            ErrorKind::TooManyStates { given, limit } => write!(
                f,
                "automaton needs at least {} states, which exceeds the \
                 limit of {}",
                given, limit,
            ),
        }
    }
}
