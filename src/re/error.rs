use crate::re::regex::Engine;

/// An error that occurred while building a regex.
///
/// Searching never fails once a regex has been built. The possible errors
/// are a syntax error in the pattern (with the byte offset at which it was
/// detected), a feature that the selected engine refuses, an unknown group
/// name in a reference or conditional, or a compiled program that exceeds
/// the configured size limit.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Error {
    kind: ErrorKind,
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum ErrorKind {
    Syntax { offset: usize, kind: SyntaxErrorKind },
    Unsupported { engine: Engine, feature: &'static str },
    ExceededSizeLimit { limit: usize },
    UnknownGroup { name: String },
}

/// The reason a pattern failed to parse.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SyntaxErrorKind {
    /// The pattern ended in the middle of a construct.
    UnexpectedEnd,
    /// A `(` without its `)`.
    UnclosedGroup,
    /// A `)` without its `(`.
    UnopenedGroup,
    /// A `[` without its `]`.
    UnclosedClass,
    /// A class range whose start is greater than its end, or whose bound is
    /// itself a class.
    InvalidClassRange,
    /// An unknown escape, or an escape not allowed where it appears.
    InvalidEscape,
    /// A malformed `\x`, `\u`, `\U` or octal escape.
    InvalidHex,
    /// A group name that is empty or contains invalid characters.
    InvalidGroupName,
    /// Two groups with the same name.
    DuplicateGroupName,
    /// A numbered reference to a group that does not exist or is still open.
    InvalidBackreference,
    /// A `(?` followed by something that is not a known group kind.
    InvalidGroupKind,
    /// An unknown inline flag.
    InvalidFlag,
    /// A repetition operator with nothing to repeat, or applied to another
    /// repetition.
    RepetitionMissing,
    /// A counted repetition whose minimum exceeds its maximum, or whose count
    /// does not fit in 32 bits.
    InvalidRepetitionCount,
    /// A conditional with more than two branches.
    InvalidConditional,
    /// A Unicode class or flag was used without Unicode support.
    UnicodeUnavailable,
}

impl Error {
    pub(crate) fn syntax(offset: usize, kind: SyntaxErrorKind) -> Error {
        Error { kind: ErrorKind::Syntax { offset, kind } }
    }

    pub(crate) fn unsupported(engine: Engine, feature: &'static str) -> Error {
        Error { kind: ErrorKind::Unsupported { engine, feature } }
    }

    pub(crate) fn exceeded_size_limit(limit: usize) -> Error {
        Error { kind: ErrorKind::ExceededSizeLimit { limit } }
    }

    pub(crate) fn unknown_group(name: &str) -> Error {
        Error { kind: ErrorKind::UnknownGroup { name: name.to_string() } }
    }

    /// For a syntax error, the byte offset into the pattern at which it was
    /// detected.
    pub fn offset(&self) -> Option<usize> {
        match self.kind {
            ErrorKind::Syntax { offset, .. } => Some(offset),
            _ => None,
        }
    }

    /// For a syntax error, the reason parsing failed.
    pub fn syntax_kind(&self) -> Option<SyntaxErrorKind> {
        match self.kind {
            ErrorKind::Syntax { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// Returns true if the selected engine refused the pattern.
    pub fn is_unsupported(&self) -> bool {
        matches!(self.kind, ErrorKind::Unsupported { .. })
    }

    /// Returns true if the compiled program exceeded the size limit.
    pub fn is_size_limit(&self) -> bool {
        matches!(self.kind, ErrorKind::ExceededSizeLimit { .. })
    }

    /// Returns true if a reference or conditional named an unknown group.
    pub fn is_unknown_group(&self) -> bool {
        matches!(self.kind, ErrorKind::UnknownGroup { .. })
    }
}

impl std::error::Error for Error {}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.kind {
            ErrorKind::Syntax { offset, kind } => {
                write!(f, "regex parse error at offset {}: ", offset)?;
                let msg = match kind {
                    SyntaxErrorKind::UnexpectedEnd => "unexpected end of pattern",
                    SyntaxErrorKind::UnclosedGroup => "unclosed group",
                    SyntaxErrorKind::UnopenedGroup => "unopened group",
                    SyntaxErrorKind::UnclosedClass => "unclosed character class",
                    SyntaxErrorKind::InvalidClassRange => {
                        "invalid character class range"
                    }
                    SyntaxErrorKind::InvalidEscape => "invalid escape",
                    SyntaxErrorKind::InvalidHex => "invalid hexadecimal escape",
                    SyntaxErrorKind::InvalidGroupName => "invalid group name",
                    SyntaxErrorKind::DuplicateGroupName => {
                        "duplicate group name"
                    }
                    SyntaxErrorKind::InvalidBackreference => {
                        "invalid group reference"
                    }
                    SyntaxErrorKind::InvalidGroupKind => "unknown group kind",
                    SyntaxErrorKind::InvalidFlag => "unknown flag",
                    SyntaxErrorKind::RepetitionMissing => "nothing to repeat",
                    SyntaxErrorKind::InvalidRepetitionCount => {
                        "invalid repetition count"
                    }
                    SyntaxErrorKind::InvalidConditional => {
                        "conditional has more than two branches"
                    }
                    SyntaxErrorKind::UnicodeUnavailable => {
                        "Unicode support is not available"
                    }
                };
                write!(f, "{}", msg)
            }
            ErrorKind::Unsupported { engine, feature } => write!(
                f,
                "the {:?} engine does not support {}",
                engine, feature,
            ),
            ErrorKind::ExceededSizeLimit { limit } => write!(
                f,
                "compiled regex exceeds size limit of {} operations",
                limit,
            ),
            ErrorKind::UnknownGroup { ref name } => {
                write!(f, "reference to unknown group '{}'", name)
            }
        }
    }
}
