/// A zero-width assertion about the position in the haystack.
///
/// Word boundaries come in an ASCII and a Unicode flavor. The ASCII flavor
/// only considers `[0-9A-Za-z_]` to be word characters, while the Unicode
/// flavor uses the Unicode definition of a word character (when Unicode
/// support is compiled in).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Look {
    /// At the beginning of the haystack. Written `\A`, or `^` outside of
    /// multi-line mode.
    Start,
    /// At the end of the haystack. Written `\Z`.
    End,
    /// At the end of the haystack or just before a `\n` that ends it.
    /// Written `$` outside of multi-line mode.
    EndFinalNewline,
    /// At the beginning of the haystack or just after a `\n`.
    StartLine,
    /// At the end of the haystack or just before a `\n`.
    EndLine,
    /// Between a word and a non-word character, ASCII definition.
    WordAscii,
    /// Not between a word and a non-word character, ASCII definition.
    WordAsciiNegate,
    /// Between a word and a non-word character, Unicode definition.
    WordUnicode,
    /// Not between a word and a non-word character, Unicode definition.
    WordUnicodeNegate,
}

impl Look {
    /// Returns true when position `at` in `haystack` satisfies this
    /// assertion.
    ///
    /// This panics if `at > haystack.len()`.
    #[inline]
    pub fn matches(self, haystack: &str, at: usize) -> bool {
        match self {
            Look::Start => at == 0,
            Look::End => at == haystack.len(),
            Look::EndFinalNewline => {
                at == haystack.len()
                    || (at + 1 == haystack.len()
                        && haystack.as_bytes()[at] == b'\n')
            }
            Look::StartLine => {
                at == 0 || haystack.as_bytes()[at - 1] == b'\n'
            }
            Look::EndLine => {
                at == haystack.len() || haystack.as_bytes()[at] == b'\n'
            }
            Look::WordAscii => is_word_boundary(haystack, at, is_word_ascii),
            Look::WordAsciiNegate => {
                !is_word_boundary(haystack, at, is_word_ascii)
            }
            Look::WordUnicode => {
                is_word_boundary(haystack, at, is_word_unicode)
            }
            Look::WordUnicodeNegate => {
                !is_word_boundary(haystack, at, is_word_unicode)
            }
        }
    }

    /// The escape or anchor this assertion is written as.
    pub fn as_str(self) -> &'static str {
        match self {
            Look::Start => "\\A",
            Look::End => "\\Z",
            Look::EndFinalNewline => "(?-m:$)",
            Look::StartLine => "(?m:^)",
            Look::EndLine => "(?m:$)",
            Look::WordAscii => "(?a:\\b)",
            Look::WordAsciiNegate => "(?a:\\B)",
            Look::WordUnicode => "\\b",
            Look::WordUnicodeNegate => "\\B",
        }
    }
}

fn is_word_boundary(haystack: &str, at: usize, is_word: fn(char) -> bool) -> bool {
    let before = haystack[..at].chars().next_back().map_or(false, is_word);
    let after = haystack[at..].chars().next().map_or(false, is_word);
    before != after
}

/// Returns true if `c` is in `[0-9A-Za-z_]`.
pub(crate) fn is_word_ascii(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Returns true if `c` is a Unicode word character.
#[cfg(feature = "unicode")]
pub(crate) fn is_word_unicode(c: char) -> bool {
    regex_syntax::try_is_word_character(c).unwrap_or_else(|_| is_word_ascii(c))
}

/// Returns true if `c` is a word character. Without Unicode support this is
/// the ASCII definition.
#[cfg(not(feature = "unicode"))]
pub(crate) fn is_word_unicode(c: char) -> bool {
    is_word_ascii(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchors() {
        let h = "ab\ncd";
        assert!(Look::Start.matches(h, 0));
        assert!(!Look::Start.matches(h, 3));
        assert!(Look::StartLine.matches(h, 3));
        assert!(Look::EndLine.matches(h, 2));
        assert!(!Look::End.matches(h, 2));
        assert!(Look::End.matches(h, 5));

        let h = "ab\n";
        assert!(Look::EndFinalNewline.matches(h, 2));
        assert!(Look::EndFinalNewline.matches(h, 3));
        assert!(!Look::End.matches(h, 2));
        assert!(!Look::EndFinalNewline.matches("ab\ncd", 2));
        assert!(!Look::EndFinalNewline.matches("ab\n\n", 2));
    }

    #[test]
    fn word_boundaries() {
        let h = "ab cd";
        assert!(Look::WordAscii.matches(h, 0));
        assert!(Look::WordAscii.matches(h, 2));
        assert!(!Look::WordAscii.matches(h, 1));
        assert!(Look::WordAsciiNegate.matches(h, 1));
        assert!(Look::WordAscii.matches(h, 5));
        assert!(!Look::WordAscii.matches("", 0));
    }

    #[cfg(feature = "unicode")]
    #[test]
    fn unicode_word_boundaries() {
        let h = "δx é";
        assert!(!Look::WordUnicode.matches(h, 2));
        assert!(Look::WordAscii.matches(h, 2));
        assert!(Look::WordUnicode.matches(h, "δx".len()));
        assert!(Look::WordUnicode.matches(h, h.len()));
    }
}
