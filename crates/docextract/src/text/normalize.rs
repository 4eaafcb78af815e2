use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static CONTROL_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F-\x9F]").expect("Control chars regex pattern is valid and should compile")
});
static REPLACEMENT_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\u{FFFD}+").expect("Replacement chars regex pattern is valid and should compile"));
static HORIZONTAL_WHITESPACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[ \t\u{00A0}\u{1680}\u{2000}-\u{200A}\u{202F}\u{205F}\u{3000}]+")
        .expect("Whitespace regex pattern is valid and should compile")
});
static EXCESS_NEWLINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("Newline regex pattern is valid and should compile"));

/// Normalize whitespace and encoding artifacts of extracted text.
///
/// Line endings become `\n`, the text is NFC-composed, control characters and
/// U+FFFD runs are removed, horizontal whitespace collapses to one space, lines
/// are trimmed and paragraphs are separated by at most one blank line.
pub fn normalize_text(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let composed: String = unified.nfc().collect();
    let cleaned = CONTROL_CHARS.replace_all(&composed, "");
    let cleaned = REPLACEMENT_CHARS.replace_all(&cleaned, "");
    let spaced = HORIZONTAL_WHITESPACE.replace_all(&cleaned, " ");

    let trimmed_lines = spaced.split('\n').map(str::trim).collect::<Vec<_>>().join("\n");
    EXCESS_NEWLINES.replace_all(trimmed_lines.trim(), "\n\n").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_spaces_and_tabs() {
        assert_eq!(normalize_text("a  \t b\u{00A0}c"), "a b c");
    }

    #[test]
    fn test_unifies_line_endings_and_blank_lines() {
        assert_eq!(normalize_text("one\r\ntwo\r\n\r\n\r\n\r\nthree\r"), "one\ntwo\n\nthree");
    }

    #[test]
    fn test_trims_lines() {
        assert_eq!(normalize_text("  first  \n   second"), "first\nsecond");
    }

    #[test]
    fn test_strips_control_and_replacement_chars() {
        assert_eq!(normalize_text("ab\u{0000}c\u{FFFD}\u{FFFD}d\u{0007}"), "abcd");
    }

    #[test]
    fn test_composes_to_nfc() {
        let decomposed = "e\u{0301}";
        assert_eq!(normalize_text(decomposed), "\u{00E9}");
    }

    #[test]
    fn test_whitespace_only_is_empty() {
        assert_eq!(normalize_text(" \n\t \r\n"), "");
    }

    #[test]
    fn test_idempotent() {
        let once = normalize_text("  Hello\t\tworld \n\n\n\n next ");
        assert_eq!(normalize_text(&once), once);
    }
}
