//! Text cleanup for content moving between presentations.
//!
//! Normalizes Unicode to NFC, unifies line endings and strips characters
//! that cannot appear in an XML text node.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Characters that are illegal in XML 1.0 text (tab, LF and CR excluded).
static XML_ILLEGAL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x{FFFE}\x{FFFF}]").unwrap());

/// Regex to collapse runs of spaces and tabs into one.
static WHITESPACE_COLLAPSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());

/// Whitespace at the end of a line.
static TRAILING_SPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)[ \t]+$").unwrap());

/// Three or more consecutive newlines.
static EXCESS_BLANK_LINES_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Line separator used by slide text frames for soft breaks.
const VERTICAL_TAB: char = '\u{000B}';

/// Cleans text extracted from or written to a presentation.
#[derive(Debug, Clone, Default)]
pub struct TextSanitizer {
    /// Whether to collapse runs of spaces/tabs into one space.
    collapse_whitespace: bool,
}

impl TextSanitizer {
    /// Create a sanitizer that leaves inner whitespace untouched.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to collapse runs of spaces and tabs.
    pub fn with_collapse_whitespace(mut self, collapse: bool) -> Self {
        self.collapse_whitespace = collapse;
        self
    }

    /// Sanitize a piece of text.
    ///
    /// Paragraph breaks (`"\n\n"`) survive; longer runs of blank lines are
    /// folded into a single paragraph break.
    pub fn sanitize(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let mut result: String = text.nfc().collect();
        result = result
            .replace("\r\n", "\n")
            .replace('\r', "\n")
            .replace(VERTICAL_TAB, "\n");
        result = XML_ILLEGAL_REGEX.replace_all(&result, "").into_owned();

        if self.collapse_whitespace {
            result = WHITESPACE_COLLAPSE_REGEX
                .replace_all(&result, " ")
                .into_owned();
        }

        result = TRAILING_SPACE_REGEX.replace_all(&result, "").into_owned();
        result = EXCESS_BLANK_LINES_REGEX
            .replace_all(&result, "\n\n")
            .into_owned();

        result.trim().to_string()
    }

    /// Sanitize a single-line value such as a title or a table cell.
    pub fn sanitize_line(&self, text: &str) -> String {
        self.sanitize(text)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
