//! Markdown normalization
//!
//! Model output is displayed as plain text, so common Markdown syntax is
//! stripped: headings, bold and italic emphasis, list bullets and
//! horizontal rules.

use regex::Regex;
use std::sync::LazyLock;

static HEADING_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*#+\s*").unwrap()
});

static BOLD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*(.*?)\*\*|__(.*?)__").unwrap()
});

static ITALIC_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*(.*?)\*|_(.*?)_").unwrap()
});

static BULLET_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*[*+-]\s+").unwrap()
});

static RULE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*-{3,}[ \t\r]*$").unwrap()
});

/// Strip Markdown syntax from `text` and trim the result.
///
/// Bold is removed before italic so that `**x**` is not split into two
/// single-asterisk spans. Text without any markers is returned trimmed.
pub fn normalize(text: &str) -> String {
    let text = HEADING_REGEX.replace_all(text, "");
    let text = BOLD_REGEX.replace_all(&text, "${1}${2}");
    let text = ITALIC_REGEX.replace_all(&text, "${1}${2}");
    let text = BULLET_REGEX.replace_all(&text, "");
    let text = RULE_REGEX.replace_all(&text, "");
    text.trim().to_string()
}
