//! Line patterns shared by the event builder and the question state machine.
//! All patterns run against normalized text.

use regex::Regex;
use std::sync::LazyLock;

use crate::ParseError;

/// `QN=<n>`, optionally followed by content on the same line.
pub static QUESTION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^QN\s*=\s*(\d+)\b\s*(.*)$").expect("valid question marker regex"));

/// `A.` or `B)` with nothing else.
pub static BARE_OPTION_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-D][.)]$").expect("valid bare option label regex"));

/// `A. text` where label and text already share the line.
pub static OPTION_LABEL_WITH_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-D][.)]\s+.+$").expect("valid option label regex"));

/// Option line as seen by the state machine.
pub static OPTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-D])[.)]\s*(.+)$").expect("valid option line regex"));

/// A left table cell holding only a metadata key (trailing colon tolerated).
pub static ROW_META_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(ANSWER|MARK|UNIT|MIX CHOICES)\s*:?$").expect("valid row key regex"));

/// Metadata key line: `KEY: value`, `KEY:` or bare `KEY`.
pub static META_KEY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(ANSWER|MARK|UNIT|MIX CHOICES)\s*(?::\s*(.*))?$").expect("valid metadata key regex")
});

/// `[file: name.png]` reference to an image by name only.
pub static INLINE_IMAGE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[file\s*:\s*([^\]]+)\]").expect("valid inline image regex"));

pub fn is_question_marker(line: &str) -> bool {
    QUESTION_MARKER.is_match(line)
}

/// Sequence id and same-line remainder of a `QN=` marker, `Ok(None)` when the
/// line is not a marker. A marker whose number does not fit in `u32` is an error.
pub fn question_marker(line: &str) -> Result<Option<(u32, &str)>, ParseError> {
    let Some(caps) = QUESTION_MARKER.captures(line) else { return Ok(None) };
    let digits = caps.get(1).map_or("", |m| m.as_str());
    let seq = digits
        .parse::<u32>()
        .map_err(|_| ParseError::MalformedDocument(format!("question number {digits} is out of range")))?;
    let rest = caps.get(2).map_or("", |m| m.as_str().trim());
    Ok(Some((seq, rest)))
}
