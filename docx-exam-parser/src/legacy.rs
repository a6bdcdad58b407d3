use std::sync::LazyLock;

use exam_model::{Choice, LegacyQuestion};
use regex::Regex;

use crate::blocks::Block;
use crate::normalize::normalize_text;
use crate::package::DocxPackage;
use crate::ParseError;

static QUESTION_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:Q\s*\d+\.|\d+\.)\s*(.+)$").expect("valid legacy question regex"));
static OPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-D])[.)]\s*(.+?)(\s*\*)?$").expect("valid legacy option regex"));
static ANSWER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:Answer|Đáp\s*án)\s*:\s*([A-D])").expect("valid legacy answer regex"));

/// Parse plain `Q1.` / `A.` / `Answer:` lines. Lines before the first question
/// and lines that are neither options nor answers are ignored.
pub fn parse_lines<I, S>(lines: I) -> Vec<LegacyQuestion>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = Vec::new();
    let mut cur: Option<LegacyQuestion> = None;

    for raw in lines {
        let line = normalize_text(raw.as_ref());
        if line.is_empty() { continue; }

        if let Some(caps) = QUESTION_START.captures(&line) {
            if let Some(q) = cur.take() { out.push(q); }
            cur = Some(LegacyQuestion::new(caps[1].trim()));
            continue;
        }
        let Some(q) = cur.as_mut() else { continue };

        if let Some(caps) = OPTION.captures(&line) {
            let label = caps[1].chars().next().unwrap_or('A');
            q.choices.push(Choice::new(label, caps[2].trim()));
            if caps.get(3).is_some() { q.answer = Some(label); }
            continue;
        }
        if let Some(caps) = ANSWER.captures(&line) {
            q.answer = caps[1].chars().next().map(|c| c.to_ascii_uppercase());
        }
    }
    if let Some(q) = cur { out.push(q); }
    out
}

/// Paragraph-only parse of a package: top-level paragraphs, tables skipped.
pub fn parse_package(package: &DocxPackage<'_>) -> Result<Vec<LegacyQuestion>, ParseError> {
    let mut lines = Vec::new();
    for block in package.blocks() {
        if let Block::Paragraph(p) = block? {
            lines.push(p.text);
        }
    }
    Ok(parse_lines(lines))
}
