use std::iter::Peekable;
use std::vec;

use crate::blocks::{Block, Paragraph, Row};
use crate::images::ImageExtractor;
use crate::normalize::normalize_text;
use crate::package::DocxPackage;
use crate::patterns::{is_question_marker, BARE_OPTION_LABEL, OPTION_LABEL_WITH_TEXT, ROW_META_KEY};
use crate::ParseError;

/// One item of the flattened reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Text(String),
    Image { filename: String, bytes: Vec<u8> },
}

impl StreamEvent {
    pub fn text(&self) -> Option<&str> {
        match self {
            StreamEvent::Text(s) => Some(s),
            StreamEvent::Image { .. } => None,
        }
    }
}

/// Flatten the document body into text and image events.
///
/// Paragraphs yield their text then their images. Table rows yield all text
/// events of the row before any image of the row.
pub fn build_events(package: &mut DocxPackage<'_>) -> Result<Vec<StreamEvent>, ParseError> {
    let (blocks, mut images) = package.parts();
    let mut events = Vec::new();
    for block in blocks {
        match block? {
            Block::Paragraph(p) => push_paragraph(&mut events, &p, &mut images),
            Block::Table(t) => {
                for row in &t.rows {
                    push_row(&mut events, row, &mut images);
                }
            }
        }
    }
    tracing::debug!(events = events.len(), "built event stream");
    Ok(events)
}

fn push_paragraph(events: &mut Vec<StreamEvent>, p: &Paragraph, images: &mut ImageExtractor<'_, '_>) {
    let text = normalize_text(&p.text);
    if !text.is_empty() {
        events.push(StreamEvent::Text(text));
    }
    for img in images.extract(p) {
        events.push(StreamEvent::Image { filename: img.filename, bytes: img.bytes });
    }
}

fn push_row(events: &mut Vec<StreamEvent>, row: &Row, images: &mut ImageExtractor<'_, '_>) {
    let cells: Vec<String> = row.cells.iter().map(|c| normalize_text(&c.text())).collect();
    events.extend(compose_row(&cells).into_iter().map(StreamEvent::Text));
    for cell in &row.cells {
        for p in &cell.paragraphs {
            for img in images.extract(p) {
                events.push(StreamEvent::Image { filename: img.filename, bytes: img.bytes });
            }
        }
    }
}

/// Text events for one table row, given its normalized cell texts.
///
/// The first two cells are composed as a (left, right) pair; any further
/// non-empty cells follow as their own events.
pub fn compose_row(cells: &[String]) -> Vec<String> {
    let left = cells.first().map(String::as_str).unwrap_or("");
    let right = cells.get(1).map(String::as_str).unwrap_or("");
    let mut out = Vec::new();

    if is_question_marker(left) {
        out.push(left.to_string());
        if !right.is_empty() { out.push(right.to_string()); }
    } else if BARE_OPTION_LABEL.is_match(left) && !right.is_empty() {
        out.push(format!("{} {}", left, right));
    } else if OPTION_LABEL_WITH_TEXT.is_match(left) {
        out.push(left.to_string());
    } else if ROW_META_KEY.is_match(left) && !right.is_empty() {
        let key = left.trim_end_matches(':').trim_end();
        out.push(format!("{}: {}", key, right));
    } else {
        if !left.is_empty() { out.push(left.to_string()); }
        if !right.is_empty() { out.push(right.to_string()); }
    }

    out.extend(cells.iter().skip(2).filter(|c| !c.is_empty()).cloned());
    out
}

/// Forward-only cursor over the event stream. Tracks how many events were consumed.
pub struct EventCursor {
    inner: Peekable<vec::IntoIter<StreamEvent>>,
    position: usize,
}

impl EventCursor {
    pub fn new(events: Vec<StreamEvent>) -> Self {
        Self { inner: events.into_iter().peekable(), position: 0 }
    }

    pub fn peek(&mut self) -> Option<&StreamEvent> {
        self.inner.peek()
    }

    /// Number of events already taken from the stream.
    pub fn consumed(&self) -> usize {
        self.position
    }
}

impl Iterator for EventCursor {
    type Item = StreamEvent;

    fn next(&mut self) -> Option<StreamEvent> {
        let ev = self.inner.next()?;
        self.position += 1;
        Some(ev)
    }
}
