//! Exam-template parser for DOCX packages.
//!
//! `parse` turns a header-plus-table template into a [`ParsedDocument`];
//! `parse_legacy` handles plain numbered-question documents.

pub mod blocks;
pub mod events;
pub mod header;
pub mod images;
pub mod legacy;
pub mod normalize;
pub mod package;
pub mod patterns;
pub mod questions;
pub mod validate;
mod error;

use std::path::Path;

pub use error::ParseError;
pub use events::StreamEvent;
pub use exam_model::{
    Choice, CountMismatch, HeaderField, HeaderMetadata, LegacyQuestion, ParsedDocument, QuestionDraft,
};

use events::EventCursor;
use package::DocxPackage;

/// Parse a complete template document held in memory.
///
/// All-or-nothing: any structural or validation failure returns an error and
/// no questions.
pub fn parse(raw: &[u8]) -> Result<ParsedDocument, ParseError> {
    let mut package = DocxPackage::open(raw)?;
    let events = events::build_events(&mut package)?;
    let mut cursor = EventCursor::new(events);
    let header = header::parse_header(&mut cursor)?;
    let questions = questions::collect_questions(&mut cursor)?;
    let count_mismatch = validate::validate(&header, &questions)?;
    tracing::info!(
        subject = %header.subject_code_or_name,
        topic = %header.topic_code,
        questions = questions.len(),
        images = questions.iter().filter(|q| q.has_embedded_image()).count(),
        "parsed exam template"
    );
    Ok(ParsedDocument { header, questions, count_mismatch })
}

/// Read and parse a template document from disk.
pub fn parse_file(path: impl AsRef<Path>) -> Result<ParsedDocument, ParseError> {
    let raw = std::fs::read(path)?;
    parse(&raw)
}

/// The flattened event stream of a document, for inspection.
pub fn read_events(raw: &[u8]) -> Result<Vec<StreamEvent>, ParseError> {
    let mut package = DocxPackage::open(raw)?;
    events::build_events(&mut package)
}

/// Parse a plain paragraph-only question document. Answers may be `None`;
/// the caller decides how to default them.
pub fn parse_legacy(raw: &[u8]) -> Result<Vec<LegacyQuestion>, ParseError> {
    let package = DocxPackage::open(raw)?;
    let questions = legacy::parse_package(&package)?;
    tracing::info!(questions = questions.len(), "parsed legacy question document");
    Ok(questions)
}
