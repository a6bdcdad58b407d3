//! Shared records produced by the exam-template parser and consumed by the import service.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The five fixed header fields of a template document, in matching order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HeaderField {
    Subject,
    QuestionCount,
    Lecturer,
    Date,
    TopicCode,
}

impl HeaderField {
    /// Fixed order in which header matchers are tried.
    pub const ALL: [HeaderField; 5] = [
        HeaderField::Subject,
        HeaderField::QuestionCount,
        HeaderField::Lecturer,
        HeaderField::Date,
        HeaderField::TopicCode,
    ];

    pub fn label(self) -> &'static str {
        match self {
            HeaderField::Subject => "Subject",
            HeaderField::QuestionCount => "Number of Quiz",
            HeaderField::Lecturer => "Lecturer",
            HeaderField::Date => "Date",
            HeaderField::TopicCode => "Topic code",
        }
    }
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Header block of a template document. Built once per parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderMetadata {
    pub subject_code_or_name: String,
    pub declared_question_count: u32,
    pub lecturer: String,
    pub issue_date: String,
    pub topic_code: String,
}

/// One answer option of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Single uppercase letter A-Z.
    pub label: char,
    pub text: String,
}

impl Choice {
    pub fn new(label: char, text: impl Into<String>) -> Self {
        Self { label: label.to_ascii_uppercase(), text: text.into() }
    }
}

/// A question as accumulated from the event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDraft {
    /// Number captured from the `QN=<n>` marker. Not necessarily contiguous or sorted.
    pub sequence_id: u32,
    pub stem_text: String,
    pub choices: Vec<Choice>,
    pub correct_label: Option<char>,
    pub image_filename: Option<String>,
    /// Raw bytes of the first embedded image. Never serialized.
    #[serde(skip)]
    pub image_bytes: Option<Vec<u8>>,
    pub mark: f64,
    pub unit: String,
    pub mix_choices: bool,
}

impl QuestionDraft {
    pub fn new(sequence_id: u32) -> Self {
        Self {
            sequence_id,
            stem_text: String::new(),
            choices: Vec::new(),
            correct_label: None,
            image_filename: None,
            image_bytes: None,
            mark: 1.0,
            unit: String::new(),
            mix_choices: false,
        }
    }

    /// Appends one stem line, newline-separated from what is already there.
    pub fn push_stem_line(&mut self, line: &str) {
        if !self.stem_text.is_empty() {
            self.stem_text.push('\n');
        }
        self.stem_text.push_str(line);
    }

    pub fn has_embedded_image(&self) -> bool {
        self.image_bytes.is_some()
    }

    pub fn choice(&self, label: char) -> Option<&Choice> {
        self.choices.iter().find(|c| c.label == label)
    }
}

/// Declared header count vs. number of questions actually found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountMismatch {
    pub declared: u32,
    pub actual: u32,
}

impl fmt::Display for CountMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "header declares {} questions but {} were found", self.declared, self.actual)
    }
}

/// Successful result of a template parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub header: HeaderMetadata,
    /// Document order of the `QN=` markers.
    pub questions: Vec<QuestionDraft>,
    pub count_mismatch: Option<CountMismatch>,
}

/// Question produced by the paragraph-only parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyQuestion {
    pub text: String,
    pub choices: Vec<Choice>,
    pub answer: Option<char>,
}

impl LegacyQuestion {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), choices: Vec::new(), answer: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stem_lines_are_newline_joined() {
        let mut q = QuestionDraft::new(3);
        q.push_stem_line("first");
        q.push_stem_line("second");
        assert_eq!(q.stem_text, "first\nsecond");
        assert_eq!(q.mark, 1.0);
        assert!(!q.mix_choices);
    }

    #[test]
    fn image_bytes_are_not_serialized() {
        let mut q = QuestionDraft::new(1);
        q.image_filename = Some("image1.png".into());
        q.image_bytes = Some(vec![1, 2, 3]);
        let json = serde_json::to_string(&q).expect("serialize");
        assert!(json.contains("image1.png"));
        assert!(!json.contains("image_bytes"));
    }

    #[test]
    fn choice_labels_are_uppercased() {
        let c = Choice::new('b', "two");
        assert_eq!(c.label, 'B');
    }

    #[test]
    fn header_fields_display_their_labels() {
        let names: Vec<String> = HeaderField::ALL.iter().map(|f| f.to_string()).collect();
        assert_eq!(names, vec!["Subject", "Number of Quiz", "Lecturer", "Date", "Topic code"]);
    }
}
