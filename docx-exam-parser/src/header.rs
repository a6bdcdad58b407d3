use std::sync::LazyLock;

use exam_model::{HeaderField, HeaderMetadata};
use regex::Regex;

use crate::events::{EventCursor, StreamEvent};
use crate::patterns::is_question_marker;
use crate::ParseError;

static SUBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:Subject|Môn\s*học|Môn)\s*:\s*(.*)$").expect("valid subject regex"));
static QUESTION_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:Number\s+of\s+Quiz(?:zes)?|Số\s*câu\s*hỏi|Số\s*câu)\s*:\s*(.*)$").expect("valid quiz count regex")
});
static LECTURER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:Lecturer|Giảng\s*viên)\s*:\s*(.*)$").expect("valid lecturer regex"));
static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:Date|Ngày\s*thi|Ngày)\s*:\s*(.*)$").expect("valid date regex"));
static TOPIC_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:Topic\s*code|Mã\s*đề(?:\s*thi)?)\s*:\s*(.*)$").expect("valid topic code regex"));
static LEADING_INT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid integer regex"));

fn pattern(field: HeaderField) -> &'static Regex {
    match field {
        HeaderField::Subject => &SUBJECT,
        HeaderField::QuestionCount => &QUESTION_COUNT,
        HeaderField::Lecturer => &LECTURER,
        HeaderField::Date => &DATE,
        HeaderField::TopicCode => &TOPIC_CODE,
    }
}

/// Outcome of testing one line against the header keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderMatch {
    Value(HeaderField, String),
    /// Key present with nothing after the colon.
    Pending(HeaderField),
    NoMatch,
}

/// Try the header keys in fixed order; the first key that matches decides.
pub fn match_header_line(line: &str) -> HeaderMatch {
    for field in HeaderField::ALL {
        if let Some(caps) = pattern(field).captures(line) {
            let value = caps.get(1).map_or("", |m| m.as_str().trim());
            return if value.is_empty() { HeaderMatch::Pending(field) } else { HeaderMatch::Value(field, value.to_string()) };
        }
    }
    HeaderMatch::NoMatch
}

/// Header fields collected so far. The first assignment of a field wins.
#[derive(Debug, Default)]
pub struct HeaderBuilder {
    subject: Option<String>,
    question_count: Option<u32>,
    lecturer: Option<String>,
    date: Option<String>,
    topic_code: Option<String>,
}

impl HeaderBuilder {
    pub fn is_set(&self, field: HeaderField) -> bool {
        match field {
            HeaderField::Subject => self.subject.is_some(),
            HeaderField::QuestionCount => self.question_count.is_some(),
            HeaderField::Lecturer => self.lecturer.is_some(),
            HeaderField::Date => self.date.is_some(),
            HeaderField::TopicCode => self.topic_code.is_some(),
        }
    }

    /// Store `value` unless the field already has one. Returns whether it was stored.
    pub fn assign(&mut self, field: HeaderField, value: &str) -> bool {
        if self.is_set(field) {
            tracing::debug!(%field, value, "duplicate header line ignored");
            return false;
        }
        match field {
            HeaderField::Subject => self.subject = Some(value.to_string()),
            HeaderField::QuestionCount => {
                match LEADING_INT.find(value).and_then(|m| m.as_str().parse::<u32>().ok()) {
                    Some(n) => self.question_count = Some(n),
                    None => {
                        tracing::warn!(value, "question count is not an integer");
                        return false;
                    }
                }
            }
            HeaderField::Lecturer => self.lecturer = Some(value.to_string()),
            HeaderField::Date => self.date = Some(value.to_string()),
            HeaderField::TopicCode => self.topic_code = Some(value.to_string()),
        }
        true
    }

    pub fn missing(&self) -> Vec<HeaderField> {
        HeaderField::ALL.into_iter().filter(|f| !self.is_set(*f)).collect()
    }

    pub fn build(self) -> Result<HeaderMetadata, ParseError> {
        let missing = self.missing();
        match (self.subject, self.question_count, self.lecturer, self.date, self.topic_code) {
            (Some(subject), Some(count), Some(lecturer), Some(date), Some(topic)) => Ok(HeaderMetadata {
                subject_code_or_name: subject,
                declared_question_count: count,
                lecturer,
                issue_date: date,
                topic_code: topic,
            }),
            _ => Err(ParseError::MissingHeaderField(missing)),
        }
    }
}

/// Consume header events up to (not including) the first question marker.
///
/// Images before that point are dropped. A key whose value is empty takes the
/// next text event as its value unless that event is a key or a marker.
pub fn parse_header(cursor: &mut EventCursor) -> Result<HeaderMetadata, ParseError> {
    let mut builder = HeaderBuilder::default();
    let mut pending: Option<HeaderField> = None;

    while let Some(ev) = cursor.peek() {
        if let StreamEvent::Text(line) = ev {
            if is_question_marker(line) { break; }
        }
        let Some(StreamEvent::Text(line)) = cursor.next() else { continue };
        match match_header_line(&line) {
            HeaderMatch::Value(field, value) => {
                pending = None;
                builder.assign(field, &value);
            }
            HeaderMatch::Pending(field) => {
                pending = if builder.is_set(field) { None } else { Some(field) };
            }
            HeaderMatch::NoMatch => {
                if let Some(field) = pending.take() {
                    builder.assign(field, &line);
                }
            }
        }
    }

    if let Some(field) = pending {
        tracing::debug!(%field, "header key without value at end of header");
    }
    tracing::debug!(consumed = cursor.consumed(), "header parsed");
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(lines: &[&str]) -> EventCursor {
        EventCursor::new(lines.iter().map(|s| StreamEvent::Text(s.to_string())).collect())
    }

    #[test]
    fn reads_all_fields_and_stops_at_first_marker() {
        let mut cur = cursor(&[
            "Subject: MAT101",
            "Number of Quiz: 2",
            "Lecturer: Nguyen Van A",
            "Date: 2024-05-01",
            "Topic code: T01",
            "QN=1",
            "Stem",
        ]);
        let header = parse_header(&mut cur).expect("header complete");
        assert_eq!(header.subject_code_or_name, "MAT101");
        assert_eq!(header.declared_question_count, 2);
        assert_eq!(header.lecturer, "Nguyen Van A");
        assert_eq!(header.issue_date, "2024-05-01");
        assert_eq!(header.topic_code, "T01");
        assert_eq!(cur.next(), Some(StreamEvent::Text("QN=1".into())));
    }

    #[test]
    fn first_match_wins_for_duplicates() {
        let mut cur = cursor(&[
            "Subject: FIRST",
            "Subject: SECOND",
            "Number of Quiz: 1",
            "Lecturer: L",
            "Date: D",
            "Topic code: T",
        ]);
        let header = parse_header(&mut cur).expect("header complete");
        assert_eq!(header.subject_code_or_name, "FIRST");
    }

    #[test]
    fn vietnamese_labels_and_value_on_next_line() {
        let mut cur = cursor(&["Môn học:", "Toán cao cấp", "Số câu hỏi: 40 câu", "Giảng viên: B", "Ngày thi: 01/06/2024", "Mã đề: 101"]);
        let header = parse_header(&mut cur).expect("header complete");
        assert_eq!(header.subject_code_or_name, "Toán cao cấp");
        assert_eq!(header.declared_question_count, 40);
        assert_eq!(header.topic_code, "101");
    }

    #[test]
    fn pending_key_does_not_swallow_next_key() {
        let mut cur = cursor(&["Subject:", "Lecturer: L", "Number of Quiz: 1", "Date: D", "Topic code: T", "QN=1"]);
        let err = parse_header(&mut cur).expect_err("subject has no value");
        assert!(matches!(err, ParseError::MissingHeaderField(ref f) if f == &vec![HeaderField::Subject]));
    }

    #[test]
    fn missing_fields_are_named_exactly() {
        let mut cur = cursor(&["Subject: S", "Number of Quiz: 3", "Date: D", "QN=1"]);
        match parse_header(&mut cur) {
            Err(ParseError::MissingHeaderField(fields)) => {
                assert_eq!(fields, vec![HeaderField::Lecturer, HeaderField::TopicCode]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn images_before_marker_are_dropped() {
        let mut events = vec![StreamEvent::Image { filename: "logo.png".into(), bytes: vec![1] }];
        for l in ["Subject: S", "Number of Quiz: 1", "Lecturer: L", "Date: D", "Topic code: T"] {
            events.push(StreamEvent::Text(l.into()));
        }
        let mut cur = EventCursor::new(events);
        assert!(parse_header(&mut cur).is_ok());
        assert!(cur.next().is_none());
    }
}
