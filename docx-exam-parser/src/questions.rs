use std::sync::LazyLock;

use exam_model::{Choice, QuestionDraft};
use regex::Regex;

use crate::events::StreamEvent;
use crate::normalize::normalize_text;
use crate::patterns::{question_marker, INLINE_IMAGE_MARKER, META_KEY_LINE, OPTION_LINE};
use crate::ParseError;

static ANSWER_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^([A-D])\s*[.)]?$").expect("valid answer regex"));
static MARK_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(?:\d+(?:[.,]\d*)?|[.,]\d+)$").expect("valid mark regex"));

/// Per-question metadata keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaField {
    Answer,
    Mark,
    Unit,
    MixChoices,
}

impl MetaField {
    fn from_key(key: &str) -> Option<Self> {
        match key.to_ascii_uppercase().as_str() {
            "ANSWER" => Some(MetaField::Answer),
            "MARK" => Some(MetaField::Mark),
            "UNIT" => Some(MetaField::Unit),
            "MIX CHOICES" => Some(MetaField::MixChoices),
            _ => None,
        }
    }

    /// Coerce a raw value to this field's type.
    pub fn coerce(self, raw: &str) -> Option<MetaValue> {
        let raw = raw.trim();
        if raw.is_empty() { return None; }
        match self {
            MetaField::Answer => {
                let caps = ANSWER_VALUE.captures(raw)?;
                caps[1].chars().next().map(|c| MetaValue::Answer(c.to_ascii_uppercase()))
            }
            MetaField::Mark => {
                if !MARK_VALUE.is_match(raw) { return None; }
                raw.replace(',', ".").parse::<f64>().ok().map(MetaValue::Mark)
            }
            MetaField::Unit => Some(MetaValue::Unit(raw.to_string())),
            MetaField::MixChoices => {
                if raw.eq_ignore_ascii_case("yes") { Some(MetaValue::MixChoices(true)) }
                else if raw.eq_ignore_ascii_case("no") { Some(MetaValue::MixChoices(false)) }
                else { None }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Answer(char),
    Mark(f64),
    Unit(String),
    MixChoices(bool),
}

impl MetaValue {
    fn apply(self, q: &mut QuestionDraft) {
        match self {
            MetaValue::Answer(c) => q.correct_label = Some(c),
            MetaValue::Mark(m) => q.mark = m,
            MetaValue::Unit(u) => q.unit = u,
            MetaValue::MixChoices(b) => q.mix_choices = b,
        }
    }
}

/// Result of testing a line against the metadata keys.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldMatch {
    Value(MetaValue),
    Pending(MetaField),
    /// Key present but its same-line value has the wrong shape.
    Invalid(MetaField, String),
    NoMatch,
}

pub fn match_meta_line(line: &str) -> FieldMatch {
    let Some(caps) = META_KEY_LINE.captures(line) else { return FieldMatch::NoMatch };
    let key = caps[1].split_whitespace().collect::<Vec<_>>().join(" ");
    let Some(field) = MetaField::from_key(&key) else { return FieldMatch::NoMatch };
    let value = caps.get(2).map_or("", |m| m.as_str().trim());
    if value.is_empty() {
        return FieldMatch::Pending(field);
    }
    match field.coerce(value) {
        Some(v) => FieldMatch::Value(v),
        None => FieldMatch::Invalid(field, value.to_string()),
    }
}

/// Observable state of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    NoCurrentQuestion,
    InQuestion { sequence_id: u32, pending: Option<MetaField> },
}

/// Builds questions from the body events, one event at a time.
#[derive(Debug, Default)]
pub struct QuestionMachine {
    current: Option<QuestionDraft>,
    pending: Option<MetaField>,
    finished: Vec<QuestionDraft>,
}

impl QuestionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MachineState {
        match &self.current {
            None => MachineState::NoCurrentQuestion,
            Some(q) => MachineState::InQuestion { sequence_id: q.sequence_id, pending: self.pending },
        }
    }

    /// Apply one event. Fails only on a `QN=` marker whose number is out of range.
    pub fn feed(&mut self, event: StreamEvent) -> Result<(), ParseError> {
        match event {
            StreamEvent::Text(line) => return self.feed_text(&line),
            StreamEvent::Image { filename, bytes } => {
                let Some(q) = self.current.as_mut() else {
                    tracing::debug!(%filename, "image outside any question dropped");
                    return Ok(());
                };
                if q.image_bytes.is_none() {
                    q.image_filename = Some(filename);
                    q.image_bytes = Some(bytes);
                } else {
                    tracing::debug!(sequence_id = q.sequence_id, %filename, "additional image ignored");
                }
            }
        }
        Ok(())
    }

    fn feed_text(&mut self, line: &str) -> Result<(), ParseError> {
        let line = line.trim();
        if line.is_empty() { return Ok(()); }

        if let Some((seq, rest)) = question_marker(line)? {
            self.open(seq);
            if !rest.is_empty() { self.feed_content(rest); }
            return Ok(());
        }
        if self.current.is_none() {
            tracing::debug!(line, "text outside any question dropped");
            return Ok(());
        }
        self.feed_content(line);
        Ok(())
    }

    fn open(&mut self, sequence_id: u32) {
        if let Some(done) = self.current.take() {
            self.finished.push(done);
        }
        self.current = Some(QuestionDraft::new(sequence_id));
        self.pending = None;
    }

    fn feed_content(&mut self, line: &str) {
        let Some(q) = self.current.as_mut() else { return };

        if let Some(field) = self.pending {
            if !META_KEY_LINE.is_match(line) {
                if let Some(v) = field.coerce(line) {
                    v.apply(q);
                    self.pending = None;
                    return;
                }
            }
        }

        let stripped;
        let line = if let Some(caps) = INLINE_IMAGE_MARKER.captures(line) {
            if q.image_filename.is_none() && q.image_bytes.is_none() {
                q.image_filename = Some(caps[1].trim().to_string());
            }
            stripped = normalize_text(&INLINE_IMAGE_MARKER.replace_all(line, " "));
            if stripped.is_empty() { return; }
            stripped.as_str()
        } else {
            line
        };

        if let Some(caps) = OPTION_LINE.captures(line) {
            let label = caps[1].chars().next().unwrap_or('A');
            q.choices.push(Choice::new(label, caps[2].trim()));
            return;
        }

        match match_meta_line(line) {
            FieldMatch::Value(v) => v.apply(q),
            FieldMatch::Pending(field) => self.pending = Some(field),
            FieldMatch::Invalid(field, value) => {
                tracing::warn!(sequence_id = q.sequence_id, ?field, %value, "metadata value not understood, ignored");
            }
            FieldMatch::NoMatch => q.push_stem_line(line),
        }
    }

    /// Close the open question, if any, and return all questions in document order.
    pub fn finish(mut self) -> Vec<QuestionDraft> {
        if let Some(done) = self.current.take() {
            self.finished.push(done);
        }
        self.finished
    }
}

/// Run the machine over the rest of the stream.
pub fn collect_questions<I: IntoIterator<Item = StreamEvent>>(events: I) -> Result<Vec<QuestionDraft>, ParseError> {
    let mut machine = QuestionMachine::new();
    for ev in events {
        machine.feed(ev)?;
    }
    Ok(machine.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> StreamEvent {
        StreamEvent::Text(s.to_string())
    }

    fn run(lines: &[&str]) -> Vec<QuestionDraft> {
        collect_questions(lines.iter().map(|s| text(s))).expect("well-formed stream")
    }

    #[test]
    fn deferred_answer_takes_next_line() {
        let qs = run(&["QN=1", "Stem", "A. one", "B. two", "ANSWER:", "C"]);
        assert_eq!(qs.len(), 1);
        assert_eq!(qs[0].correct_label, Some('C'));
        assert_eq!(qs[0].stem_text, "Stem");
    }

    #[test]
    fn inline_answer_consumes_nothing_else() {
        let qs = run(&["QN=1", "ANSWER: B", "C"]);
        assert_eq!(qs[0].correct_label, Some('B'));
        assert_eq!(qs[0].stem_text, "C");
    }

    #[test]
    fn failed_deferred_value_falls_through_and_stays_pending() {
        let mut m = QuestionMachine::new();
        for l in ["QN=4", "ANSWER:", "A. alpha", "B. beta", "b"] {
            m.feed(text(l)).expect("fed");
            if l == "B. beta" {
                assert_eq!(m.state(), MachineState::InQuestion { sequence_id: 4, pending: Some(MetaField::Answer) });
            }
        }
        let qs = m.finish();
        assert_eq!(qs[0].choices.len(), 2);
        assert_eq!(qs[0].correct_label, Some('B'));
    }

    #[test]
    fn metadata_fields_are_coerced() {
        let qs = run(&["QN=2", "MARK: 0,5", "UNIT:", "Chapter 3", "MIX CHOICES", "yes"]);
        assert_eq!(qs[0].mark, 0.5);
        assert_eq!(qs[0].unit, "Chapter 3");
        assert!(qs[0].mix_choices);
        assert!(qs[0].stem_text.is_empty());
    }

    #[test]
    fn pending_unit_does_not_swallow_a_key_line() {
        let qs = run(&["QN=2", "UNIT:", "MIX CHOICES: No", "Unit 5"]);
        assert!(!qs[0].mix_choices);
        assert_eq!(qs[0].unit, "Unit 5");
    }

    #[test]
    fn invalid_inline_value_is_not_stem() {
        let qs = run(&["QN=2", "MARK: lots"]);
        assert_eq!(qs[0].mark, 1.0);
        assert!(qs[0].stem_text.is_empty());
    }

    #[test]
    fn multi_line_stem_and_marker_remainder() {
        let qs = run(&["QN=3 First line", "second line", "A) x", "B) y"]);
        assert_eq!(qs[0].stem_text, "First line\nsecond line");
        assert_eq!(qs[0].choices, vec![Choice::new('A', "x"), Choice::new('B', "y")]);
    }

    #[test]
    fn content_before_first_marker_is_dropped() {
        let mut m = QuestionMachine::new();
        m.feed(text("stray")).expect("fed");
        m.feed(StreamEvent::Image { filename: "a.png".into(), bytes: vec![0] }).expect("fed");
        assert_eq!(m.state(), MachineState::NoCurrentQuestion);
        assert!(m.finish().is_empty());
    }

    #[test]
    fn first_image_wins() {
        let mut m = QuestionMachine::new();
        m.feed(text("QN=9")).expect("fed");
        m.feed(StreamEvent::Image { filename: "first.png".into(), bytes: vec![1] }).expect("fed");
        m.feed(StreamEvent::Image { filename: "second.png".into(), bytes: vec![2] }).expect("fed");
        let qs = m.finish();
        assert_eq!(qs[0].image_filename.as_deref(), Some("first.png"));
        assert_eq!(qs[0].image_bytes.as_deref(), Some(&[1u8][..]));
    }

    #[test]
    fn inline_file_marker_records_name_only() {
        let qs = run(&["QN=5", "Look at [file: graph.png] below", "[file: other.png]"]);
        assert_eq!(qs[0].image_filename.as_deref(), Some("graph.png"));
        assert!(qs[0].image_bytes.is_none());
        assert_eq!(qs[0].stem_text, "Look at below");
    }

    #[test]
    fn questions_keep_document_order_not_numeric_order() {
        let qs = run(&["QN=10", "A. a", "QN=2", "A. b", "QN=10", "A. c"]);
        let ids: Vec<u32> = qs.iter().map(|q| q.sequence_id).collect();
        assert_eq!(ids, vec![10, 2, 10]);
    }

    #[test]
    fn marker_resets_pending_field() {
        let mut m = QuestionMachine::new();
        m.feed(text("QN=1")).expect("fed");
        m.feed(text("ANSWER:")).expect("fed");
        m.feed(text("QN=2")).expect("fed");
        assert_eq!(m.state(), MachineState::InQuestion { sequence_id: 2, pending: None });
    }

    #[test]
    fn out_of_range_marker_fails_instead_of_merging() {
        let events = ["QN=1", "A. a", "B. b", "ANSWER: A", "QN=4294967296", "Big stem", "A. c", "B. d", "ANSWER: B"]
            .iter()
            .map(|s| text(s));
        assert!(matches!(collect_questions(events), Err(ParseError::MalformedDocument(_))));
    }
}
