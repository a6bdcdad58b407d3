use exam_model::{CountMismatch, HeaderMetadata, QuestionDraft};

use crate::ParseError;

pub const MIN_CHOICES: usize = 2;

/// Check the parsed questions against the header.
///
/// A count difference is returned as a diagnostic. A question with fewer than
/// two choices or without an answer fails the whole document.
pub fn validate(header: &HeaderMetadata, questions: &[QuestionDraft]) -> Result<Option<CountMismatch>, ParseError> {
    let actual = u32::try_from(questions.len()).unwrap_or(u32::MAX);
    let mismatch = (header.declared_question_count != actual)
        .then_some(CountMismatch { declared: header.declared_question_count, actual });

    for q in questions {
        if q.choices.len() < MIN_CHOICES {
            return Err(ParseError::InsufficientChoices(q.sequence_id));
        }
        let Some(label) = q.correct_label else {
            return Err(ParseError::MissingAnswer(q.sequence_id));
        };
        if q.choice(label).is_none() {
            tracing::warn!(sequence_id = q.sequence_id, %label, "answer names no listed choice");
        }
    }

    if let Some(m) = &mismatch {
        tracing::warn!(declared = m.declared, actual = m.actual, "question count mismatch");
    }
    Ok(mismatch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_model::Choice;

    fn header(count: u32) -> HeaderMetadata {
        HeaderMetadata {
            subject_code_or_name: "S".into(),
            declared_question_count: count,
            lecturer: "L".into(),
            issue_date: "D".into(),
            topic_code: "T".into(),
        }
    }

    fn question(seq: u32, n_choices: usize, answer: Option<char>) -> QuestionDraft {
        let mut q = QuestionDraft::new(seq);
        for (i, label) in ['A', 'B', 'C', 'D'].into_iter().take(n_choices).enumerate() {
            q.choices.push(Choice::new(label, format!("opt {i}")));
        }
        q.correct_label = answer;
        q
    }

    #[test]
    fn matching_count_has_no_diagnostic() {
        let qs = vec![question(1, 4, Some('A')), question(2, 2, Some('B'))];
        assert_eq!(validate(&header(2), &qs).expect("valid"), None);
    }

    #[test]
    fn count_mismatch_is_not_fatal() {
        let qs = vec![question(1, 4, Some('A'))];
        assert_eq!(validate(&header(3), &qs).expect("valid"), Some(CountMismatch { declared: 3, actual: 1 }));
    }

    #[test]
    fn single_choice_fails_with_sequence_id() {
        let qs = vec![question(1, 4, Some('A')), question(7, 1, Some('A'))];
        assert!(matches!(validate(&header(2), &qs), Err(ParseError::InsufficientChoices(7))));
    }

    #[test]
    fn missing_answer_fails_with_sequence_id() {
        let qs = vec![question(5, 3, None)];
        assert!(matches!(validate(&header(1), &qs), Err(ParseError::MissingAnswer(5))));
    }
}
