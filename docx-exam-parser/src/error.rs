use exam_model::HeaderField;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed document: {0}")]
    MalformedDocument(String),
    #[error("missing header field(s): {}", join_fields(.0))]
    MissingHeaderField(Vec<HeaderField>),
    #[error("question {0} has fewer than 2 choices")]
    InsufficientChoices(u32),
    #[error("question {0} has no answer")]
    MissingAnswer(u32),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_fields(fields: &[HeaderField]) -> String {
    fields.iter().map(|f| f.label()).collect::<Vec<_>>().join(", ")
}
