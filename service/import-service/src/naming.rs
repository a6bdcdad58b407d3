use std::collections::HashSet;

const KNOWN_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "webp"];

/// Extension (with leading dot) for a stored question image.
/// Known image suffixes keep their lowercase form; anything else becomes `.jpg`.
pub fn image_extension(filename: Option<&str>) -> String {
    let ext = filename
        .and_then(|f| f.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| KNOWN_EXTENSIONS.contains(&ext.as_str()));
    format!(".{}", ext.as_deref().unwrap_or("jpg"))
}

/// `q{subject_id}_{exam_code}_{sequence_id}{ext}`. The exam code is made
/// path-safe, so the name is always a single file name.
pub fn image_asset_name(subject_id: i64, exam_code: &str, sequence_id: u32, filename: Option<&str>) -> String {
    format!("q{subject_id}_{}_{sequence_id}{}", path_safe(exam_code), image_extension(filename))
}

/// Anything outside `[A-Za-z0-9_-]` becomes `_`.
fn path_safe(s: &str) -> String {
    s.chars().map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' }).collect()
}

fn compact_upper(s: &str) -> String {
    let upper: String = s.chars().filter(|c| !c.is_whitespace()).flat_map(char::to_uppercase).collect();
    path_safe(&upper)
}

/// Build an exam code from the subject code and the header's topic code.
///
/// The subject code is prepended as `SUBJ-TOPIC` unless the topic code
/// already starts with it. Characters unsafe in a file name become `_`.
/// When the result is in `taken`, `-2`, `-3`, ... are appended until it is free.
pub fn synthesize_exam_code(subject_code: &str, topic_code: &str, taken: &HashSet<String>) -> String {
    let subject = compact_upper(subject_code);
    let topic = compact_upper(topic_code);
    let base = if topic.is_empty() {
        subject
    } else if subject.is_empty() || topic.starts_with(&subject) {
        topic
    } else {
        format!("{subject}-{topic}")
    };

    if !taken.contains(&base) {
        return base;
    }
    let mut n = 2u32;
    loop {
        let candidate = format!("{base}-{n}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
