use serde::{Deserialize, Serialize};

/// A persisted subject as seen by the importer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRecord {
    pub id: i64,
    pub code: String,
    pub name: String,
}

/// Lookup of existing subjects by the header's `Subject` value.
pub trait SubjectDirectory {
    fn subjects(&self) -> &[SubjectRecord];

    /// Exact match on code or name, ignoring case and surrounding whitespace.
    fn resolve(&self, code_or_name: &str) -> Option<&SubjectRecord> {
        let key = code_or_name.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        self.subjects()
            .iter()
            .find(|s| s.code.trim().to_lowercase() == key || s.name.trim().to_lowercase() == key)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemorySubjects {
    records: Vec<SubjectRecord>,
}

impl InMemorySubjects {
    pub fn new(records: Vec<SubjectRecord>) -> Self {
        Self { records }
    }

    /// Add a subject with the next free id and return that id.
    pub fn insert(&mut self, code: impl Into<String>, name: impl Into<String>) -> i64 {
        let id = self.records.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        self.records.push(SubjectRecord { id, code: code.into(), name: name.into() });
        id
    }
}

impl SubjectDirectory for InMemorySubjects {
    fn subjects(&self) -> &[SubjectRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_code_or_name_case_insensitively() {
        let mut dir = InMemorySubjects::default();
        let math = dir.insert("MAT101", "Giải tích 1");
        dir.insert("PHY", "Vật lý");
        assert_eq!(dir.resolve("mat101").map(|s| s.id), Some(math));
        assert_eq!(dir.resolve(" GIẢI TÍCH 1 ").map(|s| s.id), Some(math));
        assert_eq!(dir.resolve("Vật lý").map(|s| s.code.as_str()), Some("PHY"));
    }

    #[test]
    fn partial_names_do_not_match() {
        let mut dir = InMemorySubjects::default();
        dir.insert("MAT101", "Calculus");
        assert!(dir.resolve("MAT").is_none());
        assert!(dir.resolve("").is_none());
    }
}
