//! Turns parsed exam documents into import plans: resolves the subject,
//! assigns an exam code, names and stores question images, and applies the
//! legacy defaults. Persisting the plan is left to the caller.

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::Utc;
use docx_exam_parser::{Choice, HeaderMetadata, LegacyQuestion, ParseError, ParsedDocument};
use serde::Serialize;

pub mod images;
pub mod naming;
pub mod subjects;

pub use images::{DirectoryImageSink, DryRunImageSink, ImageSink, StoredImage};
pub use naming::{image_asset_name, image_extension, synthesize_exam_code};
pub use subjects::{InMemorySubjects, SubjectDirectory, SubjectRecord};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("document is {size} bytes, limit is {limit}")]
    DocumentTooLarge { size: usize, limit: usize },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("unknown subject: {0}")]
    UnknownSubject(String),
    #[error("io error: {0}")]
    Io(String),
}

pub const DEFAULT_IMAGE_DIR: &str = "media/question_images";
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 20 * 1024 * 1024;
/// Label assigned to legacy questions that never named an answer.
pub const LEGACY_DEFAULT_ANSWER: char = 'A';

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Directory receiving `q{subject}_{exam}_{seq}.{ext}` files.
    pub image_dir: PathBuf,
    /// Documents above this size are rejected before parsing.
    pub max_document_bytes: usize,
    /// When false, images are named and hashed but not written.
    pub write_images: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from(DEFAULT_IMAGE_DIR),
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            write_images: true,
        }
    }
}

impl ServiceConfig {
    /// Defaults overridden by `EXAM_IMAGE_DIR`, `EXAM_MAX_DOCUMENT_BYTES`
    /// and `EXAM_WRITE_IMAGES`. Unparseable values keep the default.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(dir) = std::env::var("EXAM_IMAGE_DIR") {
            if !dir.trim().is_empty() {
                cfg.image_dir = PathBuf::from(dir);
            }
        }
        if let Ok(v) = std::env::var("EXAM_MAX_DOCUMENT_BYTES") {
            match v.trim().parse() {
                Ok(n) => cfg.max_document_bytes = n,
                Err(_) => tracing::warn!(value = %v, "ignoring invalid EXAM_MAX_DOCUMENT_BYTES"),
            }
        }
        if let Ok(v) = std::env::var("EXAM_WRITE_IMAGES") {
            match parse_flag(&v) {
                Some(b) => cfg.write_images = b,
                None => tracing::warn!(value = %v, "ignoring invalid EXAM_WRITE_IMAGES"),
            }
        }
        cfg
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// One template question ready to persist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedQuestion {
    pub sequence_id: u32,
    pub text: String,
    pub choices: Vec<Choice>,
    pub correct_label: char,
    pub mark: f64,
    pub unit: String,
    pub mix_choices: bool,
    pub image: Option<StoredImage>,
    /// Name from an inline `[file:...]` marker with no embedded payload.
    pub image_reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateImportPlan {
    pub subject: SubjectRecord,
    pub exam_code: String,
    pub header: HeaderMetadata,
    pub questions: Vec<PlannedQuestion>,
    pub warnings: Vec<String>,
    pub imported_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegacyPlannedQuestion {
    pub text: String,
    pub choices: Vec<Choice>,
    pub answer: char,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegacyImportPlan {
    pub subject_id: i64,
    pub questions: Vec<LegacyPlannedQuestion>,
    pub skipped: usize,
    pub warnings: Vec<String>,
    pub imported_at: String,
}

pub struct ImportService<S: SubjectDirectory> {
    cfg: ServiceConfig,
    subjects: S,
}

impl<S: SubjectDirectory> ImportService<S> {
    pub fn new(cfg: ServiceConfig, subjects: S) -> Self {
        Self { cfg, subjects }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.cfg
    }

    pub fn subjects(&self) -> &S {
        &self.subjects
    }

    fn check_size(&self, raw: &[u8]) -> Result<(), ServiceError> {
        if raw.len() > self.cfg.max_document_bytes {
            return Err(ServiceError::DocumentTooLarge { size: raw.len(), limit: self.cfg.max_document_bytes });
        }
        Ok(())
    }

    /// Parse a template document and build its import plan, storing images
    /// through the configured sink. `taken` holds exam codes already in use.
    pub fn plan_template_import(&self, raw: &[u8], taken: &HashSet<String>) -> Result<TemplateImportPlan, ServiceError> {
        self.check_size(raw)?;
        let parsed = docx_exam_parser::parse(raw)?;
        if self.cfg.write_images {
            let mut sink = DirectoryImageSink::new(&self.cfg.image_dir);
            self.plan_parsed(parsed, taken, &mut sink)
        } else {
            self.plan_parsed(parsed, taken, &mut DryRunImageSink)
        }
    }

    /// Build a plan from an already parsed document.
    pub fn plan_parsed(
        &self,
        parsed: ParsedDocument,
        taken: &HashSet<String>,
        sink: &mut dyn ImageSink,
    ) -> Result<TemplateImportPlan, ServiceError> {
        let ParsedDocument { header, questions, count_mismatch } = parsed;
        let subject = self
            .subjects
            .resolve(&header.subject_code_or_name)
            .cloned()
            .ok_or_else(|| ServiceError::UnknownSubject(header.subject_code_or_name.clone()))?;
        let exam_code = synthesize_exam_code(&subject.code, &header.topic_code, taken);

        let mut warnings = Vec::new();
        if let Some(m) = count_mismatch {
            warnings.push(m.to_string());
        }

        // Resolve every label before any image is written.
        let mut planned = Vec::with_capacity(questions.len());
        let mut pending_images = Vec::new();
        for q in questions {
            let Some(correct_label) = q.correct_label else {
                return Err(ParseError::MissingAnswer(q.sequence_id).into());
            };
            if q.choice(correct_label).is_none() {
                warnings.push(format!("question {}: answer {correct_label} names no listed choice", q.sequence_id));
            }
            let image_reference = match q.image_bytes {
                Some(bytes) => {
                    let name = image_asset_name(subject.id, &exam_code, q.sequence_id, q.image_filename.as_deref());
                    pending_images.push((planned.len(), name, bytes));
                    None
                }
                None => q.image_filename,
            };
            planned.push(PlannedQuestion {
                sequence_id: q.sequence_id,
                text: q.stem_text,
                choices: q.choices,
                correct_label,
                mark: q.mark,
                unit: q.unit,
                mix_choices: q.mix_choices,
                image: None,
                image_reference,
            });
        }

        let mut stored: Vec<StoredImage> = Vec::with_capacity(pending_images.len());
        for (idx, name, bytes) in pending_images {
            match sink.store(&name, &bytes) {
                Ok(image) => {
                    stored.push(image.clone());
                    planned[idx].image = Some(image);
                }
                Err(e) => {
                    for image in &stored {
                        sink.discard(image);
                    }
                    return Err(e);
                }
            }
        }

        for w in &warnings {
            tracing::warn!(exam_code = %exam_code, "{w}");
        }
        tracing::info!(
            subject = %subject.code,
            exam_code = %exam_code,
            questions = planned.len(),
            "planned template import"
        );
        Ok(TemplateImportPlan {
            subject,
            exam_code,
            header,
            questions: planned,
            warnings,
            imported_at: Utc::now().to_rfc3339(),
        })
    }

    /// Parse a plain numbered-question document for an already chosen subject.
    pub fn plan_legacy_import(&self, raw: &[u8], subject_id: i64) -> Result<LegacyImportPlan, ServiceError> {
        self.check_size(raw)?;
        let questions = docx_exam_parser::parse_legacy(raw)?;
        Ok(plan_legacy(questions, subject_id))
    }
}

/// Apply the lenient legacy policy: skip questions without text or with
/// fewer than two options, default a missing answer to `A`.
pub fn plan_legacy(questions: Vec<LegacyQuestion>, subject_id: i64) -> LegacyImportPlan {
    let mut out = Vec::with_capacity(questions.len());
    let mut warnings = Vec::new();
    let mut skipped = 0;

    for (idx, q) in questions.into_iter().enumerate() {
        let n = idx + 1;
        if q.text.trim().is_empty() {
            warnings.push(format!("question {n}: empty text, skipped"));
            skipped += 1;
            continue;
        }
        if q.choices.len() < 2 {
            warnings.push(format!("question {n}: fewer than 2 options, skipped"));
            skipped += 1;
            continue;
        }
        let answer = match q.answer {
            Some(a) => a,
            None => {
                warnings.push(format!("question {n}: no answer, defaulting to {LEGACY_DEFAULT_ANSWER}"));
                LEGACY_DEFAULT_ANSWER
            }
        };
        out.push(LegacyPlannedQuestion { text: q.text, choices: q.choices, answer });
    }

    for w in &warnings {
        tracing::warn!(subject_id, "{w}");
    }
    tracing::info!(subject_id, questions = out.len(), skipped, "planned legacy import");
    LegacyImportPlan { subject_id, questions: out, skipped, warnings, imported_at: Utc::now().to_rfc3339() }
}
