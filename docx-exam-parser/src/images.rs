use std::io::Cursor;

use zip::ZipArchive;

use crate::blocks::Paragraph;
use crate::package::{read_part, Relationships};

/// An embedded image resolved to its package part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedImage {
    /// File name of the media part, e.g. `image3.png`.
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Resolves paragraph image references against the document relationships.
pub struct ImageExtractor<'p, 'a> {
    rels: &'p Relationships,
    archive: &'p mut ZipArchive<Cursor<&'a [u8]>>,
}

impl<'p, 'a> ImageExtractor<'p, 'a> {
    pub fn new(rels: &'p Relationships, archive: &'p mut ZipArchive<Cursor<&'a [u8]>>) -> Self {
        Self { rels, archive }
    }

    /// Every image of `paragraph` in run order. References whose relationship
    /// or media part is missing are skipped.
    pub fn extract(&mut self, paragraph: &Paragraph) -> Vec<ExtractedImage> {
        let mut out = Vec::with_capacity(paragraph.image_refs.len());
        for rid in &paragraph.image_refs {
            let Some(target) = self.rels.get(rid) else {
                tracing::debug!(rel_id = %rid, "image reference without relationship, skipped");
                continue;
            };
            let Some(bytes) = read_part(&mut *self.archive, target) else {
                tracing::debug!(rel_id = %rid, part = %target, "image part missing, skipped");
                continue;
            };
            let filename = target.rsplit('/').next().unwrap_or(target).to_string();
            out.push(ExtractedImage { filename, bytes });
        }
        out
    }
}
