use std::collections::HashMap;
use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use crate::blocks::BlockIter;
use crate::images::ImageExtractor;
use crate::ParseError;

const DOCUMENT_PART: &str = "word/document.xml";
const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";

pub(crate) fn local_name(q: &[u8]) -> &[u8] {
    match q.iter().position(|&b| b == b':') { Some(i) => &q[i + 1..], None => q }
}

pub(crate) fn attr_val(e: &BytesStart<'_>, key_local: &[u8]) -> Option<String> {
    for attr in e.attributes().with_checks(false).flatten() {
        if local_name(attr.key.as_ref()) == key_local {
            return Some(String::from_utf8_lossy(&attr.value).into_owned());
        }
    }
    None
}

pub(crate) fn attr_val_q(e: &BytesStart<'_>, qname: &[u8]) -> Option<String> {
    for attr in e.attributes().with_checks(false).flatten() {
        if attr.key.as_ref() == qname {
            return Some(String::from_utf8_lossy(&attr.value).into_owned());
        }
    }
    None
}

/// Internal relationships of the main document part (rId -> package path).
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    targets: HashMap<String, String>,
}

impl Relationships {
    /// Parse a `.rels` part. External targets (hyperlinks, linked images) are dropped.
    pub fn parse(xml: &str) -> Self {
        let mut targets = HashMap::new();
        let mut r = Reader::from_str(xml);
        r.trim_text(false);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match r.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) => {
                    if local_name(e.name().as_ref()) == b"Relationship" {
                        let external = attr_val(&e, b"TargetMode").map_or(false, |m| m.eq_ignore_ascii_case("external"));
                        if let (Some(id), Some(target), false) = (attr_val(&e, b"Id"), attr_val(&e, b"Target"), external) {
                            targets.insert(id, resolve_target(&target));
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(_) => break,
                _ => {}
            }
        }
        Self { targets }
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.targets.get(id).map(|s| s.as_str())
    }

    pub(crate) fn len(&self) -> usize {
        self.targets.len()
    }
}

/// Resolve a relationship target (relative to `word/`) to a package path.
pub(crate) fn resolve_target(target: &str) -> String {
    let joined = match target.strip_prefix('/') {
        Some(abs) => abs.to_string(),
        None => format!("word/{}", target),
    };
    let mut parts: Vec<&str> = Vec::new();
    for seg in joined.split('/') {
        match seg {
            "" | "." => {}
            ".." => { parts.pop(); }
            s => parts.push(s),
        }
    }
    parts.join("/")
}

/// An opened DOCX package: the main document XML, its relationships, and the
/// archive for on-demand media reads.
pub struct DocxPackage<'a> {
    document_xml: String,
    rels: Relationships,
    archive: ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> DocxPackage<'a> {
    pub fn open(raw: &'a [u8]) -> Result<Self, ParseError> {
        let mut archive = ZipArchive::new(Cursor::new(raw))
            .map_err(|e| ParseError::MalformedDocument(format!("not a valid .docx (zip) package: {e}")))?;
        let doc_bytes = read_part(&mut archive, DOCUMENT_PART)
            .ok_or_else(|| ParseError::MalformedDocument(format!("missing {DOCUMENT_PART}")))?;
        let document_xml = String::from_utf8(doc_bytes)
            .map_err(|e| ParseError::MalformedDocument(format!("{DOCUMENT_PART} is not UTF-8: {e}")))?;
        let rels = read_part(&mut archive, DOCUMENT_RELS_PART)
            .map(|bytes| Relationships::parse(&String::from_utf8_lossy(&bytes)))
            .unwrap_or_default();
        tracing::debug!(parts = archive.len(), relationships = rels.len(), "opened docx package");
        Ok(Self { document_xml, rels, archive })
    }

    /// Body blocks only, without image access.
    pub fn blocks(&self) -> BlockIter<'_> {
        BlockIter::new(&self.document_xml)
    }

    /// Body blocks together with an extractor that can read image parts while iterating.
    pub fn parts(&mut self) -> (BlockIter<'_>, ImageExtractor<'_, 'a>) {
        (BlockIter::new(&self.document_xml), ImageExtractor::new(&self.rels, &mut self.archive))
    }
}

pub(crate) fn read_part(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Option<Vec<u8>> {
    let mut file = archive.by_name(name).ok()?;
    let mut buf = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut buf).ok()?;
    Some(buf)
}
