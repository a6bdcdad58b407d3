#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const A_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const PIC_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
const WP_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const IMAGE_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

/// `<w:p>` with one text run.
pub fn p(text: &str) -> String {
    if text.is_empty() {
        return "<w:p/>".to_string();
    }
    format!(r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#, escape(text))
}

/// In-memory DOCX package builder.
#[derive(Default)]
pub struct DocxBuilder {
    body: String,
    rels: Vec<(String, String)>,
    media: Vec<(String, Vec<u8>)>,
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The five header lines of a template document.
    pub fn template_header(&mut self, subject: &str, count: u32) -> &mut Self {
        self.paragraph(&format!("Subject: {subject}"))
            .paragraph(&format!("Number of Quiz: {count}"))
            .paragraph("Lecturer: Tran Thi B")
            .paragraph("Date: 15/06/2024")
            .paragraph("Topic code: DE01")
    }

    pub fn paragraph(&mut self, text: &str) -> &mut Self {
        self.body.push_str(&p(text));
        self
    }

    /// Register an image part and return a drawing run referencing it.
    pub fn image_run(&mut self, filename: &str, bytes: &[u8]) -> String {
        let rid = format!("rId{}", 100 + self.rels.len());
        self.rels.push((rid.clone(), format!("media/{filename}")));
        self.media.push((format!("word/media/{filename}"), bytes.to_vec()));
        drawing_run(&rid)
    }

    /// Paragraph holding optional text followed by one image.
    pub fn image_p(&mut self, text: &str, filename: &str, bytes: &[u8]) -> String {
        let run = self.image_run(filename, bytes);
        let text_run = if text.is_empty() {
            String::new()
        } else {
            format!(r#"<w:r><w:t xml:space="preserve">{}</w:t></w:r>"#, escape(text))
        };
        format!("<w:p>{text_run}{run}</w:p>")
    }

    /// Paragraph whose image points at a relationship id that does not exist.
    pub fn broken_image_p(&self, text: &str) -> String {
        format!(
            r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r>{}</w:p>"#,
            escape(text),
            drawing_run("rIdMissing")
        )
    }

    pub fn raw(&mut self, xml: &str) -> &mut Self {
        self.body.push_str(xml);
        self
    }

    /// Table of text-only cells.
    pub fn text_table(&mut self, rows: &[&[&str]]) -> &mut Self {
        let rows: Vec<Vec<String>> = rows.iter().map(|r| r.iter().map(|c| p(c)).collect()).collect();
        self.table(rows)
    }

    /// Table whose cells are given as raw paragraph XML.
    pub fn table(&mut self, rows: Vec<Vec<String>>) -> &mut Self {
        self.body.push_str("<w:tbl><w:tblPr/>");
        for row in rows {
            self.body.push_str("<w:tr>");
            for cell in row {
                let inner = if cell.is_empty() { "<w:p/>".to_string() } else { cell };
                self.body.push_str(&format!("<w:tc><w:tcPr/>{inner}</w:tc>"));
            }
            self.body.push_str("</w:tr>");
        }
        self.body.push_str("</w:tbl>");
        self
    }

    pub fn document_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{W_NS}" xmlns:r="{R_NS}" xmlns:a="{A_NS}" xmlns:pic="{PIC_NS}" xmlns:wp="{WP_NS}"><w:body>{}<w:sectPr/></w:body></w:document>"#,
            self.body
        )
    }

    pub fn build(&self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let opts = FileOptions::default().compression_method(CompressionMethod::Stored);

        let mut put = |name: &str, data: &[u8]| {
            zip.start_file(name, opts).expect("start zip entry");
            zip.write_all(data).expect("write zip entry");
        };

        put("[Content_Types].xml", CONTENT_TYPES.as_bytes());
        put("_rels/.rels", PACKAGE_RELS.as_bytes());
        put("word/document.xml", self.document_xml().as_bytes());

        let mut rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for (id, target) in &self.rels {
            rels.push_str(&format!(r#"<Relationship Id="{id}" Type="{IMAGE_REL}" Target="{target}"/>"#));
        }
        rels.push_str("</Relationships>");
        put("word/_rels/document.xml.rels", rels.as_bytes());

        for (name, bytes) in &self.media {
            put(name, bytes);
        }

        zip.finish().expect("finish zip").into_inner()
    }
}

fn drawing_run(rid: &str) -> String {
    format!(
        concat!(
            r#"<w:r><w:drawing><wp:inline><wp:extent cx="952500" cy="952500"/><wp:docPr id="1" name="Picture 1"/>"#,
            r#"<a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
            r#"<pic:pic><pic:blipFill><a:blip r:embed="{}"/></pic:blipFill></pic:pic>"#,
            r#"</a:graphicData></a:graphic></wp:inline></w:drawing></w:r>"#
        ),
        rid
    )
}

/// A zip archive that is not a word document.
pub fn zip_without_document() -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = FileOptions::default().compression_method(CompressionMethod::Stored);
    zip.start_file("readme.txt", opts).expect("start zip entry");
    zip.write_all(b"hello").expect("write zip entry");
    zip.finish().expect("finish zip").into_inner()
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Default Extension="jpeg" ContentType="image/jpeg"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;
