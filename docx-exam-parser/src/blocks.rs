use quick_xml::events::Event;
use quick_xml::Reader;

use crate::package::{attr_val, attr_val_q, local_name};
use crate::ParseError;

/// Raw text of one `w:p` plus the relationship ids of its images, in run order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    pub text: String,
    pub image_refs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    pub paragraphs: Vec<Paragraph>,
}

impl Cell {
    /// Paragraph texts joined by newlines.
    pub fn text(&self) -> String {
        self.paragraphs.iter().map(|p| p.text.as_str()).collect::<Vec<_>>().join("\n")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
}

enum Top {
    Paragraph,
    EmptyParagraph,
    Table,
    Eof,
    Other,
}

enum InTable {
    NestedOpen,
    NestedClose,
    RowStart,
    CellStart,
    Paragraph,
    EmptyParagraph,
    Done,
    Other,
}

fn malformed(e: quick_xml::Error) -> ParseError {
    ParseError::MalformedDocument(format!("document.xml: {e}"))
}

/// Streams the top-level blocks of `word/document.xml` in visual order.
///
/// A block is any `w:p` or `w:tbl` not nested inside another block, so content
/// wrapped in structured-document tags still surfaces. Paragraphs of tables
/// nested inside a cell are folded into the enclosing top-level cell.
/// After the first XML error the iterator yields that error once and then ends.
pub struct BlockIter<'a> {
    reader: Reader<&'a [u8]>,
    buf: Vec<u8>,
    done: bool,
}

impl<'a> BlockIter<'a> {
    pub fn new(document_xml: &'a str) -> Self {
        let mut reader = Reader::from_str(document_xml);
        reader.trim_text(false);
        Self { reader, buf: Vec::new(), done: false }
    }

    fn read_paragraph(&mut self) -> Result<Paragraph, ParseError> {
        let mut para = Paragraph::default();
        // depth > 0 means we are inside a text box paragraph nested in this one
        let mut depth = 0usize;
        let mut in_t = false;
        // mc:Fallback repeats the mc:Choice content (same images); skip it
        let mut fallback = 0usize;
        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf).map_err(malformed)? {
                Event::Start(e) => match local_name(e.name().as_ref()) {
                    b"p" => depth += 1,
                    b"Fallback" => fallback += 1,
                    b"t" => in_t = depth == 0 && fallback == 0,
                    b"br" | b"cr" => { if depth == 0 && fallback == 0 { para.text.push('\n'); } }
                    b"tab" => { if depth == 0 && fallback == 0 { para.text.push('\t'); } }
                    b"blip" if fallback == 0 => { if let Some(id) = attr_val(&e, b"embed") { para.image_refs.push(id); } }
                    b"imagedata" if fallback == 0 => { if let Some(id) = attr_val_q(&e, b"r:id") { para.image_refs.push(id); } }
                    _ => {}
                },
                Event::Empty(e) => match local_name(e.name().as_ref()) {
                    b"br" | b"cr" => { if depth == 0 && fallback == 0 { para.text.push('\n'); } }
                    b"tab" => { if depth == 0 && fallback == 0 { para.text.push('\t'); } }
                    b"blip" if fallback == 0 => { if let Some(id) = attr_val(&e, b"embed") { para.image_refs.push(id); } }
                    b"imagedata" if fallback == 0 => { if let Some(id) = attr_val_q(&e, b"r:id") { para.image_refs.push(id); } }
                    _ => {}
                },
                Event::End(e) => match local_name(e.name().as_ref()) {
                    b"t" => in_t = false,
                    b"Fallback" => fallback = fallback.saturating_sub(1),
                    b"p" => {
                        if depth == 0 { return Ok(para); }
                        depth -= 1;
                    }
                    _ => {}
                },
                Event::Text(t) => {
                    if in_t {
                        let s = t.unescape().map_err(malformed)?;
                        para.text.push_str(&s);
                    }
                }
                Event::Eof => return Err(ParseError::MalformedDocument("document.xml ends inside a paragraph".into())),
                _ => {}
            }
        }
    }

    fn read_table(&mut self) -> Result<Table, ParseError> {
        let mut table = Table::default();
        let mut nested = 0usize;
        loop {
            self.buf.clear();
            let step = match self.reader.read_event_into(&mut self.buf).map_err(malformed)? {
                Event::Start(e) => match local_name(e.name().as_ref()) {
                    b"tbl" => InTable::NestedOpen,
                    b"tr" if nested == 0 => InTable::RowStart,
                    b"tc" if nested == 0 => InTable::CellStart,
                    b"p" => InTable::Paragraph,
                    _ => InTable::Other,
                },
                Event::Empty(e) => match local_name(e.name().as_ref()) {
                    b"p" => InTable::EmptyParagraph,
                    b"tr" if nested == 0 => InTable::RowStart,
                    b"tc" if nested == 0 => InTable::CellStart,
                    _ => InTable::Other,
                },
                Event::End(e) => match local_name(e.name().as_ref()) {
                    b"tbl" if nested == 0 => InTable::Done,
                    b"tbl" => InTable::NestedClose,
                    _ => InTable::Other,
                },
                Event::Eof => return Err(ParseError::MalformedDocument("document.xml ends inside a table".into())),
                _ => InTable::Other,
            };
            match step {
                InTable::NestedOpen => nested += 1,
                InTable::NestedClose => nested -= 1,
                InTable::RowStart => table.rows.push(Row::default()),
                InTable::CellStart => {
                    if let Some(row) = table.rows.last_mut() { row.cells.push(Cell::default()); }
                }
                InTable::Paragraph => {
                    let para = self.read_paragraph()?;
                    if let Some(cell) = table.rows.last_mut().and_then(|r| r.cells.last_mut()) {
                        cell.paragraphs.push(para);
                    }
                }
                InTable::EmptyParagraph => {
                    if let Some(cell) = table.rows.last_mut().and_then(|r| r.cells.last_mut()) {
                        cell.paragraphs.push(Paragraph::default());
                    }
                }
                InTable::Done => return Ok(table),
                InTable::Other => {}
            }
        }
    }
}

impl<'a> Iterator for BlockIter<'a> {
    type Item = Result<Block, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done { return None; }
        loop {
            self.buf.clear();
            let top = match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(e)) => match local_name(e.name().as_ref()) {
                    b"p" => Top::Paragraph,
                    b"tbl" => Top::Table,
                    _ => Top::Other,
                },
                Ok(Event::Empty(e)) => match local_name(e.name().as_ref()) {
                    b"p" => Top::EmptyParagraph,
                    _ => Top::Other,
                },
                Ok(Event::Eof) => Top::Eof,
                Ok(_) => Top::Other,
                Err(e) => {
                    self.done = true;
                    return Some(Err(malformed(e)));
                }
            };
            let block = match top {
                Top::Paragraph => self.read_paragraph().map(Block::Paragraph),
                Top::EmptyParagraph => Ok(Block::Paragraph(Paragraph::default())),
                Top::Table => self.read_table().map(Block::Table),
                Top::Eof => {
                    self.done = true;
                    return None;
                }
                Top::Other => continue,
            };
            if block.is_err() { self.done = true; }
            return Some(block);
        }
    }
}
