//! Table text of Word (`.docx`) documents.
//!
//! A `.docx` file is a ZIP archive; the body lives in `word/document.xml`.
//! Only tables directly in the body are read. Tables nested in a cell are
//! skipped along with their text.

use std::io::{Cursor, Read};
use std::{iter, mem};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::{CalendarDocument, Cell, Error, Row, Table};

const DOCUMENT_PART: &str = "word/document.xml";

pub fn read_docx(bytes: &[u8]) -> Result<CalendarDocument, Error> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let xml = {
        let mut part = match archive.by_name(DOCUMENT_PART) {
            Ok(part) => part,
            Err(ZipError::FileNotFound) => return Err(Error::MissingPart(DOCUMENT_PART)),
            Err(err) => return Err(err.into()),
        };

        let mut xml = String::new();
        part.read_to_string(&mut xml)?;
        xml
    };

    read_document_xml(&xml)
}

fn read_document_xml(xml: &str) -> Result<CalendarDocument, Error> {
    let mut reader = Reader::from_str(xml);
    let mut walker = TableWalker::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => walker.start(&e),
            Event::Empty(e) => walker.empty(&e),
            Event::End(e) => walker.end(e.name().as_ref()),
            Event::Text(e) if walker.in_text => walker.text(&e.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(CalendarDocument {
        tables: walker.tables,
    })
}

fn get_attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .find(|a| a.as_ref().ok().map(|x| x.key.as_ref()) == Some(key))
        .and_then(Result::ok)
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

#[derive(Default)]
struct CellBuilder {
    paragraphs: Vec<String>,
    paragraph: Option<String>,
    span: usize,
    merged_above: bool,
}

impl CellBuilder {
    fn push(&mut self, text: &str) {
        if let Some(paragraph) = &mut self.paragraph {
            paragraph.push_str(text);
        }
    }

    fn text(self) -> String {
        self.paragraphs.join("\n")
    }
}

/// Collects body tables while streaming `document.xml`.
///
/// Rows come out the way word processors iterate them: a cell spanning
/// several grid columns is repeated once per column, and a vertically merged
/// continuation cell repeats the text of the cell above it. Content of text
/// boxes and compatibility fallbacks is not part of any cell.
#[derive(Default)]
struct TableWalker {
    tables: Vec<Table>,
    depth: usize,
    hidden: usize,
    table: Table,
    row: Row,
    above: Vec<String>,
    columns: Vec<String>,
    cell: Option<CellBuilder>,
    in_run: bool,
    in_text: bool,
}

fn is_hidden_content(name: &[u8]) -> bool {
    matches!(name, b"w:txbxContent" | b"mc:Fallback")
}

impl TableWalker {
    fn start(&mut self, e: &BytesStart) {
        let qname = e.name();
        let name = qname.as_ref();

        if is_hidden_content(name) {
            self.hidden += 1;
            return;
        }
        if self.hidden > 0 {
            return;
        }

        match name {
            b"w:tbl" => {
                self.depth += 1;
                if self.depth == 1 {
                    self.table = Table::default();
                    self.above.clear();
                }
            }
            _ if self.depth != 1 => {}
            b"w:tr" => {
                self.row = Row::default();
                self.columns.clear();
            }
            b"w:tc" => {
                self.cell = Some(CellBuilder {
                    span: 1,
                    ..CellBuilder::default()
                });
            }
            b"w:p" => {
                if let Some(cell) = &mut self.cell {
                    cell.paragraph = Some(String::new());
                }
            }
            b"w:r" => self.in_run = true,
            b"w:t" => self.in_text = self.in_run,
            _ => {}
        }
    }

    fn empty(&mut self, e: &BytesStart) {
        if self.depth != 1 || self.hidden > 0 {
            return;
        }
        let Some(cell) = &mut self.cell else {
            return;
        };

        match e.name().as_ref() {
            b"w:gridSpan" => {
                cell.span = get_attr(e, b"w:val")
                    .and_then(|span| span.parse().ok())
                    .unwrap_or(1)
                    .max(1);
            }
            // No value means "continue"; only "restart" opens a new merge.
            b"w:vMerge" => {
                cell.merged_above = get_attr(e, b"w:val").as_deref() != Some("restart");
            }
            b"w:p" => cell.paragraphs.push(String::new()),
            // Tab stops in paragraph properties share the name; only runs count.
            b"w:tab" if self.in_run => cell.push("\t"),
            b"w:br" | b"w:cr" if self.in_run => cell.push("\n"),
            _ => {}
        }
    }

    fn end(&mut self, name: &[u8]) {
        if is_hidden_content(name) {
            self.hidden = self.hidden.saturating_sub(1);
            return;
        }
        if self.hidden > 0 {
            return;
        }

        if name == b"w:tbl" {
            if self.depth == 1 {
                self.tables.push(mem::take(&mut self.table));
            }
            self.depth = self.depth.saturating_sub(1);
            return;
        }
        if self.depth != 1 {
            return;
        }

        match name {
            b"w:tr" => {
                self.table.rows.push(mem::take(&mut self.row));
                self.above = mem::take(&mut self.columns);
            }
            b"w:tc" => {
                if let Some(cell) = self.cell.take() {
                    self.finish_cell(cell);
                }
            }
            b"w:p" => {
                if let Some(cell) = &mut self.cell {
                    if let Some(paragraph) = cell.paragraph.take() {
                        cell.paragraphs.push(paragraph);
                    }
                }
            }
            b"w:r" => self.in_run = false,
            b"w:t" => self.in_text = false,
            _ => {}
        }
    }

    fn finish_cell(&mut self, cell: CellBuilder) {
        let span = cell.span;
        let text = match self.above.get(self.columns.len()) {
            Some(above) if cell.merged_above => above.clone(),
            _ => cell.text(),
        };

        self.columns.extend(iter::repeat(text.clone()).take(span));
        self.row.cells.extend(iter::repeat(Cell::new(text)).take(span));
    }

    fn text(&mut self, text: &str) {
        if self.depth != 1 || self.hidden > 0 {
            return;
        }
        if let Some(cell) = &mut self.cell {
            cell.push(text);
        }
    }
}
