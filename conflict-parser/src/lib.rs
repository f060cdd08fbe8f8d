mod error;
mod parser;
mod structs;

#[cfg(feature = "docx")]
mod docx;
#[cfg(feature = "html")]
mod html;
#[cfg(feature = "ics")]
mod ics;

pub use error::Error;
pub use parser::{parse_calendar, parse_calendar_with, InvalidDatePolicy, ParseOptions};
pub use structs::{CalendarDocument, Cell, ConflictIndex, Entry, Row, Table};

#[cfg(feature = "docx")]
pub use docx::read_docx;
#[cfg(feature = "html")]
pub use html::read_html;

#[cfg(all(feature = "docx", feature = "html"))]
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Reads a calendar from a Word document or a web-published copy of one,
/// telling them apart by the ZIP signature.
#[cfg(all(feature = "docx", feature = "html"))]
pub fn read_document(bytes: &[u8]) -> Result<CalendarDocument, Error> {
    if bytes.starts_with(ZIP_MAGIC) {
        read_docx(bytes)
    } else {
        Ok(read_html(&String::from_utf8_lossy(bytes)))
    }
}
