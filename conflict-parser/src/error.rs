use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The inferred day and month do not name a real date, either because the
    /// day does not exist in that month or because the document rolled over
    /// past December.
    #[error("no calendar date for day {day} of month {month} in {year}")]
    InvalidCalendarDate { year: i32, month: u32, day: u32 },

    #[error("failed to read document: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "docx")]
    #[error("document is not a valid ZIP container: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[cfg(feature = "docx")]
    #[error("malformed document XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("document has no `{0}` part")]
    MissingPart(&'static str),
}
