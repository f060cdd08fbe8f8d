use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::{CalendarDocument, ConflictIndex, Error};

const DECEMBER: u32 = 12;

/// What to do with a cell whose inferred date does not exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InvalidDatePolicy {
    /// Log and carry on. A day that does not exist in its month drops only
    /// that cell; rolling over past December ends the document.
    #[default]
    Skip,
    /// Fail the whole document with [`Error::InvalidCalendarDate`].
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub year: i32,
    pub on_invalid_date: InvalidDatePolicy,
}

impl ParseOptions {
    #[must_use]
    pub fn new(year: i32) -> Self {
        Self {
            year,
            on_invalid_date: InvalidDatePolicy::default(),
        }
    }

    #[must_use]
    pub fn on_invalid_date(mut self, policy: InvalidDatePolicy) -> Self {
        self.on_invalid_date = policy;
        self
    }
}

pub fn parse_calendar(document: &CalendarDocument, year: i32) -> Result<ConflictIndex, Error> {
    parse_calendar_with(document, &ParseOptions::new(year))
}

/// Builds the conflict index of a calendar laid out as day-numbered cells,
/// January of `options.year` onwards.
///
/// The document carries no month markers. Cells are read in document order
/// and a day number smaller than the previous accepted one starts the next
/// month.
pub fn parse_calendar_with(
    document: &CalendarDocument,
    options: &ParseOptions,
) -> Result<ConflictIndex, Error> {
    let year = options.year;
    let mut last_day = 0;
    let mut month = 1;
    let mut index = ConflictIndex::new();

    for cell in document.cells() {
        let Some((day, description)) = parse_cell(&cell.text) else {
            continue;
        };

        let cell_month = if day < last_day { month + 1 } else { month };

        if cell_month > DECEMBER {
            let error = Error::InvalidCalendarDate {
                year,
                month: cell_month,
                day,
            };
            if options.on_invalid_date == InvalidDatePolicy::Abort {
                return Err(error);
            }
            warn!(%error, entries = index.len(), "calendar runs past December, ignoring the rest");
            break;
        }

        let Some(date) = NaiveDate::from_ymd_opt(year, cell_month, day) else {
            let error = Error::InvalidCalendarDate {
                year,
                month: cell_month,
                day,
            };
            if options.on_invalid_date == InvalidDatePolicy::Abort {
                return Err(error);
            }
            warn!(%error, cell = %cell.text, "skipping calendar cell");
            continue;
        };

        if cell_month != month {
            debug!(from = month, to = cell_month, day, "month rollover");
        }

        month = cell_month;
        last_day = day;
        index.insert(date, description.to_owned());
    }

    Ok(index)
}

/// Splits a cell into its leading day number and the text after it.
///
/// Cells need a day number and at least two more words; a bare number or a
/// number with a one-word label is layout, not an event.
fn parse_cell(text: &str) -> Option<(u32, &str)> {
    let mut tokens = text.split_whitespace();
    let first = tokens.next()?;

    if !first.bytes().all(|byte| byte.is_ascii_digit()) || tokens.take(2).count() < 2 {
        return None;
    }

    let day = first.parse::<u32>().ok()?;

    // Offsets count characters of the raw text, not bytes or tokens.
    let skip = first.chars().count() + 1;
    let description = text
        .char_indices()
        .nth(skip)
        .map_or("", |(offset, _)| &text[offset..]);

    Some((day, description))
}
