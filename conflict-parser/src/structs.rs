use std::collections::HashMap;

use chrono::NaiveDate;

#[cfg(feature = "serde")]
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};

const ISO_DATE: &str = "%Y-%m-%d";

/// Tables of text cells as extracted from a word-processing document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalendarDocument {
    pub tables: Vec<Table>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Table {
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Row {
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cell {
    pub text: String,
}

impl CalendarDocument {
    /// Builds a document from plain nested text, one inner slice per row.
    pub fn from_tables<T, R, C>(tables: T) -> Self
    where
        T: IntoIterator<Item = R>,
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let tables = tables
            .into_iter()
            .map(|rows| Table {
                rows: rows
                    .into_iter()
                    .map(|cells| Row {
                        cells: cells.into_iter().map(Cell::new).collect(),
                    })
                    .collect(),
            })
            .collect();

        Self { tables }
    }

    /// Every cell in document order: table by table, row by row, left to right.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.tables
            .iter()
            .flat_map(|table| table.rows.iter())
            .flat_map(|row| row.cells.iter())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl Cell {
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Entry {
    pub date: NaiveDate,
    pub description: String,
}

/// Dates already taken on a calendar, mapped to what is scheduled on them.
///
/// Entries keep the order in which the parser met their cells. Inserting a
/// date that is already present replaces its description in place.
#[derive(Debug, Clone, Default)]
pub struct ConflictIndex {
    entries: Vec<Entry>,
    positions: HashMap<NaiveDate, usize>,
}

impl ConflictIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, date: NaiveDate, description: String) {
        match self.positions.get(&date) {
            Some(&position) => self.entries[position].description = description,
            None => {
                self.positions.insert(date, self.entries.len());
                self.entries.push(Entry { date, description });
            }
        }
    }

    #[must_use]
    pub fn get(&self, date: NaiveDate) -> Option<&str> {
        self.positions
            .get(&date)
            .map(|&position| self.entries[position].description.as_str())
    }

    /// Looks up an ISO `YYYY-MM-DD` date. Anything that is not exactly that
    /// form, padding and surrounding whitespace included, has no conflict.
    #[must_use]
    pub fn lookup(&self, date: &str) -> Option<&str> {
        let parsed = NaiveDate::parse_from_str(date, ISO_DATE).ok()?;
        if parsed.format(ISO_DATE).to_string() != date {
            return None;
        }
        self.get(parsed)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.entries.iter().map(|entry| entry.date)
    }
}

impl PartialEq for ConflictIndex {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|entry| other.get(entry.date) == Some(entry.description.as_str()))
    }
}

impl Eq for ConflictIndex {}

impl FromIterator<(NaiveDate, String)> for ConflictIndex {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, String)>>(iter: I) -> Self {
        let mut index = Self::new();
        for (date, description) in iter {
            index.insert(date, description);
        }
        index
    }
}

#[cfg(feature = "serde")]
impl Serialize for ConflictIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.date.format(ISO_DATE).to_string(), &entry.description)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    #[test]
    fn duplicate_insert_replaces_in_place() {
        let mut index = ConflictIndex::new();
        index.insert(date(1, 5), "Assembly".into());
        index.insert(date(1, 9), "Swimming Carnival".into());
        index.insert(date(1, 5), "Assembly moved".into());

        assert_eq!(index.len(), 2);
        assert_eq!(index.get(date(1, 5)), Some("Assembly moved"));
        assert_eq!(index.dates().collect::<Vec<_>>(), vec![date(1, 5), date(1, 9)]);
    }

    #[test]
    fn lookup_absent_or_malformed_is_none() {
        let index: ConflictIndex = [(date(3, 14), "Pi Day Quiz".to_string())]
            .into_iter()
            .collect();

        assert_eq!(index.lookup("2024-03-14"), Some("Pi Day Quiz"));
        assert_eq!(index.lookup("2024-03-15"), None);
        assert_eq!(index.lookup("not a date"), None);
        assert_eq!(index.lookup(""), None);
    }

    #[test]
    fn lookup_requires_canonical_iso_dates() {
        let index: ConflictIndex = [(date(1, 5), "Assembly Concert".to_string())]
            .into_iter()
            .collect();

        assert_eq!(index.lookup("2024-01-05"), Some("Assembly Concert"));
        assert_eq!(index.lookup("2024-1-5"), None);
        assert_eq!(index.lookup("2024-01-5"), None);
        assert_eq!(index.lookup(" 2024-01-05 "), None);
        assert_eq!(index.lookup("2024-01-05\n"), None);
        assert_eq!(index.lookup("+2024-01-05"), None);
    }

    #[test]
    fn equality_ignores_order() {
        let a: ConflictIndex = [
            (date(1, 1), "a b".to_string()),
            (date(1, 2), "c d".to_string()),
        ]
        .into_iter()
        .collect();
        let b: ConflictIndex = [
            (date(1, 2), "c d".to_string()),
            (date(1, 1), "a b".to_string()),
        ]
        .into_iter()
        .collect();

        assert_eq!(a, b);
    }

    #[test]
    fn cells_follow_document_order() {
        let document = CalendarDocument::from_tables([
            vec![vec!["a", "b"], vec!["c"]],
            vec![vec!["d"]],
        ]);

        let texts: Vec<_> = document.cells().map(|cell| cell.text.as_str()).collect();
        assert_eq!(texts, ["a", "b", "c", "d"]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serializes_as_iso_keyed_map() {
        let index: ConflictIndex = [
            (date(2, 1), "Open Day tours".to_string()),
            (date(1, 5), "Assembly Concert".to_string()),
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_string(&index).unwrap();
        assert_eq!(
            json,
            r#"{"2024-02-01":"Open Day tours","2024-01-05":"Assembly Concert"}"#
        );
    }
}
