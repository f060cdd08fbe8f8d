use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use conflict_parser::{parse_calendar_with, ConflictIndex, InvalidDatePolicy, ParseOptions};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::{task, time};
use tracing::{info, warn};

use crate::source::{LoadError, Source};

pub const CALENDAR: &str = "calendar";
pub const LUNCHTIME: &str = "lunchtime";

/// One consistent generation of both calendars.
#[derive(Debug)]
pub struct Calendars {
    pub calendar: Arc<ConflictIndex>,
    pub lunchtime: Arc<ConflictIndex>,
    pub built_at: DateTime<Utc>,
}

/// What is already on either calendar for a proposed event date.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct Conflicts<'a> {
    pub date: NaiveDate,
    pub calendar: Option<&'a str>,
    pub lunchtime: Option<&'a str>,
}

impl Calendars {
    fn empty() -> Self {
        Self {
            calendar: Arc::default(),
            lunchtime: Arc::default(),
            built_at: Utc::now(),
        }
    }

    pub fn conflicts(&self, date: NaiveDate) -> Conflicts<'_> {
        Conflicts {
            date,
            calendar: self.calendar.get(date),
            lunchtime: self.lunchtime.get(date),
        }
    }

    pub fn by_name(&self, name: &str) -> Option<&Arc<ConflictIndex>> {
        match name {
            CALENDAR => Some(&self.calendar),
            LUNCHTIME => Some(&self.lunchtime),
            _ => None,
        }
    }
}

pub struct Loader {
    client: reqwest::Client,
    calendar: Source,
    lunchtime: Source,
    year: Option<i32>,
    on_invalid_date: InvalidDatePolicy,
}

impl Loader {
    pub fn new(
        calendar: Source,
        lunchtime: Source,
        year: Option<i32>,
        on_invalid_date: InvalidDatePolicy,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            calendar,
            lunchtime,
            year,
            on_invalid_date,
        })
    }

    fn options(&self) -> ParseOptions {
        let year = self.year.unwrap_or_else(|| Utc::now().year());
        ParseOptions::new(year).on_invalid_date(self.on_invalid_date)
    }

    pub async fn load(&self, source: &Source) -> Result<ConflictIndex, LoadError> {
        let document = source.load(&self.client).await?;
        if document.is_empty() {
            warn!(%source, "calendar document has no tables");
        }

        Ok(parse_calendar_with(&document, &self.options())?)
    }
}

/// Shared calendars. Readers take a snapshot; a refresh builds the next
/// generation completely before swapping it in.
pub struct AppState {
    loader: Loader,
    calendars: RwLock<Arc<Calendars>>,
    refreshing: Mutex<()>,
}

impl AppState {
    pub async fn new(loader: Loader) -> Arc<Self> {
        let state = Arc::new(Self {
            loader,
            calendars: RwLock::new(Arc::new(Calendars::empty())),
            refreshing: Mutex::new(()),
        });

        state.refresh().await;
        state
    }

    pub async fn snapshot(&self) -> Arc<Calendars> {
        Arc::clone(&*self.calendars.read().await)
    }

    /// Reloads both calendars. A calendar that cannot be loaded keeps its
    /// previous index.
    pub async fn refresh(&self) -> Arc<Calendars> {
        let _guard = self.refreshing.lock().await;
        let previous = self.snapshot().await;

        let (calendar, lunchtime) = tokio::join!(
            self.rebuild(CALENDAR, &self.loader.calendar, &previous.calendar),
            self.rebuild(LUNCHTIME, &self.loader.lunchtime, &previous.lunchtime),
        );

        let calendars = Arc::new(Calendars {
            calendar,
            lunchtime,
            built_at: Utc::now(),
        });

        *self.calendars.write().await = Arc::clone(&calendars);
        calendars
    }

    async fn rebuild(
        &self,
        name: &str,
        source: &Source,
        previous: &Arc<ConflictIndex>,
    ) -> Arc<ConflictIndex> {
        match self.loader.load(source).await {
            Ok(index) => {
                info!(calendar = name, %source, entries = index.len(), "calendar loaded");
                Arc::new(index)
            }
            Err(error) => {
                warn!(
                    calendar = name,
                    %source,
                    %error,
                    entries = previous.len(),
                    "failed to load calendar, keeping previous entries"
                );
                Arc::clone(previous)
            }
        }
    }
}

pub fn spawn_refresh(state: Arc<AppState>, interval: time::Duration) {
    task::spawn(async move {
        loop {
            time::sleep(interval).await;
            state.refresh().await;
        }
    });
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;

    fn write_calendar(path: &Path, cells: &[&str]) {
        let cells: String = cells.iter().map(|cell| format!("<td>{cell}</td>")).collect();
        fs::write(path, format!("<table><tr>{cells}</tr></table>")).unwrap();
    }

    fn loader(dir: &Path, on_invalid_date: InvalidDatePolicy) -> Loader {
        Loader::new(
            Source::path(dir.join("calendar.html")),
            Source::path(dir.join("lunchtime.html")),
            Some(2024),
            on_invalid_date,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn missing_documents_start_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(loader(dir.path(), InvalidDatePolicy::Skip)).await;

        let calendars = state.snapshot().await;
        assert!(calendars.calendar.is_empty());
        assert!(calendars.lunchtime.is_empty());
    }

    #[tokio::test]
    async fn lookups_against_both_calendars() {
        let dir = tempfile::tempdir().unwrap();
        write_calendar(
            &dir.path().join("calendar.html"),
            &["5 Assembly Concert", "20 Year 7 Camp"],
        );
        write_calendar(
            &dir.path().join("lunchtime.html"),
            &["5 Chess Club Finals", "6 Choir Rehearsal Hall"],
        );

        let state = AppState::new(loader(dir.path(), InvalidDatePolicy::Skip)).await;
        let calendars = state.snapshot().await;

        let date = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        assert_eq!(
            calendars.conflicts(date(5)),
            Conflicts {
                date: date(5),
                calendar: Some("Assembly Concert"),
                lunchtime: Some("Chess Club Finals"),
            }
        );
        assert_eq!(calendars.conflicts(date(6)).calendar, None);
        assert_eq!(calendars.conflicts(date(7)).lunchtime, None);
    }

    #[tokio::test]
    async fn refresh_swaps_and_keeps_old_snapshots_intact() {
        let dir = tempfile::tempdir().unwrap();
        let calendar = dir.path().join("calendar.html");
        write_calendar(&calendar, &["5 Assembly Concert"]);

        let state = AppState::new(loader(dir.path(), InvalidDatePolicy::Skip)).await;
        let before = state.snapshot().await;

        write_calendar(&calendar, &["5 Assembly Cancelled Today", "9 Book Week Parade"]);
        state.refresh().await;
        let after = state.snapshot().await;

        assert_eq!(before.calendar.lookup("2024-01-05"), Some("Assembly Concert"));
        assert_eq!(after.calendar.lookup("2024-01-05"), Some("Assembly Cancelled Today"));
        assert_eq!(after.calendar.len(), 2);
    }

    #[tokio::test]
    async fn failed_reload_keeps_previous_index() {
        let dir = tempfile::tempdir().unwrap();
        let calendar = dir.path().join("calendar.html");
        write_calendar(&calendar, &["5 Assembly Concert"]);

        let state = AppState::new(loader(dir.path(), InvalidDatePolicy::Abort)).await;

        write_calendar(
            &calendar,
            &["31 Staff Planning Day", "30 February Does Not Exist"],
        );
        state.refresh().await;
        assert_eq!(
            state.snapshot().await.calendar.lookup("2024-01-05"),
            Some("Assembly Concert")
        );

        fs::remove_file(&calendar).unwrap();
        state.refresh().await;
        assert_eq!(state.snapshot().await.calendar.len(), 1);
    }
}
