use std::convert::Infallible;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use conflict_parser::{read_document, CalendarDocument};
use thiserror::Error;
use tokio::fs;

/// Where a calendar document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Path(PathBuf),
    Url(String),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read calendar file: {0}")]
    Read(#[from] io::Error),

    #[error("failed to download calendar: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("unusable calendar document: {0}")]
    Document(#[from] conflict_parser::Error),
}

impl Source {
    pub fn path<P: Into<PathBuf>>(path: P) -> Self {
        Self::Path(path.into())
    }

    pub async fn fetch(&self, client: &reqwest::Client) -> Result<Vec<u8>, LoadError> {
        match self {
            Self::Path(path) => Ok(fs::read(path).await?),
            Self::Url(url) => {
                let response = client.get(url).send().await?.error_for_status()?;
                Ok(response.bytes().await?.to_vec())
            }
        }
    }

    pub async fn load(&self, client: &reqwest::Client) -> Result<CalendarDocument, LoadError> {
        let bytes = self.fetch(client).await?;
        Ok(read_document(&bytes)?)
    }
}

impl FromStr for Source {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with("http://") || s.starts_with("https://") {
            Ok(Self::Url(s.to_string()))
        } else {
            Ok(Self::path(s))
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_and_paths() {
        assert_eq!(
            "https://docs.example.org/calendar/pub?embedded=true".parse::<Source>(),
            Ok(Source::Url(
                "https://docs.example.org/calendar/pub?embedded=true".to_string()
            ))
        );
        assert_eq!("calendar.docx".parse::<Source>(), Ok(Source::path("calendar.docx")));
        assert_eq!(
            "./http-calendar.docx".parse::<Source>(),
            Ok(Source::path("./http-calendar.docx"))
        );
    }

    #[tokio::test]
    async fn loads_html_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calendar.html");
        std::fs::write(&path, "<table><tr><td>5 Assembly Concert</td></tr></table>").unwrap();

        let document = Source::path(&path)
            .load(&reqwest::Client::new())
            .await
            .unwrap();

        assert_eq!(document.cells().next().unwrap().text, "5 Assembly Concert");
    }

    #[tokio::test]
    async fn missing_file() {
        let result = Source::path("/nonexistent/calendar.docx")
            .load(&reqwest::Client::new())
            .await;

        assert!(matches!(result, Err(LoadError::Read(_))));
    }
}
