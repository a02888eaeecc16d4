//! Scrape error taxonomy
//!
//! Field parsing never fails (values degrade to absent). Item failures skip
//! the item, page failures skip the page, and only fatal driver failures end
//! the run.

use std::path::PathBuf;

use thiserror::Error;

use super::driver::DriverError;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Required element '{field}' not found on listing item")]
    ElementNotFound { field: String },

    #[error("Navigation to {url} failed after {attempts} attempt(s): {reason}")]
    Navigation {
        url: String,
        attempts: u32,
        reason: String,
    },

    #[error("Browsing context was destroyed")]
    ContextDestroyed,

    #[error("Failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Driver error: {0}")]
    Driver(DriverError),

    #[error("Fatal scrape failure: {reason}")]
    Fatal { reason: String },
}

impl ScrapeError {
    pub fn element_not_found(field: &str) -> Self {
        Self::ElementNotFound { field: field.to_string() }
    }

    /// Only fatal failures may end a run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }

    /// Item-level failures that only skip the current item
    pub fn is_item_recoverable(&self) -> bool {
        match self {
            Self::ElementNotFound { .. } => true,
            Self::Driver(e) => !e.is_terminal(),
            _ => false,
        }
    }
}

impl From<DriverError> for ScrapeError {
    fn from(error: DriverError) -> Self {
        match error {
            DriverError::ContextDestroyed => Self::ContextDestroyed,
            e if e.is_fatal() => Self::Fatal { reason: e.to_string() },
            e => Self::Driver(e),
        }
    }
}

pub type ScrapeResult<T> = Result<T, ScrapeError>;
