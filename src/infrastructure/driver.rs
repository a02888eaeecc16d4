//! Page driver capability
//!
//! The scraper never talks to a rendering engine directly. It drives a
//! [`PageDriver`] that can navigate, scroll, report scroll geometry and hand
//! out [`ItemHandle`]s for listing elements. Any backend (a real browser, an
//! HTTP fetcher, saved snapshots) plugs in by implementing these traits.

pub mod http_driver;
pub mod static_page;

pub use http_driver::HttpPageDriver;
pub use static_page::{StaticDocument, StaticItem, StaticPageDriver};

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by a page driver
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Browsing context was destroyed")]
    ContextDestroyed,

    #[error("Query '{selector}' failed: {reason}")]
    Query { selector: String, reason: String },

    #[error("No page is loaded")]
    NoPage,

    #[error("Driver session is closed")]
    Closed,

    #[error("Driver could not be launched: {reason}")]
    Launch { reason: String },

    #[error("Fatal driver failure: {reason}")]
    Fatal { reason: String },
}

impl DriverError {
    pub fn query(selector: &str, reason: impl Into<String>) -> Self {
        Self::Query {
            selector: selector.to_string(),
            reason: reason.into(),
        }
    }

    pub fn navigation(url: &str, reason: impl Into<String>) -> Self {
        Self::Navigation {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    pub fn timeout(operation: &str, timeout: Duration) -> Self {
        Self::Timeout {
            operation: operation.to_string(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// The driver cannot be used any more; the run must end.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Closed | Self::Launch { .. } | Self::Fatal { .. })
    }

    pub fn is_context_destroyed(&self) -> bool {
        matches!(self, Self::ContextDestroyed)
    }

    /// Errors that must stop the current loop instead of being skipped
    pub fn is_terminal(&self) -> bool {
        self.is_fatal() || self.is_context_destroyed()
    }
}

pub type DriverResult<T> = Result<T, DriverError>;

/// Scroll geometry of the loaded page, in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollMetrics {
    pub scroll_y: i64,
    pub viewport_height: i64,
    pub document_height: i64,
}

/// One rendered listing element supporting scoped sub-queries
#[async_trait]
pub trait ItemHandle: Send + Sync + Sized {
    /// First descendant matching `selector`
    async fn first(&self, selector: &str) -> DriverResult<Option<Self>>;

    async fn attribute(&self, name: &str) -> DriverResult<Option<String>>;

    /// Raw text of the element and its descendants
    async fn text_content(&self) -> DriverResult<Option<String>>;

    /// Visible text of the element
    async fn inner_text(&self) -> DriverResult<String>;

    /// Case-sensitive substring search over the element's visible text
    async fn contains_text(&self, needle: &str) -> DriverResult<bool>;

    /// Wait until the element is visible; `Ok(false)` when it never became visible.
    async fn wait_visible(&self, timeout: Duration) -> DriverResult<bool>;
}

/// Navigation, scrolling and item queries over one browsing context
#[async_trait]
pub trait PageDriver: Send {
    type Item: ItemHandle;

    /// Navigate and wait until the document content is loaded.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> DriverResult<()>;

    async fn query_items(&mut self, selector: &str) -> DriverResult<Vec<Self::Item>>;

    async fn scroll_by(&mut self, delta_y: i64) -> DriverResult<()>;

    async fn scroll_metrics(&mut self) -> DriverResult<ScrollMetrics>;

    /// Best-effort wait for network quiescence; callers tolerate failure.
    async fn wait_for_idle(&mut self, timeout: Duration) -> DriverResult<()>;

    async fn close(&mut self) -> DriverResult<()>;
}
