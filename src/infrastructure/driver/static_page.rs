//! Static-document driver backed by `scraper`
//!
//! Serves pre-rendered listing HTML (saved snapshots or fetched pages) through
//! the [`PageDriver`] capability. The document has a virtual viewport so the
//! scroll protocol behaves like a real page: scrolling is clamped to the
//! document height and reaching the bottom is observable.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{DriverError, DriverResult, ItemHandle, PageDriver, ScrollMetrics};

pub const DEFAULT_VIEWPORT_HEIGHT: i64 = 768;
pub const DEFAULT_DOCUMENT_HEIGHT: i64 = 8000;

fn compile_selector(selector: &str) -> DriverResult<Selector> {
    Selector::parse(selector).map_err(|e| DriverError::query(selector, e.to_string()))
}

/// Item handle holding the outer HTML of one element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticItem {
    html: String,
}

impl StaticItem {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    /// Run `f` against the element this handle refers to.
    ///
    /// The fragment is re-parsed per call so handles stay `Send`.
    fn with_element<T>(&self, f: impl FnOnce(ElementRef<'_>) -> T) -> DriverResult<T> {
        let fragment = Html::parse_fragment(&self.html);
        let element = fragment
            .root_element()
            .children()
            .find_map(ElementRef::wrap)
            .ok_or_else(|| DriverError::query(":scope", "item fragment holds no element"))?;
        Ok(f(element))
    }

    fn visible_text(&self) -> DriverResult<String> {
        self.with_element(|el| el.text().collect::<String>())
    }
}

#[async_trait]
impl ItemHandle for StaticItem {
    async fn first(&self, selector: &str) -> DriverResult<Option<Self>> {
        let compiled = compile_selector(selector)?;
        self.with_element(|el| {
            el.select(&compiled)
                .find(|m| m.id() != el.id())
                .map(|m| Self::new(m.html()))
        })
    }

    async fn attribute(&self, name: &str) -> DriverResult<Option<String>> {
        self.with_element(|el| el.value().attr(name).map(str::to_string))
    }

    async fn text_content(&self) -> DriverResult<Option<String>> {
        self.visible_text().map(Some)
    }

    async fn inner_text(&self) -> DriverResult<String> {
        self.visible_text()
    }

    async fn contains_text(&self, needle: &str) -> DriverResult<bool> {
        Ok(self.visible_text()?.contains(needle))
    }

    async fn wait_visible(&self, _timeout: Duration) -> DriverResult<bool> {
        Ok(true)
    }
}

/// A loaded page with a virtual viewport
#[derive(Debug, Clone)]
pub struct StaticDocument {
    url: String,
    html: String,
    scroll_y: i64,
    viewport_height: i64,
    document_height: i64,
}

impl StaticDocument {
    pub fn new(url: impl Into<String>, html: impl Into<String>, viewport_height: i64, document_height: i64) -> Self {
        let viewport_height = viewport_height.max(1);
        Self {
            url: url.into(),
            html: html.into(),
            scroll_y: 0,
            viewport_height,
            document_height: document_height.max(viewport_height),
        }
    }

    pub fn query_items(&self, selector: &str) -> DriverResult<Vec<StaticItem>> {
        let compiled = compile_selector(selector)?;
        let document = Html::parse_document(&self.html);
        let items: Vec<StaticItem> = document
            .select(&compiled)
            .map(|el| StaticItem::new(el.html()))
            .collect();
        debug!("{} items match '{}' on {}", items.len(), selector, self.url);
        Ok(items)
    }

    pub fn scroll_by(&mut self, delta_y: i64) {
        let max_scroll = self.document_height - self.viewport_height;
        self.scroll_y = (self.scroll_y + delta_y).clamp(0, max_scroll);
    }

    pub fn metrics(&self) -> ScrollMetrics {
        ScrollMetrics {
            scroll_y: self.scroll_y,
            viewport_height: self.viewport_height,
            document_height: self.document_height,
        }
    }
}

/// Driver replaying listing HTML keyed by URL
#[derive(Debug)]
pub struct StaticPageDriver {
    pages: HashMap<String, String>,
    current: Option<StaticDocument>,
    viewport_height: i64,
    document_height: i64,
    visits: Vec<String>,
    closed: bool,
}

impl Default for StaticPageDriver {
    fn default() -> Self {
        Self {
            pages: HashMap::new(),
            current: None,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            document_height: DEFAULT_DOCUMENT_HEIGHT,
            visits: Vec::new(),
            closed: false,
        }
    }
}

impl StaticPageDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_viewport_height(mut self, height: i64) -> Self {
        self.viewport_height = height;
        self
    }

    pub fn with_document_height(mut self, height: i64) -> Self {
        self.document_height = height;
        self
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.insert_page(url, html);
        self
    }

    pub fn insert_page(&mut self, url: impl Into<String>, html: impl Into<String>) {
        self.pages.insert(url.into(), html.into());
    }

    /// Load `page-{n}.html` files from `dir` for each `(page, url)` pair.
    ///
    /// Missing files are left out; navigating to their URL then fails like a
    /// page that never loaded.
    pub fn from_snapshot_dir(dir: &Path, page_urls: &[(u32, String)]) -> std::io::Result<Self> {
        let mut driver = Self::new();
        for (page, url) in page_urls {
            let path = dir.join(format!("page-{page}.html"));
            if !path.exists() {
                debug!("No snapshot for page {} at {:?}", page, path);
                continue;
            }
            let html = std::fs::read_to_string(&path)?;
            driver.insert_page(url.clone(), html);
        }
        Ok(driver)
    }

    /// URLs successfully navigated to, in order
    pub fn visits(&self) -> &[String] {
        &self.visits
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> DriverResult<()> {
        if self.closed { Err(DriverError::Closed) } else { Ok(()) }
    }

    fn document_mut(&mut self) -> DriverResult<&mut StaticDocument> {
        self.ensure_open()?;
        self.current.as_mut().ok_or(DriverError::NoPage)
    }
}

#[async_trait]
impl PageDriver for StaticPageDriver {
    type Item = StaticItem;

    async fn navigate(&mut self, url: &str, _timeout: Duration) -> DriverResult<()> {
        self.ensure_open()?;
        let html = self
            .pages
            .get(url)
            .ok_or_else(|| DriverError::navigation(url, "no snapshot recorded for this URL"))?;
        self.current = Some(StaticDocument::new(
            url,
            html.clone(),
            self.viewport_height,
            self.document_height,
        ));
        self.visits.push(url.to_string());
        Ok(())
    }

    async fn query_items(&mut self, selector: &str) -> DriverResult<Vec<StaticItem>> {
        self.document_mut()?.query_items(selector)
    }

    async fn scroll_by(&mut self, delta_y: i64) -> DriverResult<()> {
        self.document_mut()?.scroll_by(delta_y);
        Ok(())
    }

    async fn scroll_metrics(&mut self) -> DriverResult<ScrollMetrics> {
        Ok(self.document_mut()?.metrics())
    }

    async fn wait_for_idle(&mut self, _timeout: Duration) -> DriverResult<()> {
        self.ensure_open()
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.closed = true;
        self.current = None;
        Ok(())
    }
}
