//! HTTP-backed page driver with rate limiting
//!
//! Fetches listing pages with `reqwest` and serves them through the static
//! document model. A user agent (and optional proxy) is picked once per
//! session, mirroring how a browser context keeps one identity.

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::{Quota, RateLimiter, clock::DefaultClock, state::{InMemoryState, direct::NotKeyed}};
use reqwest::{Client, header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT}};
use tracing::{debug, info};

use super::static_page::{StaticDocument, StaticItem};
use super::{DriverError, DriverResult, PageDriver, ScrollMetrics};
use crate::infrastructure::config::DriverConfig;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Listing fetcher exposing fetched pages through [`PageDriver`]
pub struct HttpPageDriver {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    user_agent: String,
    viewport_height: i64,
    document_height: i64,
    current: Option<StaticDocument>,
    closed: bool,
}

impl HttpPageDriver {
    /// Open a session using the given driver settings.
    pub fn new(config: &DriverConfig) -> DriverResult<Self> {
        let user_agent = pick(&config.user_agents)
            .cloned()
            .ok_or_else(|| DriverError::Launch { reason: "user agent pool is empty".to_string() })?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value(&user_agent)?);
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(ACCEPT_LANGUAGE, header_value(&accept_language(&config.locale))?);

        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .default_headers(headers)
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(10));

        if let Some(proxy) = pick(&config.proxy_pool) {
            let proxy = reqwest::Proxy::all(proxy.as_str())
                .map_err(|e| DriverError::Launch { reason: format!("invalid proxy '{proxy}': {e}") })?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| DriverError::Launch { reason: format!("failed to create HTTP client: {e}") })?;

        let per_second = NonZeroU32::new(config.max_requests_per_second)
            .ok_or_else(|| DriverError::Launch { reason: "rate limit must be greater than 0".to_string() })?;

        info!("HTTP driver opened (user agent: {})", user_agent);

        Ok(Self {
            client,
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
            user_agent,
            viewport_height: i64::from(config.viewport.height),
            document_height: config.document_height,
            current: None,
            closed: false,
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    fn ensure_open(&self) -> DriverResult<()> {
        if self.closed { Err(DriverError::Closed) } else { Ok(()) }
    }

    fn document_mut(&mut self) -> DriverResult<&mut StaticDocument> {
        self.ensure_open()?;
        self.current.as_mut().ok_or(DriverError::NoPage)
    }
}

fn pick<T>(pool: &[T]) -> Option<&T> {
    if pool.is_empty() {
        None
    } else {
        pool.get(fastrand::usize(..pool.len()))
    }
}

fn header_value(value: &str) -> DriverResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| DriverError::Launch { reason: format!("invalid header value '{value}': {e}") })
}

/// `en-US` becomes `en-US,en;q=0.9`.
fn accept_language(locale: &str) -> String {
    match locale.split_once('-') {
        Some((language, _)) => format!("{locale},{language};q=0.9"),
        None => locale.to_string(),
    }
}

#[async_trait]
impl PageDriver for HttpPageDriver {
    type Item = StaticItem;

    async fn navigate(&mut self, url: &str, timeout: Duration) -> DriverResult<()> {
        self.ensure_open()?;
        self.rate_limiter.until_ready().await;

        debug!("Fetching listing page: {}", url);
        let fetch = async {
            let response = self.client.get(url).send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = match tokio::time::timeout(timeout, fetch).await {
            Err(_) => return Err(DriverError::timeout("navigate", timeout)),
            Ok(Err(e)) => return Err(DriverError::navigation(url, e.to_string())),
            Ok(Ok(fetched)) => fetched,
        };

        if !status.is_success() {
            return Err(DriverError::navigation(url, format!("HTTP status {status}")));
        }

        debug!("Fetched {} ({} bytes)", url, body.len());
        self.current = Some(StaticDocument::new(url, body, self.viewport_height, self.document_height));
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
        // The whole body is read during navigation; nothing loads afterwards.
        self.ensure_open()
    }

    async fn close(&mut self) -> DriverResult<()> {
        if !self.closed {
            info!("HTTP driver closed");
        }
        self.closed = true;
        self.current = None;
        Ok(())
    }
}
