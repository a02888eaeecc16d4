//! Record extraction from one rendered listing item
//!
//! Each field walks its strategy list through [`first_success`]. Only the
//! product URL is mandatory; every other field degrades to absent.

use std::time::Duration;

use tracing::{debug, trace};
use url::Url;

use super::config::{FieldStrategy, ListingSelectors, TextSource};
use super::field_parser::{
    compose_price, normalize_text, parse_currency_fallback, parse_price, parse_rating, parse_review_count,
};
use crate::domain::product::{ExtractedProduct, ItemType};
use crate::infrastructure::driver::{DriverResult, ItemHandle};
use crate::infrastructure::scrape_error::{ScrapeError, ScrapeResult};

/// Upper bound for the best-effort visibility wait before extraction
pub const VISIBILITY_TIMEOUT: Duration = Duration::from_secs(2);

/// Read the raw value a strategy points at inside `item`.
async fn read_strategy<H: ItemHandle>(item: &H, strategy: &FieldStrategy) -> DriverResult<Option<String>> {
    let Some(element) = item.first(&strategy.selector).await? else {
        return Ok(None);
    };

    match &strategy.source {
        TextSource::Text => element.text_content().await,
        TextSource::Attribute(name) => element.attribute(name).await,
        TextSource::AttributeOrText(name) => match element.attribute(name).await? {
            Some(value) if !value.trim().is_empty() => Ok(Some(value)),
            _ => element.text_content().await,
        },
    }
}

/// Normalized text of the first strategy that yields a non-empty value.
///
/// The caller parses the winning text once; a later strategy is never
/// consulted because the first one failed to parse. Recoverable driver
/// errors skip the strategy, terminal ones propagate.
pub async fn first_success<H: ItemHandle>(item: &H, strategies: &[FieldStrategy]) -> DriverResult<Option<String>> {
    for strategy in strategies {
        let raw = match read_strategy(item, strategy).await {
            Ok(raw) => raw,
            Err(e) if e.is_terminal() => return Err(e),
            Err(e) => {
                debug!("Strategy '{}' failed: {}", strategy.selector, e);
                continue;
            }
        };

        let value = raw.as_deref().map(normalize_text).unwrap_or_default();
        if !value.is_empty() {
            trace!("Strategy '{}' matched", strategy.selector);
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// Swallow recoverable driver errors, keep terminal ones.
fn tolerate<T>(result: DriverResult<T>, fallback: T, operation: &str) -> DriverResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_terminal() => Err(e),
        Err(e) => {
            debug!("{} failed, continuing: {}", operation, e);
            Ok(fallback)
        }
    }
}

/// Turns a listing item into an [`ExtractedProduct`]
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    base_url: String,
    base: Option<Url>,
    selectors: ListingSelectors,
    visibility_timeout: Duration,
}

impl RecordExtractor {
    pub fn new(base_url: &str, selectors: ListingSelectors) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let base = Url::parse(&format!("{base_url}/")).ok();
        Self {
            base_url,
            base,
            selectors,
            visibility_timeout: VISIBILITY_TIMEOUT,
        }
    }

    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = timeout;
        self
    }

    /// Absolute hrefs pass through; anything else resolves against the base URL.
    pub fn resolve_url(&self, href: &str) -> String {
        if href.starts_with("http") {
            return href.to_string();
        }
        match self.base.as_ref().and_then(|base| base.join(href).ok()) {
            Some(url) => url.to_string(),
            None => format!("{}{}", self.base_url, href),
        }
    }

    /// Extract one record. Fails only when no product URL is found or the
    /// driver reports a terminal error.
    pub async fn extract<H: ItemHandle>(&self, item: &H) -> ScrapeResult<ExtractedProduct> {
        let visible = tolerate(item.wait_visible(self.visibility_timeout).await, false, "Visibility wait")?;
        if !visible {
            trace!("Item did not report visible, extracting anyway");
        }

        let href = first_success(item, &self.selectors.url)
            .await?
            .ok_or_else(|| ScrapeError::element_not_found("url"))?;
        let url = self.resolve_url(&href);

        let name = first_success(item, &self.selectors.name).await?;
        let price = self.extract_price(item).await?;
        let original_price = first_success(item, &self.selectors.original_price)
            .await?
            .and_then(|raw| parse_price(&raw));
        let rating = first_success(item, &self.selectors.rating)
            .await?
            .and_then(|raw| parse_rating(&raw));
        let reviews = first_success(item, &self.selectors.reviews)
            .await?
            .and_then(|raw| parse_review_count(&raw));
        let item_type = ItemType::from_sponsored(self.is_sponsored(item).await?);

        if name.is_some() && price.is_none() {
            debug!("No price found for named item {}", url);
        }

        Ok(ExtractedProduct {
            name,
            price,
            original_price,
            rating,
            reviews,
            url,
            item_type,
        })
    }

    /// Offscreen text, then whole/fraction parts, then a `$` scan of the visible text.
    async fn extract_price<H: ItemHandle>(&self, item: &H) -> DriverResult<Option<f64>> {
        let selectors = &self.selectors.price;

        let offscreen = first_success(item, &selectors.offscreen).await?;
        if let Some(price) = offscreen.as_deref().and_then(parse_price) {
            return Ok(Some(price));
        }

        let container = tolerate(item.first(&selectors.container).await, None, "Price container lookup")?;
        if let Some(container) = container {
            let whole = self.part_text(&container, &selectors.whole).await?;
            let fraction = self.part_text(&container, &selectors.fraction).await?;
            if let Some(price) = compose_price(whole.as_deref(), fraction.as_deref()) {
                return Ok(Some(price));
            }
        }

        let text = tolerate(item.inner_text().await, String::new(), "Visible text read")?;
        Ok(parse_currency_fallback(&text))
    }

    async fn part_text<H: ItemHandle>(&self, container: &H, selector: &str) -> DriverResult<Option<String>> {
        let part = tolerate(container.first(selector).await, None, "Price part lookup")?;
        match part {
            Some(part) => tolerate(part.text_content().await, None, "Price part read"),
            None => Ok(None),
        }
    }

    async fn is_sponsored<H: ItemHandle>(&self, item: &H) -> DriverResult<bool> {
        let selectors = &self.selectors;
        if tolerate(item.contains_text(&selectors.sponsored_text).await, false, "Sponsored text check")? {
            return Ok(true);
        }
        let marker = tolerate(item.first(&selectors.sponsored_marker).await, None, "Sponsored marker lookup")?;
        Ok(marker.is_some())
    }
}
