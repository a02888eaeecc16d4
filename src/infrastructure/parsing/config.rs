//! Selector configuration for listing extraction
//!
//! Every field owns an ordered list of strategies. Layouts drift, so the
//! lists run from the most specific markup down to generic fallbacks.

use serde::{Deserialize, Serialize};

/// Where a strategy reads its raw value from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum TextSource {
    /// Text content of the matched element
    Text,
    /// Named attribute of the matched element
    Attribute(String),
    /// Named attribute, falling back to the text content when missing or blank
    AttributeOrText(String),
}

/// One selector plus the source it reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldStrategy {
    pub selector: String,
    pub source: TextSource,
}

impl FieldStrategy {
    pub fn text(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            source: TextSource::Text,
        }
    }

    pub fn attribute(selector: &str, name: &str) -> Self {
        Self {
            selector: selector.to_string(),
            source: TextSource::Attribute(name.to_string()),
        }
    }

    pub fn attribute_or_text(selector: &str, name: &str) -> Self {
        Self {
            selector: selector.to_string(),
            source: TextSource::AttributeOrText(name.to_string()),
        }
    }
}

/// Selectors for the structured whole/fraction price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceSelectors {
    /// Accessible text nodes holding the full formatted price
    pub offscreen: Vec<FieldStrategy>,
    /// First container holding the whole and fraction parts
    pub container: String,
    pub whole: String,
    pub fraction: String,
}

impl Default for PriceSelectors {
    fn default() -> Self {
        Self {
            offscreen: vec![FieldStrategy::text("span.aok-offscreen")],
            container: "span.a-price".to_string(),
            whole: "span.a-price-whole".to_string(),
            fraction: "span.a-price-fraction".to_string(),
        }
    }
}

/// CSS strategies for one best-seller grid item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingSelectors {
    pub url: Vec<FieldStrategy>,
    pub name: Vec<FieldStrategy>,
    pub price: PriceSelectors,
    pub original_price: Vec<FieldStrategy>,
    pub rating: Vec<FieldStrategy>,
    pub reviews: Vec<FieldStrategy>,
    /// Case-sensitive visible-text marker for sponsored placements
    pub sponsored_text: String,
    /// Element marking a sponsored placement
    pub sponsored_marker: String,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            url: vec![
                FieldStrategy::attribute("a.a-link-normal.aok-block[href]", "href"),
                FieldStrategy::attribute(r#"a.a-link-normal[href*="/dp/"]"#, "href"),
                FieldStrategy::attribute(r#"a.a-link-normal[href*="/gp/"]"#, "href"),
                FieldStrategy::attribute(r#"a[href^="/dp/"]"#, "href"),
                FieldStrategy::attribute(r#"a[href^="/gp/"]"#, "href"),
            ],
            name: vec![
                FieldStrategy::text("div._cDEzb_p13n-sc-css-line-clamp-3_g3dy1"),
                FieldStrategy::text("a.a-link-normal[href] .p13n-sc-truncated"),
                FieldStrategy::text(r#"a.a-link-normal[href] span[aria-hidden="true"]"#),
                FieldStrategy::text(".a-size-medium.a-color-base.a-text-normal"),
                FieldStrategy::text(".a-link-normal .a-size-base-plus"),
            ],
            price: PriceSelectors::default(),
            original_price: vec![
                FieldStrategy::text("span.a-price.a-text-price span.a-offscreen"),
                FieldStrategy::text("span.a-text-price span.a-offscreen"),
            ],
            rating: vec![
                FieldStrategy::attribute_or_text(r#"a.a-link-normal[aria-label*="out of 5 stars"]"#, "aria-label"),
                FieldStrategy::attribute_or_text(r#"span[aria-label*="out of 5 stars"]"#, "aria-label"),
                FieldStrategy::text("i.a-icon-star-small span.a-icon-alt"),
                FieldStrategy::text("i.a-icon-star span.a-icon-alt"),
            ],
            reviews: vec![
                FieldStrategy::text(r##"a[href*="#customerReviews"]"##),
                FieldStrategy::text("a.a-link-normal .a-size-small"),
                FieldStrategy::attribute_or_text(r#"span[aria-label$="ratings"]"#, "aria-label"),
                FieldStrategy::text("span.a-size-base.s-underline-text"),
            ],
            sponsored_text: "Sponsored".to_string(),
            sponsored_marker: r#"[aria-label="Sponsored"]"#.to_string(),
        }
    }
}

impl ListingSelectors {
    /// Every selector string, for up-front validation
    pub fn all_selectors(&self) -> impl Iterator<Item = &str> {
        self.url
            .iter()
            .chain(&self.name)
            .chain(&self.price.offscreen)
            .chain(&self.original_price)
            .chain(&self.rating)
            .chain(&self.reviews)
            .map(|s| s.selector.as_str())
            .chain([
                self.price.container.as_str(),
                self.price.whole.as_str(),
                self.price.fraction.as_str(),
                self.sponsored_marker.as_str(),
            ])
    }

    /// Reject selectors that do not compile.
    pub fn validate(&self) -> Result<(), String> {
        if self.url.is_empty() {
            return Err("at least one URL strategy is required".to_string());
        }
        for selector in self.all_selectors() {
            scraper::Selector::parse(selector).map_err(|e| format!("invalid selector '{selector}': {e}"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_selectors_compile() {
        assert!(ListingSelectors::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_selector_is_reported() {
        let mut selectors = ListingSelectors::default();
        selectors.name.push(FieldStrategy::text("div[["));
        let err = selectors.validate().unwrap_err();
        assert!(err.contains("div[["));
    }

    #[test]
    fn test_empty_url_strategies_rejected() {
        let selectors = ListingSelectors {
            url: Vec::new(),
            ..ListingSelectors::default()
        };
        assert!(selectors.validate().is_err());
    }

    #[test]
    fn test_strategy_serde_shape() {
        let json = serde_json::to_value(FieldStrategy::attribute("a[href]", "href")).unwrap();
        assert_eq!(json["source"]["kind"], "attribute");
        assert_eq!(json["source"]["name"], "href");

        let back: FieldStrategy = serde_json::from_value(json).unwrap();
        assert_eq!(back.source, TextSource::Attribute("href".to_string()));
    }
}
