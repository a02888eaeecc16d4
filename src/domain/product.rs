use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Listing placement of a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    Organic,
    Sponsored,
}

impl ItemType {
    pub fn from_sponsored(sponsored: bool) -> Self {
        if sponsored { Self::Sponsored } else { Self::Organic }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Organic => "Organic",
            Self::Sponsored => "Sponsored",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field bundle produced from one listing item before it enters the dataset.
///
/// Every field except `url` may be absent; validation happens on acceptance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedProduct {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub original_price: Option<f64>,
    pub rating: Option<f64>,
    pub reviews: Option<u64>,
    pub url: String,
    pub item_type: ItemType,
}

impl ExtractedProduct {
    pub fn has_name(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.is_empty())
    }
}

/// Accepted product row, timestamped when it entered the dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,
    pub price: Option<f64>,
    pub original_price: Option<f64>,
    pub rating: Option<f64>,
    pub reviews: Option<u64>,
    pub url: String,
    pub item_type: ItemType,
    pub timestamp: DateTime<Utc>,
}

impl ProductRecord {
    /// Build an accepted record, or `None` when `name` or `url` is empty.
    pub fn accept(product: ExtractedProduct, timestamp: DateTime<Utc>) -> Option<Self> {
        let name = product.name.filter(|n| !n.is_empty())?;
        if product.url.is_empty() {
            return None;
        }

        Some(Self {
            name,
            price: product.price,
            original_price: product.original_price,
            rating: product.rating,
            reviews: product.reviews,
            url: product.url,
            item_type: product.item_type,
            timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extracted(name: Option<&str>, url: &str) -> ExtractedProduct {
        ExtractedProduct {
            name: name.map(str::to_string),
            price: Some(19.99),
            original_price: None,
            rating: Some(4.5),
            reviews: Some(120),
            url: url.to_string(),
            item_type: ItemType::Organic,
        }
    }

    #[test]
    fn test_accept_requires_name_and_url() {
        let now = Utc::now();
        assert!(ProductRecord::accept(extracted(Some("Echo Dot"), "https://x/dp/1"), now).is_some());
        assert!(ProductRecord::accept(extracted(Some(""), "https://x/dp/1"), now).is_none());
        assert!(ProductRecord::accept(extracted(None, "https://x/dp/1"), now).is_none());
        assert!(ProductRecord::accept(extracted(Some("Echo Dot"), ""), now).is_none());
    }

    #[test]
    fn test_item_type_display() {
        assert_eq!(ItemType::from_sponsored(true).to_string(), "Sponsored");
        assert_eq!(ItemType::from_sponsored(false).to_string(), "Organic");
    }
}
