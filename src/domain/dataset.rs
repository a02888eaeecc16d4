//! Run-scoped product dataset.
//!
//! The dataset is append-only: records are validated, stamped with their
//! acceptance time and never modified afterwards. Deduplication across pages
//! is owned by [`RunContext`], which is created once per run and passed
//! explicitly to the page collector.

use std::collections::HashSet;

use chrono::Utc;
use tracing::debug;

use super::product::{ExtractedProduct, ProductRecord};

/// Ordered, validated product rows for one run
#[derive(Debug, Default, Clone)]
pub struct Dataset {
    records: Vec<ProductRecord>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// A product is valid when both `name` and `url` are non-empty.
    pub fn validate(product: &ExtractedProduct) -> bool {
        product.has_name() && !product.url.is_empty()
    }

    /// Stamp and append a product. Returns `None` if validation fails.
    pub fn add(&mut self, product: ExtractedProduct) -> Option<&ProductRecord> {
        let record = ProductRecord::accept(product, Utc::now())?;
        self.records.push(record);
        self.records.last()
    }

    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records carrying a non-empty name
    pub fn named_count(&self) -> usize {
        self.records.iter().filter(|r| !r.name.is_empty()).count()
    }
}

/// Result of offering one extracted product to the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    Added,
    Invalid,
    Duplicate,
}

/// Mutable state of a single scrape run: the dataset and the seen-URL set.
#[derive(Debug, Default)]
pub struct RunContext {
    dataset: Dataset,
    seen_urls: HashSet<String>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validation gate first, then dedup on `url`, then timestamp + append.
    pub fn accept(&mut self, product: ExtractedProduct) -> Acceptance {
        if !Dataset::validate(&product) {
            return Acceptance::Invalid;
        }
        if self.seen_urls.contains(&product.url) {
            debug!("Duplicate product suppressed: {}", product.url);
            return Acceptance::Duplicate;
        }

        let url = product.url.clone();
        match self.dataset.add(product) {
            Some(_) => {
                self.seen_urls.insert(url);
                Acceptance::Added
            }
            None => Acceptance::Invalid,
        }
    }

    pub fn has_seen(&self, url: &str) -> bool {
        self.seen_urls.contains(url)
    }

    pub fn named_count(&self) -> usize {
        self.dataset.named_count()
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn into_dataset(self) -> Dataset {
        self.dataset
    }
}
