//! Best Sellers ranking scraper
//!
//! Walks a paginated best-seller listing through a page driver, reveals
//! lazily loaded items by scrolling until the count converges, extracts one
//! record per item with ordered selector fallbacks and exports the
//! deduplicated dataset as CSV.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{ScrapeOutcome, ScrapeUseCase};
pub use domain::{Dataset, ExtractedProduct, ItemType, ProductRecord, RunContext};
