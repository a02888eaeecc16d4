//! Application layer module
//!
//! Orchestrates one scrape run: collection through a page driver, then export.

pub mod scrape_use_case;

pub use scrape_use_case::{ScrapeOutcome, ScrapeUseCase};
