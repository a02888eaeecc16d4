//! Listing parsing: field normalization, selector strategies and record extraction

pub mod config;
pub mod field_parser;
pub mod record_extractor;

pub use config::{FieldStrategy, ListingSelectors, PriceSelectors, TextSource};
pub use record_extractor::{RecordExtractor, first_success};
