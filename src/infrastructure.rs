//! Infrastructure layer: page drivers, parsing, collection, export and configuration

pub mod config;
pub mod csv_exporter;
pub mod driver;
pub mod logging;
pub mod page_collector;
pub mod parsing;
pub mod retry_manager;
pub mod scrape_error;

// Re-export commonly used items
pub use config::{AppConfig, ConfigManager, DriverKind};
pub use csv_exporter::CsvExporter;
pub use driver::{DriverError, HttpPageDriver, ItemHandle, PageDriver, StaticPageDriver};
pub use logging::{get_log_directory, init_logging_with_config};
pub use page_collector::{CollectionSummary, PageCollector, PageReport, StopReason};
pub use parsing::{ListingSelectors, RecordExtractor};
pub use retry_manager::{DelayRange, HumanDelay, RetryPolicy};
pub use scrape_error::{ScrapeError, ScrapeResult};
