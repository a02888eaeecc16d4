//! Configuration infrastructure
//!
//! Configuration is organized into sections:
//! 1. Scraper settings (listing URL, pages, retries, pacing, output)
//! 2. Scroll tuning for the convergence and bottom-detection loops
//! 3. Driver settings (session identity, viewport, rate limit)
//! 4. Listing selectors and logging
//!
//! Every section is `#[serde(default)]`, so a config file only needs the
//! keys it overrides. Environment variables prefixed with `BESTSELLERS_`
//! (sections separated by `__`) take precedence over the file.

#![allow(clippy::uninlined_format_args)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::info;

use crate::infrastructure::parsing::ListingSelectors;
use crate::infrastructure::retry_manager::DelayRange;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {source}")]
    FileLoad {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scraper: ScraperConfig,
    pub scroll: ScrollConfig,
    pub driver: DriverConfig,
    pub selectors: ListingSelectors,
    pub logging: LoggingConfig,
}

/// What to scrape and how hard to try
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Listing URL of the first page
    pub best_sellers_url: String,

    /// Base URL for resolving relative product links
    pub base_url: String,

    pub max_pages: u32,

    /// Navigation attempts per page
    pub max_retries: u32,

    /// Human-like pause bounds in seconds
    pub delay_range_seconds: DelayRange,

    pub navigation_timeout_seconds: u64,

    /// Output CSV path
    pub output_csv: PathBuf,

    /// Selector for one listing item
    pub item_selector: String,

    /// Items requested from a single page
    pub page_item_target: usize,

    /// Soft cap on named records for the whole run
    pub max_named_records: usize,
}

/// Scroll-convergence and bottom-detection tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    pub step_px: i64,
    pub settle_ms: u64,
    pub max_steps: u32,

    /// Unchanged scroll positions in a row before assuming the bottom
    pub stall_threshold: u32,

    pub bottom_tolerance_px: i64,

    /// Outer convergence iterations per page
    pub max_scroll_attempts: u32,

    pub idle_timeout_ms: u64,

    /// Upward nudge after a non-converged iteration
    pub nudge_px: i64,
    pub nudge_settle_ms: u64,
}

impl ScrollConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn nudge_settle(&self) -> Duration {
        Duration::from_millis(self.nudge_settle_ms)
    }

    /// No waits at all; used for offline replay and tests.
    pub fn immediate() -> Self {
        Self {
            settle_ms: 0,
            idle_timeout_ms: 0,
            nudge_settle_ms: 0,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Http,
    Snapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Page driver session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub kind: DriverKind,

    /// Directory holding `page-{n}.html` files for snapshot replay
    pub snapshot_dir: Option<PathBuf>,

    /// One is picked at random per session
    pub user_agents: Vec<String>,

    pub proxy_pool: Vec<String>,
    pub locale: String,
    pub viewport: Viewport,

    /// Virtual document height for drivers without layout
    pub document_height: i64,

    pub max_requests_per_second: u32,
    pub request_timeout_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    pub json_format: bool,
    pub console_output: bool,
    pub file_output: bool,

    /// Defaults to `logs/` next to the executable
    pub log_dir: Option<PathBuf>,

    pub file_name: String,

    /// Module-specific level filters (e.g. "reqwest": "info")
    pub module_filters: HashMap<String, String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            best_sellers_url: defaults::BEST_SELLERS_URL.to_string(),
            base_url: defaults::BASE_URL.to_string(),
            max_pages: defaults::MAX_PAGES,
            max_retries: defaults::MAX_RETRIES,
            delay_range_seconds: DelayRange::new(defaults::DELAY_MIN_SECONDS, defaults::DELAY_MAX_SECONDS),
            navigation_timeout_seconds: defaults::NAVIGATION_TIMEOUT_SECONDS,
            output_csv: PathBuf::from(defaults::OUTPUT_CSV),
            item_selector: defaults::ITEM_SELECTOR.to_string(),
            page_item_target: defaults::PAGE_ITEM_TARGET,
            max_named_records: defaults::MAX_NAMED_RECORDS,
        }
    }
}

impl ScraperConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_seconds)
    }
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            step_px: defaults::SCROLL_STEP_PX,
            settle_ms: defaults::SCROLL_SETTLE_MS,
            max_steps: defaults::SCROLL_MAX_STEPS,
            stall_threshold: defaults::SCROLL_STALL_THRESHOLD,
            bottom_tolerance_px: defaults::SCROLL_BOTTOM_TOLERANCE_PX,
            max_scroll_attempts: defaults::MAX_SCROLL_ATTEMPTS,
            idle_timeout_ms: defaults::IDLE_TIMEOUT_MS,
            nudge_px: defaults::NUDGE_PX,
            nudge_settle_ms: defaults::NUDGE_SETTLE_MS,
        }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            kind: DriverKind::Http,
            snapshot_dir: None,
            user_agents: defaults::USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            proxy_pool: Vec::new(),
            locale: defaults::LOCALE.to_string(),
            viewport: Viewport {
                width: defaults::VIEWPORT_WIDTH,
                height: defaults::VIEWPORT_HEIGHT,
            },
            document_height: defaults::DOCUMENT_HEIGHT,
            max_requests_per_second: defaults::MAX_REQUESTS_PER_SECOND,
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            log_dir: None,
            file_name: defaults::LOG_FILE_NAME.to_string(),
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("reqwest".to_string(), "info".to_string());
                filters.insert("hyper".to_string(), "warn".to_string());
                filters.insert("html5ever".to_string(), "warn".to_string());
                filters.insert("selectors".to_string(), "warn".to_string());
                filters.insert("tokio".to_string(), "info".to_string());
                filters
            },
        }
    }
}

impl AppConfig {
    /// Load from an optional file layered under `BESTSELLERS_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(defaults::ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let scraper = &self.scraper;

        for (name, value) in [("best_sellers_url", &scraper.best_sellers_url), ("base_url", &scraper.base_url)] {
            url::Url::parse(value)
                .map_err(|e| ConfigError::invalid(format!("{name} '{value}' is not a valid URL: {e}")))?;
        }
        if scraper.max_pages == 0 {
            return Err(ConfigError::invalid("max_pages must be greater than 0"));
        }
        if scraper.page_item_target == 0 || scraper.max_named_records == 0 {
            return Err(ConfigError::invalid("page_item_target and max_named_records must be greater than 0"));
        }
        if !scraper.delay_range_seconds.is_valid() {
            return Err(ConfigError::invalid(format!(
                "delay_range_seconds {:?} must be non-negative with min <= max",
                scraper.delay_range_seconds
            )));
        }
        if self.scroll.max_steps == 0 || self.scroll.stall_threshold == 0 || self.scroll.max_scroll_attempts == 0 {
            return Err(ConfigError::invalid("scroll max_steps, stall_threshold and max_scroll_attempts must be greater than 0"));
        }
        self.selectors.validate().map_err(ConfigError::invalid)?;

        match self.driver.kind {
            DriverKind::Http if self.driver.max_requests_per_second == 0 => {
                Err(ConfigError::invalid("max_requests_per_second must be greater than 0"))
            }
            DriverKind::Snapshot if self.driver.snapshot_dir.is_none() => {
                Err(ConfigError::invalid("snapshot driver requires snapshot_dir"))
            }
            _ => Ok(()),
        }
    }
}

/// Configuration manager for locating, loading and saving settings
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join(defaults::APP_DIR_NAME);

        Ok(config_dir)
    }

    /// Manager for the default config file location
    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_dir()?.join(defaults::CONFIG_FILE_NAME);
        Ok(Self { config_path })
    }

    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self { config_path: config_path.into() }
    }

    pub fn load(&self) -> Result<AppConfig> {
        let config = AppConfig::load(Some(self.config_path.as_path()))
            .with_context(|| format!("Failed to load configuration from {:?}", self.config_path))?;
        info!("Loaded configuration (file: {:?})", self.config_path);
        Ok(config)
    }

    /// Write a default configuration file if none exists yet, then load.
    pub async fn initialize_on_first_run(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!("First run detected - writing default configuration to {:?}", self.config_path);
            self.save_config(&AppConfig::default()).await?;
        }
        self.load()
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).await
                .context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(config)
            .context("Failed to serialize configuration")?;

        fs::write(&self.config_path, content).await
            .context("Failed to write configuration file")?;

        info!("Saved configuration to: {:?}", self.config_path);
        Ok(())
    }

    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }
}

/// Default configuration values
pub mod defaults {
    pub const APP_DIR_NAME: &str = "bestsellers-scraper";
    pub const CONFIG_FILE_NAME: &str = "bestsellers_config.json";
    pub const ENV_PREFIX: &str = "BESTSELLERS";

    pub const BEST_SELLERS_URL: &str = "https://www.amazon.com/Best-Sellers-Electronics/zgbs/electronics";
    pub const BASE_URL: &str = "https://www.amazon.com";
    pub const MAX_PAGES: u32 = 3;
    pub const MAX_RETRIES: u32 = 3;
    pub const DELAY_MIN_SECONDS: f64 = 1.0;
    pub const DELAY_MAX_SECONDS: f64 = 3.0;
    pub const NAVIGATION_TIMEOUT_SECONDS: u64 = 60;
    pub const OUTPUT_CSV: &str = "amazon_electronics_ranking.csv";

    /// Selector for one ranked listing item
    pub const ITEM_SELECTOR: &str = "#gridItemRoot";

    pub const PAGE_ITEM_TARGET: usize = 50;
    pub const MAX_NAMED_RECORDS: usize = 100;

    pub const SCROLL_STEP_PX: i64 = 1000;
    pub const SCROLL_SETTLE_MS: u64 = 1000;
    pub const SCROLL_MAX_STEPS: u32 = 120;
    pub const SCROLL_STALL_THRESHOLD: u32 = 3;
    pub const SCROLL_BOTTOM_TOLERANCE_PX: i64 = 5;
    pub const MAX_SCROLL_ATTEMPTS: u32 = 6;
    pub const IDLE_TIMEOUT_MS: u64 = 5000;
    pub const NUDGE_PX: i64 = 500;
    pub const NUDGE_SETTLE_MS: u64 = 2000;

    pub const LOCALE: &str = "en-US";
    pub const VIEWPORT_WIDTH: u32 = 1366;
    pub const VIEWPORT_HEIGHT: u32 = 768;
    pub const DOCUMENT_HEIGHT: i64 = 8000;
    pub const MAX_REQUESTS_PER_SECOND: u32 = 1;
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

    pub const USER_AGENTS: &[&str] = &[
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:122.0) Gecko/20100101 Firefox/122.0",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_6) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    ];

    pub const LOG_LEVEL: &str = "info";
    pub const LOG_JSON_FORMAT: bool = false;
    pub const LOG_CONSOLE_OUTPUT: bool = true;
    pub const LOG_FILE_OUTPUT: bool = false;
    pub const LOG_FILE_NAME: &str = "bestsellers-scraper.log";
}

/// URL building helper functions
pub mod utils {
    /// Listing URL for a 1-based page number.
    ///
    /// Page 1 is the listing itself; later pages use the ranked pagination path.
    pub fn best_sellers_page_url(listing_url: &str, page: u32) -> String {
        if page <= 1 {
            listing_url.to_string()
        } else {
            format!("{}/ref=zg_bs_pg_{}?ie=UTF8&pg={}", listing_url.trim_end_matches('/'), page, page)
        }
    }
}
