use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use bestsellers_scraper_lib::application::{ScrapeOutcome, ScrapeUseCase};
use bestsellers_scraper_lib::infrastructure::config::{AppConfig, ConfigManager, DriverKind, utils::best_sellers_page_url};
use bestsellers_scraper_lib::infrastructure::driver::{HttpPageDriver, StaticPageDriver};
use bestsellers_scraper_lib::infrastructure::logging::{init_logging_with_config, log_system_info};

const SAMPLE_SIZE: usize = 3;

/// Config from the path given as the first argument, else the default location.
async fn load_config() -> Result<AppConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let path = PathBuf::from(path);
            AppConfig::load(Some(path.as_path()))
                .with_context(|| format!("Failed to load configuration from {path:?}"))
        }
        None => ConfigManager::new()?.initialize_on_first_run().await,
    }
}

async fn run(config: &AppConfig) -> Result<ScrapeOutcome> {
    let use_case = ScrapeUseCase::from_config(config);

    let outcome = match config.driver.kind {
        DriverKind::Http => {
            let mut driver = HttpPageDriver::new(&config.driver)?;
            use_case.run(&mut driver).await?
        }
        DriverKind::Snapshot => {
            let dir = config
                .driver
                .snapshot_dir
                .as_deref()
                .context("snapshot driver requires snapshot_dir")?;
            let page_urls: Vec<(u32, String)> = (1..=config.scraper.max_pages)
                .map(|page| (page, best_sellers_page_url(&config.scraper.best_sellers_url, page)))
                .collect();
            let mut driver = StaticPageDriver::from_snapshot_dir(dir, &page_urls)
                .with_context(|| format!("Failed to read snapshots from {dir:?}"))?
                .with_viewport_height(i64::from(config.driver.viewport.height))
                .with_document_height(config.driver.document_height);
            use_case.run(&mut driver).await?
        }
    };

    Ok(outcome)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config().await?;
    init_logging_with_config(config.logging.clone())?;
    log_system_info();

    let outcome = run(&config).await?;
    info!("CSV written to {:?}", outcome.output_path);

    let sample = outcome.sample(SAMPLE_SIZE);
    if !sample.is_empty() {
        println!("Sample records (first {}):", sample.len());
        for (i, r) in sample.iter().enumerate() {
            println!(
                "{}. Name={} | Price={:?} | Rating={:?} | Reviews={:?} | URL={} | Type={} | Timestamp={}",
                i + 1,
                r.name,
                r.price,
                r.rating,
                r.reviews,
                r.url,
                r.item_type,
                r.timestamp.to_rfc3339()
            );
        }
    }

    Ok(())
}
