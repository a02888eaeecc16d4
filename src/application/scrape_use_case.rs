//! Scrape run use case
//!
//! Owns the collector and the exporter. The driver session is always closed,
//! and a fatal driver failure still exports whatever was collected before
//! the error is returned.

use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::domain::dataset::RunContext;
use crate::domain::product::ProductRecord;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::csv_exporter::CsvExporter;
use crate::infrastructure::driver::PageDriver;
use crate::infrastructure::page_collector::{PageCollector, PageReport, StopReason};
use crate::infrastructure::scrape_error::ScrapeResult;

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub records: Vec<ProductRecord>,
    pub pages: Vec<PageReport>,
    pub stop_reason: StopReason,
    /// Path the CSV was actually written to
    pub output_path: PathBuf,
}

impl ScrapeOutcome {
    pub fn named_count(&self) -> usize {
        self.records.iter().filter(|r| !r.name.is_empty()).count()
    }

    pub fn sample(&self, n: usize) -> &[ProductRecord] {
        &self.records[..n.min(self.records.len())]
    }
}

pub struct ScrapeUseCase {
    collector: PageCollector,
    exporter: CsvExporter,
}

impl ScrapeUseCase {
    pub fn new(collector: PageCollector, exporter: CsvExporter) -> Self {
        Self { collector, exporter }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            PageCollector::from_config(config),
            CsvExporter::new(config.scraper.output_csv.clone()),
        )
    }

    /// Collect, close the driver, then export.
    pub async fn run<D: PageDriver>(&self, driver: &mut D) -> ScrapeResult<ScrapeOutcome> {
        let mut ctx = RunContext::new();
        info!("🚀 Starting best sellers scrape");

        let collected = self.collector.collect(driver, &mut ctx).await;

        if let Err(e) = driver.close().await {
            warn!("Failed to close driver session: {}", e);
        }

        let dataset = ctx.into_dataset();
        let summary = match collected {
            Ok(summary) => summary,
            Err(e) => {
                error!("Scrape aborted: {}", e);
                match self.exporter.export(dataset.records()) {
                    Ok(path) => warn!("Partial results ({} records) exported to {:?}", dataset.len(), path),
                    Err(export_error) => error!("Partial export failed: {}", export_error),
                }
                return Err(e);
            }
        };

        let output_path = self.exporter.export(dataset.records())?;
        info!(
            "✅ Scrape finished: {} records ({} named) from {} pages, stop reason {:?}",
            dataset.len(),
            dataset.named_count(),
            summary.pages_visited(),
            summary.stop_reason
        );

        Ok(ScrapeOutcome {
            records: dataset.records().to_vec(),
            pages: summary.pages,
            stop_reason: summary.stop_reason,
            output_path,
        })
    }
}
