//! CSV export of the collected dataset
//!
//! Output is UTF-8 with a leading BOM so spreadsheet tools detect the
//! encoding. A permission-denied target (typically a file held open by a
//! spreadsheet) is retried once under a timestamped sibling name.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{info, warn};

use super::scrape_error::{ScrapeError, ScrapeResult};
use crate::domain::product::ProductRecord;

pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub const HEADERS: [&str; 7] = ["Name", "Price", "Rating", "Reviews", "URL", "Item_Type", "Timestamp"];

/// Decimal with at least one fractional digit: `29.0`, `1234.56`.
pub fn format_decimal(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

fn optional_cell<T>(value: Option<T>, format: impl Fn(T) -> String) -> String {
    value.map(format).unwrap_or_default()
}

/// `{stem}_{YYYYMMDD_HHMMSS}{ext}` next to `path`; `.csv` when there is no extension.
pub fn fallback_path(path: &Path, now: DateTime<Utc>) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".to_string());
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_else(|| ".csv".to_string());
    let file_name = format!("{stem}_{}{extension}", now.format("%Y%m%d_%H%M%S"));

    match path.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// Write the BOM, header and one row per record.
pub fn write_records<W: Write>(writer: W, records: &[ProductRecord]) -> io::Result<()> {
    let mut writer = writer;
    writer.write_all(UTF8_BOM)?;

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(HEADERS)?;
    for record in records {
        csv_writer.write_record([
            record.name.clone(),
            optional_cell(record.price, format_decimal),
            optional_cell(record.rating, format_decimal),
            optional_cell(record.reviews, |r| r.to_string()),
            record.url.clone(),
            record.item_type.to_string(),
            record.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        ])?;
    }
    csv_writer.flush()
}

#[derive(Debug, Clone)]
pub struct CsvExporter {
    path: PathBuf,
}

impl CsvExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Export `records` and return the path actually written.
    pub fn export(&self, records: &[ProductRecord]) -> ScrapeResult<PathBuf> {
        match Self::write_file(&self.path, records) {
            Ok(()) => {
                info!("💾 Exported {} records to {:?}", records.len(), self.path);
                Ok(self.path.clone())
            }
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                let fallback = fallback_path(&self.path, Utc::now());
                warn!("Permission denied writing {:?}, retrying as {:?}", self.path, fallback);
                Self::write_file(&fallback, records).map_err(|source| ScrapeError::Write {
                    path: fallback.clone(),
                    source,
                })?;
                info!("💾 Exported {} records to {:?}", records.len(), fallback);
                Ok(fallback)
            }
            Err(source) => Err(ScrapeError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write_file(path: &Path, records: &[ProductRecord]) -> io::Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        write_records(&mut writer, records)?;
        writer.flush()
    }
}
