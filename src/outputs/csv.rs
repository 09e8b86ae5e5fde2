//! CSV output for normalized months.
//!
//! # Output Structure
//!
//! One file per month, named after the month and the park:
//! ```text
//! output_dir/
//! ├── 202212_DisneySea.csv
//! ├── 202301_DisneySea.csv
//! └── 202302_DisneySea.csv
//! ```
//!
//! Columns are the source header labels (newlines removed) followed by
//! `曜日_数値` and `休日`. Existing files are overwritten.

use crate::config::{Config, YearMonth};
use crate::models::NormalizedMonth;
use crate::normalize::{HOLIDAY_COLUMN, WEEKDAY_COLUMN};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("failed to encode CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// `<output_dir>/<YYYYMM>_<Park>.csv`
pub fn month_path(config: &Config, month: YearMonth) -> PathBuf {
    config
        .output_dir
        .join(format!("{}_{}.csv", month.compact(), config.park.file_name()))
}

/// Render a month as CSV bytes.
///
/// With `write_index`, every row starts with its 0-based position under an
/// unnamed header, the way dataframe exports usually look.
pub fn to_csv_bytes(month: &NormalizedMonth, write_index: bool) -> Result<Vec<u8>, WriteError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header: Vec<String> = Vec::new();
    if write_index {
        header.push(String::new());
    }
    header.extend(month.columns());
    header.push(WEEKDAY_COLUMN.to_string());
    header.push(HOLIDAY_COLUMN.to_string());
    writer.write_record(&header)?;

    for (i, row) in month.rows.iter().enumerate() {
        let mut record: Vec<String> = Vec::with_capacity(header.len());
        if write_index {
            record.push(i.to_string());
        }
        record.extend(row.values.iter().map(i64::to_string));
        let time_position = month.time_position.min(row.values.len());
        record.insert(
            usize::from(write_index) + time_position,
            row.time.format(TIMESTAMP_FORMAT).to_string(),
        );
        record.push(row.weekday.to_string());
        record.push(row.holiday.to_string());
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| WriteError::Csv(e.into_error().into()))
}

/// Write a month to `path`, creating parent directories as needed.
#[instrument(level = "info", skip_all, fields(path = %path.display(), rows = month.rows.len()))]
pub async fn write_month(
    month: &NormalizedMonth,
    path: &Path,
    write_index: bool,
) -> Result<(), WriteError> {
    let bytes = to_csv_bytes(month, write_index)?;

    if let Some(dir) = path.parent() {
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create output dir");
            return Err(WriteError::Io {
                path: dir.to_path_buf(),
                source: e,
            });
        }
    }

    fs::write(path, bytes).await.map_err(|source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Wrote month CSV");
    Ok(())
}
