//! # Wait Times
//!
//! Scrapes the daily attraction wait-time archive of urtrip.jp for Tokyo
//! DisneySea or Tokyo Disneyland and writes one CSV file per month.
//!
//! ## Usage
//!
//! ```sh
//! wait_times --park sea --start 2022-01 --end 2022-12 -o ./data
//! ```
//!
//! ## Architecture
//!
//! The application is a sequential pipeline, run once per month:
//! 1. **Fetching**: Download the archive page of every day of the month
//! 2. **Scraping**: Flatten the page's standby tables into dated rows
//! 3. **Aggregation**: Join the tables of a day, append the days of the month
//! 4. **Normalization**: Parse timestamps, weekdays, wait times and the holiday flag
//! 5. **Output**: Write `<YYYYMM>_<Park>.csv`

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregate;
mod cli;
mod config;
mod holidays;
mod models;
mod normalize;
mod outputs;
mod pipeline;
mod scrapers;
mod utils;

use cli::Cli;
use config::Config;
use scrapers::HttpSource;
use scrapers::urtrip::TableLayout;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("wait_times starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let config = Config::resolve(&args)?;
    info!(
        park = ?config.park,
        start = %config.start,
        end = %config.end,
        output_dir = %config.output_dir.display(),
        "Configuration loaded"
    );

    // Early check: fail before the first request if the CSVs cannot be written
    if let Err(e) = ensure_writable_dir(&config.output_dir).await {
        error!(
            path = %config.output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    let layout = TableLayout::from_config(&config)?;
    let source = HttpSource::new(&config);

    let reports = match pipeline::run(&source, &layout, &config).await {
        Ok(reports) => reports,
        Err(e) => {
            error!(error = %e, "Run aborted");
            return Err(e.into());
        }
    };

    let written = reports.iter().filter(|r| r.output.is_some()).count();
    let rows: usize = reports.iter().map(|r| r.rows_written).sum();
    let empty_days: usize = reports.iter().map(|r| r.total_empty()).sum();
    let elapsed = start_time.elapsed();
    info!(
        months = reports.len(),
        files_written = written,
        rows,
        empty_days,
        ?elapsed,
        secs = elapsed.as_secs(),
        "Execution complete"
    );

    Ok(())
}
