//! Command-line interface definitions for the wait-time scraper.
//!
//! Every flag is optional. Anything not given here falls back to the YAML
//! config file (if any) and then to the built-in defaults, see
//! [`crate::config::Config`].

use crate::config::{Park, YearMonth};
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the wait-time scraper.
///
/// # Examples
///
/// ```sh
/// # Scrape the default range for DisneySea into ./data
/// wait_times
///
/// # One year of Disneyland, written somewhere else
/// wait_times --park land --start 2022-01 --end 2022-12 -o /srv/wait_times
///
/// # Everything from a config file
/// wait_times -c scrape.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, env = "WAIT_TIMES_CONFIG")]
    pub config: Option<PathBuf>,

    /// Park whose archive is scraped
    #[arg(short, long, value_enum)]
    pub park: Option<Park>,

    /// First month to scrape (YYYY-MM)
    #[arg(long)]
    pub start: Option<YearMonth>,

    /// Last month to scrape, inclusive (YYYY-MM)
    #[arg(long)]
    pub end: Option<YearMonth>,

    /// Directory the monthly CSV files are written to
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Pause between page requests, in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Write a leading row-number column
    #[arg(long)]
    pub write_index: bool,
}
