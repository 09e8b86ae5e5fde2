//! Run configuration.
//!
//! Every knob of the scrape lives in [`Config`]: which park, which months,
//! where the CSV files go, and the markers used to find the tables on the
//! page. Values come from three layers, later ones winning:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. An optional YAML file (`--config` / `WAIT_TIMES_CONFIG`)
//! 3. Command-line flags
//!
//! # Example
//!
//! ```yaml
//! park: land
//! start: 2022-01
//! end: 2022-12
//! output_dir: ./data
//! request_delay_ms: 250
//! ```

use crate::cli::Cli;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Errors raised while assembling the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("start month {start} is after end month {end}")]
    EmptyRange { start: YearMonth, end: YearMonth },
    #[error("at least one table must be scraped")]
    NoTables,
}

/// Which park's archive to scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Park {
    /// Tokyo DisneySea
    Sea,
    /// Tokyo Disneyland
    Land,
}

impl Park {
    /// Path segment of the park's archive on the source site.
    pub fn path(&self) -> &'static str {
        match self {
            Park::Sea => "tds-past-info/",
            Park::Land => "tdl-past-info/",
        }
    }

    /// Name used in output file names.
    pub fn file_name(&self) -> &'static str {
        match self {
            Park::Sea => "DisneySea",
            Park::Land => "DisneyLand",
        }
    }
}

/// A calendar month, written `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .unwrap_or(NaiveDate::MIN)
    }

    /// The month after this one.
    pub fn succ(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Every day of the month in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let month = self.month;
        self.first_day()
            .iter_days()
            .take_while(move |d| d.month() == month)
    }

    /// `YYYYMM`, as used in output file names.
    pub fn compact(&self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }

    /// Every month from `start` to `end`, both inclusive.
    pub fn range(start: YearMonth, end: YearMonth) -> impl Iterator<Item = YearMonth> {
        std::iter::successors(Some(start), |m| Some(m.succ())).take_while(move |m| *m <= end)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once(['-', '/'])
            .ok_or_else(|| format!("expected YYYY-MM, got {s:?}"))?;
        let year: i32 = year
            .parse()
            .map_err(|_| format!("invalid year in {s:?}"))?;
        let month: u32 = month
            .parse()
            .map_err(|_| format!("invalid month in {s:?}"))?;
        YearMonth::new(year, month).ok_or_else(|| format!("month out of range in {s:?}"))
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Everything the pipeline needs to know.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub park: Park,
    /// Root of the source site.
    pub base_url: String,
    pub start: YearMonth,
    pub end: YearMonth,
    pub output_dir: PathBuf,
    /// Number of standby tables per page. Tables after these are greeting
    /// and priority pass schedules.
    pub tables: usize,
    /// Class of the wait-time `<table>` elements.
    pub table_class: String,
    /// Header cells carry a class starting with this prefix.
    pub header_class_prefix: String,
    /// Label of the time-of-day column, also used to detect repeated header rows.
    pub time_column: String,
    /// Pause after every page request.
    pub request_delay_ms: u64,
    /// Prefix every CSV row with a 0-based row number.
    pub write_index: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            park: Park::Sea,
            base_url: "https://urtrip.jp/".to_string(),
            start: YearMonth { year: 2020, month: 12 },
            end: YearMonth { year: 2024, month: 2 },
            output_dir: PathBuf::from("data"),
            tables: 5,
            table_class: "t_cool".to_string(),
            header_class_prefix: "t_".to_string(),
            time_column: "時間".to_string(),
            request_delay_ms: 100,
            write_index: false,
        }
    }
}

impl Config {
    /// Load a YAML config file. Missing keys fall back to the defaults.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded configuration file");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    /// Build the effective configuration from CLI arguments.
    pub fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        config.validate()?;
        debug!(?config, "Resolved configuration");
        Ok(config)
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(park) = cli.park {
            self.park = park;
        }
        if let Some(start) = cli.start {
            self.start = start;
        }
        if let Some(end) = cli.end {
            self.end = end;
        }
        if let Some(dir) = &cli.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(delay) = cli.delay_ms {
            self.request_delay_ms = delay;
        }
        if cli.write_index {
            self.write_index = true;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start > self.end {
            return Err(ConfigError::EmptyRange {
                start: self.start,
                end: self.end,
            });
        }
        if self.tables == 0 {
            return Err(ConfigError::NoTables);
        }
        Ok(())
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn months(&self) -> impl Iterator<Item = YearMonth> {
        YearMonth::range(self.start, self.end)
    }
}
