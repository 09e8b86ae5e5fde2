//! Data models for scraped wait-time tables and their normalized form.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Frame`]: Raw string table produced by the scraper for one day
//! - [`MonthTable`]: All day frames of a calendar month, appended in scrape order
//! - [`DayOutcome`]: Per-day result that says why a day produced no rows
//! - [`NormalizedMonth`]: Typed month table ready to be written as CSV
//! - [`MonthReport`]: Summary of one month's run

use crate::normalize::NormalizeError;
use crate::scrapers::FetchError;
use crate::scrapers::urtrip::ScrapeError;
use chrono::{NaiveDate, NaiveDateTime};
use itertools::Itertools;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// A rectangular table of raw cell strings.
///
/// `None` marks an absent cell: the row comes from a day whose tables did
/// not have that column. `Some("")` is a cell that was present but empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// Column labels in document order.
    pub columns: Vec<String>,
    /// Rows aligned positionally to `columns`.
    pub rows: Vec<Vec<Option<String>>>,
}

impl Frame {
    /// Create an empty frame with the given columns.
    pub fn with_columns(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Position of a column by exact label.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// The month-long accumulator of day frames.
#[derive(Debug, Clone, Default)]
pub struct MonthTable {
    pub frame: Frame,
}

impl MonthTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a day's rows.
    ///
    /// Columns are the union of all appended frames in order of first
    /// appearance. Rows are never joined across days: a column missing from
    /// a day is `None` in that day's rows, and columns first seen on a later
    /// day are `None` in every earlier row.
    pub fn append(&mut self, day: Frame) {
        let columns: Vec<String> = self
            .frame
            .columns
            .iter()
            .chain(day.columns.iter())
            .unique()
            .cloned()
            .collect();

        if columns.len() > self.frame.columns.len() {
            let extra = columns.len() - self.frame.columns.len();
            for row in &mut self.frame.rows {
                row.extend(std::iter::repeat_n(None, extra));
            }
        }

        let positions: Vec<Option<usize>> = columns
            .iter()
            .map(|c| day.columns.iter().position(|d| d == c))
            .collect();

        for mut row in day.rows {
            let aligned = positions
                .iter()
                .map(|p| p.and_then(|i| row.get_mut(i).and_then(Option::take)))
                .collect();
            self.frame.rows.push(aligned);
        }

        self.frame.columns = columns;
    }

    pub fn into_frame(self) -> Frame {
        self.frame
    }
}

/// Why a day contributed no rows to its month.
#[derive(Debug)]
pub enum EmptyReason {
    /// The page could not be downloaded.
    Fetch(FetchError),
    /// The page had fewer wait-time tables than configured.
    MissingTable { index: usize, found: usize },
    /// A table had no header cells, which is how the site renders a day
    /// without a published schedule (park closed, future date).
    NoSchedule { table: usize },
    /// The page had the tables but their content did not line up.
    Malformed(ScrapeError),
}

impl EmptyReason {
    /// Short stable label used as a counter key and log field.
    pub fn kind(&self) -> &'static str {
        match self {
            EmptyReason::Fetch(_) => "fetch",
            EmptyReason::MissingTable { .. } => "missing_table",
            EmptyReason::NoSchedule { .. } => "no_schedule",
            EmptyReason::Malformed(_) => "malformed",
        }
    }
}

impl fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptyReason::Fetch(e) => write!(f, "fetch failed: {e}"),
            EmptyReason::MissingTable { index, found } => {
                write!(f, "table {index} not found ({found} tables on page)")
            }
            EmptyReason::NoSchedule { table } => write!(f, "table {table} has no header cells"),
            EmptyReason::Malformed(e) => write!(f, "malformed page: {e}"),
        }
    }
}

/// The result of scraping one day.
#[derive(Debug)]
pub enum DayOutcome {
    Scraped(Frame),
    Empty(EmptyReason),
}

impl DayOutcome {
    /// Rows this day contributes to the month.
    pub fn row_count(&self) -> usize {
        match self {
            DayOutcome::Scraped(frame) => frame.len(),
            DayOutcome::Empty(_) => 0,
        }
    }
}

/// One fully typed row of a month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    pub time: NaiveDateTime,
    /// Wait times in minutes, one per non-time column.
    pub values: Vec<i64>,
    /// Monday = 0 .. Sunday = 6.
    pub weekday: u32,
    /// 1 on weekends and public holidays.
    pub holiday: u8,
}

/// A month ready to be serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedMonth {
    /// Newline-free label of the time column.
    pub time_column: String,
    /// Position of the time column among all source columns.
    pub time_position: usize,
    /// Newline-free labels of the value columns, in source order.
    pub value_columns: Vec<String>,
    pub rows: Vec<NormalizedRow>,
}

impl NormalizedMonth {
    /// All source column labels with the time column back in its position.
    pub fn columns(&self) -> Vec<String> {
        let mut columns = self.value_columns.clone();
        columns.insert(self.time_position.min(columns.len()), self.time_column.clone());
        columns
    }
}

/// Summary of one month's scrape.
#[derive(Debug, Clone)]
pub struct MonthReport {
    pub year: i32,
    pub month: u32,
    pub days_scraped: usize,
    /// Empty days keyed by [`EmptyReason::kind`].
    pub days_empty: BTreeMap<&'static str, usize>,
    pub rows_written: usize,
    /// `None` when the whole month had no data and nothing was written.
    pub output: Option<PathBuf>,
}

impl MonthReport {
    pub fn new(year: i32, month: u32) -> Self {
        Self {
            year,
            month,
            days_scraped: 0,
            days_empty: BTreeMap::new(),
            rows_written: 0,
            output: None,
        }
    }

    pub(crate) fn record(&mut self, date: NaiveDate, outcome: &DayOutcome) {
        match outcome {
            DayOutcome::Scraped(_) => self.days_scraped += 1,
            DayOutcome::Empty(reason) => {
                tracing::debug!(%date, kind = reason.kind(), "Counting empty day");
                *self.days_empty.entry(reason.kind()).or_default() += 1;
            }
        }
    }

    pub fn total_empty(&self) -> usize {
        self.days_empty.values().sum()
    }
}

/// Error type shared by the month pipeline.
#[derive(Debug, thiserror::Error)]
pub enum MonthError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Write(#[from] crate::outputs::csv::WriteError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    #[test]
    fn test_month_append_same_columns() {
        let mut month = MonthTable::new();
        let mut day1 = Frame::with_columns(vec!["時間".into(), "A".into()]);
        day1.rows.push(cells(&["2023-01-01 09:00", "10"]));
        let mut day2 = Frame::with_columns(vec!["時間".into(), "A".into()]);
        day2.rows.push(cells(&["2023-01-02 09:00", "20"]));

        month.append(day1);
        month.append(day2);

        let frame = month.into_frame();
        assert_eq!(frame.columns, vec!["時間", "A"]);
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.rows[1][1].as_deref(), Some("20"));
    }

    #[test]
    fn test_month_append_differing_columns_marks_absent() {
        let mut month = MonthTable::new();
        let mut day1 = Frame::with_columns(vec!["時間".into(), "A".into()]);
        day1.rows.push(cells(&["2023-01-01 09:00", "10"]));
        let mut day2 = Frame::with_columns(vec!["時間".into(), "B".into()]);
        day2.rows.push(cells(&["2023-01-02 09:00", "5"]));

        month.append(day1);
        month.append(day2);

        let frame = month.into_frame();
        assert_eq!(frame.columns, vec!["時間", "A", "B"]);
        assert_eq!(
            frame.rows[0],
            vec![Some("2023-01-01 09:00".into()), Some("10".into()), None]
        );
        assert_eq!(
            frame.rows[1],
            vec![Some("2023-01-02 09:00".into()), None, Some("5".into())]
        );
    }

    #[test]
    fn test_month_append_empty_day_keeps_rows() {
        let mut month = MonthTable::new();
        let mut day1 = Frame::with_columns(vec!["時間".into(), "A".into()]);
        day1.rows.push(cells(&["2023-01-01 09:00", "10"]));
        month.append(day1);
        month.append(Frame::default());

        let frame = month.into_frame();
        assert_eq!(frame.columns, vec!["時間", "A"]);
        assert_eq!(frame.len(), 1);
    }

    #[test]
    fn test_normalized_columns_restores_time_position() {
        let month = NormalizedMonth {
            time_column: "時間".into(),
            time_position: 0,
            value_columns: vec!["A".into(), "B".into()],
            rows: vec![],
        };
        assert_eq!(month.columns(), vec!["時間", "A", "B"]);
    }

    #[test]
    fn test_empty_reason_kind() {
        assert_eq!(EmptyReason::NoSchedule { table: 0 }.kind(), "no_schedule");
        assert_eq!(
            EmptyReason::MissingTable { index: 3, found: 2 }.to_string(),
            "table 3 not found (2 tables on page)"
        );
    }

    #[test]
    fn test_report_counts_outcomes() {
        let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let mut report = MonthReport::new(2023, 1);
        report.record(date, &DayOutcome::Scraped(Frame::default()));
        report.record(date, &DayOutcome::Empty(EmptyReason::NoSchedule { table: 0 }));
        report.record(date, &DayOutcome::Empty(EmptyReason::NoSchedule { table: 2 }));
        assert_eq!(report.days_scraped, 1);
        assert_eq!(report.total_empty(), 2);
        assert_eq!(report.days_empty.get("no_schedule"), Some(&2));
    }
}
