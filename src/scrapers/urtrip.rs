//! Parser for the urtrip.jp past wait-time archive.
//!
//! Each archive page shows one day. The standby wait times are spread over
//! several `<table class="t_cool">` elements (one per area of the park);
//! later tables of the same class hold greeting and priority pass schedules
//! and are not read.
//!
//! # Page layout
//!
//! ```html
//! <table class="t_cool">
//!   <tr>
//!     <th class="t_time">時間</th>
//!     <th class="t_attr">ソアリン：<br>ファンタスティック・フライト</th>
//!     ...
//!   </tr>
//!   <tr><th class="time">09:00</th><td class="wait">45</td>...</tr>
//!   <tr><th class="time">09:15</th><td class="wait">案内終了</td>...</tr>
//! </table>
//! ```
//!
//! Header cells are the `th` elements whose class starts with `t_`; their
//! text, in document order, names the columns. Every other cell of a row
//! that carries a class is a value; classless cells are skipped. Some tables repeat the header row further down without the
//! `t_` classes; those rows start with `時間` and are dropped.

use crate::aggregate::{JoinError, natural_join};
use crate::config::Config;
use crate::models::{DayOutcome, EmptyReason, Frame};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, trace};

static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static HEADER_CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("th").unwrap());
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("th, td").unwrap());

/// Errors for pages whose tables exist but cannot be flattened.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("invalid table selector {selector:?}: {message}")]
    Selector { selector: String, message: String },
    #[error("invalid header class prefix: {0}")]
    HeaderPattern(#[from] regex::Error),
    #[error("table {table} has no {label:?} column")]
    MissingTimeColumn { table: usize, label: String },
    #[error("table {table}: row {first:?} has {found} cells, expected {expected}")]
    RowShape {
        table: usize,
        first: String,
        found: usize,
        expected: usize,
    },
    #[error("table {table} cannot be joined: {source}")]
    Join { table: usize, source: JoinError },
}

/// The markers used to find and read the wait-time tables of a page.
#[derive(Debug, Clone)]
pub struct TableLayout {
    table_selector: Selector,
    header_pattern: Regex,
    time_label: String,
    tables: usize,
}

impl TableLayout {
    pub fn from_config(config: &Config) -> Result<Self, ScrapeError> {
        let selector = format!("table.{}", config.table_class);
        let table_selector =
            Selector::parse(&selector).map_err(|e| ScrapeError::Selector {
                selector: selector.clone(),
                message: e.to_string(),
            })?;
        let header_pattern = Regex::new(&format!("^{}", regex::escape(&config.header_class_prefix)))?;

        Ok(Self {
            table_selector,
            header_pattern,
            time_label: config.time_column.clone(),
            tables: config.tables,
        })
    }

    /// Whether a cell is a column header.
    fn is_header(&self, cell: &ElementRef<'_>) -> bool {
        cell.value().classes().any(|c| self.header_pattern.is_match(c))
    }

    /// Whether a cell holds a value: it has a class and none of its classes
    /// marks a header. Classless cells are spacers.
    fn is_value(&self, cell: &ElementRef<'_>) -> bool {
        let mut classes = cell.value().classes().peekable();
        classes.peek().is_some() && classes.all(|c| !self.header_pattern.is_match(c))
    }

    fn is_time_label(&self, text: &str) -> bool {
        text.replace('\n', "").trim() == self.time_label
    }
}

fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text().collect()
}

/// All wait-time tables of a document, in document order.
pub fn locate_tables<'a>(document: &'a Html, layout: &TableLayout) -> Vec<ElementRef<'a>> {
    document.select(&layout.table_selector).collect()
}

/// The Column Set of a table: the text of its header cells in document order.
///
/// An empty result means the table has no published schedule.
pub fn define_columns(table: &ElementRef<'_>, layout: &TableLayout) -> Vec<String> {
    table
        .select(&HEADER_CELL)
        .filter(|th| layout.is_header(th))
        .map(|th| cell_text(&th))
        .collect()
}

/// Flatten the data rows of a table into a [`Frame`] over `columns`.
///
/// The time column is rewritten to `YYYY-MM-DD HH:MM` using `date`.
pub fn extract_rows(
    table: &ElementRef<'_>,
    index: usize,
    columns: &[String],
    date: NaiveDate,
    layout: &TableLayout,
) -> Result<Frame, ScrapeError> {
    let time_pos = columns
        .iter()
        .position(|c| layout.is_time_label(c))
        .ok_or_else(|| ScrapeError::MissingTimeColumn {
            table: index,
            label: layout.time_label.clone(),
        })?;
    let day = date.format("%Y-%m-%d").to_string();

    let mut frame = Frame::with_columns(columns.to_vec());
    for tr in table.select(&ROW) {
        let mut values: Vec<String> = tr
            .select(&CELL)
            .filter(|cell| layout.is_value(cell))
            .map(|cell| cell_text(&cell))
            .collect();

        let Some(first) = values.first() else {
            continue;
        };
        if layout.is_time_label(first) {
            trace!(table = index, "Dropping repeated header row");
            continue;
        }
        if values.len() != columns.len() {
            return Err(ScrapeError::RowShape {
                table: index,
                first: first.clone(),
                found: values.len(),
                expected: columns.len(),
            });
        }

        values[time_pos] = format!("{} {}", day, values[time_pos].trim());
        frame.rows.push(values.into_iter().map(Some).collect());
    }

    Ok(frame)
}

/// Scrape every configured table of a day's page and join them into one frame.
#[instrument(level = "debug", skip(html, layout), fields(bytes = html.len()))]
pub fn scrape_day(html: &str, date: NaiveDate, layout: &TableLayout) -> DayOutcome {
    let document = Html::parse_document(html);
    let tables = locate_tables(&document, layout);

    let mut day: Option<Frame> = None;
    for index in 0..layout.tables {
        let Some(table) = tables.get(index) else {
            return DayOutcome::Empty(EmptyReason::MissingTable {
                index,
                found: tables.len(),
            });
        };

        let columns = define_columns(table, layout);
        if columns.is_empty() {
            return DayOutcome::Empty(EmptyReason::NoSchedule { table: index });
        }

        let frame = match extract_rows(table, index, &columns, date, layout) {
            Ok(frame) => frame,
            Err(e) => return DayOutcome::Empty(EmptyReason::Malformed(e)),
        };
        debug!(
            table = index,
            columns = columns.len(),
            rows = frame.len(),
            "Extracted table"
        );

        day = match day {
            None => Some(frame),
            Some(acc) => match natural_join(&acc, &frame) {
                Ok(joined) => Some(joined),
                Err(source) => {
                    return DayOutcome::Empty(EmptyReason::Malformed(ScrapeError::Join {
                        table: index,
                        source,
                    }));
                }
            },
        };
    }

    DayOutcome::Scraped(day.unwrap_or_default())
}
