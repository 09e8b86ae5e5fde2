//! The month pipeline: fetch every day, scrape, aggregate, normalize, write.
//!
//! Days are processed strictly one after another with a fixed pause after
//! every request, so the source site never sees more than one request at a
//! time. A day that fails is logged with its reason and contributes no rows;
//! a month that fails to normalize or write stops the run.

use crate::config::{Config, YearMonth};
use crate::models::{DayOutcome, EmptyReason, MonthError, MonthReport, MonthTable};
use crate::normalize::normalize;
use crate::outputs::csv::{month_path, write_month};
use crate::scrapers::PageSource;
use crate::scrapers::urtrip::{TableLayout, scrape_day};
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use std::time::Instant;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// Fetch and scrape a single day.
#[instrument(level = "debug", skip(source, layout))]
pub async fn scrape_one<S: PageSource>(source: &S, layout: &TableLayout, date: NaiveDate) -> DayOutcome {
    let outcome = match source.fetch_day(date).await {
        Ok(html) => scrape_day(&html, date, layout),
        Err(e) => DayOutcome::Empty(EmptyReason::Fetch(e)),
    };
    match &outcome {
        DayOutcome::Scraped(frame) => debug!(%date, rows = frame.len(), "Scraped day"),
        DayOutcome::Empty(reason) => {
            warn!(%date, kind = reason.kind(), reason = %reason, "Day produced no rows")
        }
    }
    outcome
}

/// Scrape every day of a month into a [`MonthTable`].
#[instrument(level = "info", skip_all, fields(%month))]
pub async fn scrape_month<S: PageSource>(
    source: &S,
    layout: &TableLayout,
    config: &Config,
    month: YearMonth,
) -> (MonthTable, MonthReport) {
    let days: Vec<NaiveDate> = month.days().collect();
    let total = days.len();
    let delay = config.request_delay();
    info!(days = total, "Start scraping");

    let outcomes: Vec<(NaiveDate, DayOutcome)> = stream::iter(days.into_iter().enumerate())
        .then(|(i, date)| async move {
            let outcome = scrape_one(source, layout, date).await;
            info!(day = i + 1, of = total, %date, rows = outcome.row_count(), "Progress");
            sleep(delay).await;
            (date, outcome)
        })
        .collect()
        .await;

    let mut table = MonthTable::new();
    let mut report = MonthReport::new(month.year, month.month);
    for (date, outcome) in outcomes {
        report.record(date, &outcome);
        if let DayOutcome::Scraped(frame) = outcome {
            table.append(frame);
        }
    }

    info!(
        scraped = report.days_scraped,
        empty = report.total_empty(),
        rows = table.frame.len(),
        "Finish scraping"
    );
    (table, report)
}

/// Run the whole pipeline for one month.
///
/// A month in which no day had any table is reported and skipped without
/// writing a file.
#[instrument(level = "info", skip_all, fields(%month))]
pub async fn run_month<S: PageSource>(
    source: &S,
    layout: &TableLayout,
    config: &Config,
    month: YearMonth,
) -> Result<MonthReport, MonthError> {
    let (table, mut report) = scrape_month(source, layout, config, month).await;
    let frame = table.into_frame();

    if frame.columns.is_empty() {
        warn!(empty_days = ?report.days_empty, "No data for the whole month; nothing written");
        return Ok(report);
    }
    if frame.is_empty() {
        warn!(columns = frame.columns.len(), "Tables had no data rows; writing header only");
    }

    let normalized = normalize(frame, &config.time_column)?;
    let path = month_path(config, month);
    write_month(&normalized, &path, config.write_index).await?;

    report.rows_written = normalized.rows.len();
    report.output = Some(path);
    Ok(report)
}

/// Run every configured month in order, stopping at the first fatal error.
#[instrument(level = "info", skip_all, fields(start = %config.start, end = %config.end))]
pub async fn run<S: PageSource>(
    source: &S,
    layout: &TableLayout,
    config: &Config,
) -> Result<Vec<MonthReport>, MonthError> {
    let mut reports = Vec::new();
    for month in config.months() {
        let t0 = Instant::now();
        let report = run_month(source, layout, config, month).await?;
        info!(
            year = report.year,
            month = report.month,
            rows = report.rows_written,
            output = ?report.output,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Month complete"
        );
        reports.push(report);
    }
    Ok(reports)
}
