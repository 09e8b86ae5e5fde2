//! Month normalization: from raw cell strings to typed rows.
//!
//! Runs once per month, after every day has been appended:
//!
//! 1. newlines are stripped from column labels
//! 2. the time column is parsed into a timestamp
//! 3. the weekday number (Monday = 0) is derived
//! 4. status placeholders become 0 and every other column is parsed as an integer
//! 5. the day-off flag is derived from the Japanese holiday calendar
//!
//! Any cell that does not fit is an error for the whole month.

use crate::holidays::is_day_off;
use crate::models::{Frame, NormalizedMonth, NormalizedRow};
use chrono::{Datelike, NaiveDateTime};
use tracing::{debug, instrument};

/// Name of the derived weekday column.
pub const WEEKDAY_COLUMN: &str = "曜日_数値";
/// Name of the derived day-off column.
pub const HOLIDAY_COLUMN: &str = "休日";

/// Cell values that stand for "no wait time": service ended, no data,
/// temporarily suspended, planned suspension, and empty.
pub const PLACEHOLDERS: [&str; 5] = ["案内終了", "－", "一時運休", "計画運休", ""];

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S"];

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("month has no {0:?} column")]
    MissingTimeColumn(String),
    #[error("row {row}: cannot parse timestamp {value:?}")]
    Timestamp { row: usize, value: String },
    #[error("row {row}, column {column:?}: {value:?} is not an integer")]
    NotInteger {
        row: usize,
        column: String,
        value: String,
    },
    #[error("row {row}, column {column:?}: no value (column missing on that day)")]
    Absent { row: usize, column: String },
}

/// Parse a wait-time cell; placeholders count as 0 minutes.
pub fn parse_wait(value: &str) -> Option<i64> {
    if PLACEHOLDERS.contains(&value) {
        return Some(0);
    }
    value.trim().parse().ok()
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Monday = 0 .. Sunday = 6.
pub fn weekday_number(time: &NaiveDateTime) -> u32 {
    time.weekday().num_days_from_monday()
}

/// 1 on weekends and public holidays, else 0.
pub fn holiday_flag(time: &NaiveDateTime) -> u8 {
    u8::from(is_day_off(time.date()))
}

/// Turn an accumulated month into typed rows.
#[instrument(level = "info", skip_all, fields(rows = frame.len(), columns = frame.columns.len()))]
pub fn normalize(frame: Frame, time_label: &str) -> Result<NormalizedMonth, NormalizeError> {
    let columns: Vec<String> = frame.columns.iter().map(|c| c.replace('\n', "")).collect();
    let time_position = columns
        .iter()
        .position(|c| c.trim() == time_label)
        .ok_or_else(|| NormalizeError::MissingTimeColumn(time_label.to_string()))?;

    let mut rows = Vec::with_capacity(frame.rows.len());
    for (i, row) in frame.rows.into_iter().enumerate() {
        let mut time = None;
        let mut values = Vec::with_capacity(columns.len().saturating_sub(1));

        for (c, cell) in row.into_iter().enumerate() {
            let Some(cell) = cell else {
                return Err(NormalizeError::Absent {
                    row: i,
                    column: columns.get(c).cloned().unwrap_or_default(),
                });
            };
            if c == time_position {
                time = Some(
                    parse_timestamp(&cell)
                        .ok_or(NormalizeError::Timestamp { row: i, value: cell })?,
                );
            } else {
                let wait = parse_wait(&cell).ok_or_else(|| NormalizeError::NotInteger {
                    row: i,
                    column: columns.get(c).cloned().unwrap_or_default(),
                    value: cell.clone(),
                })?;
                values.push(wait);
            }
        }

        let time = time.ok_or_else(|| NormalizeError::Absent {
            row: i,
            column: columns[time_position].clone(),
        })?;
        rows.push(NormalizedRow {
            weekday: weekday_number(&time),
            holiday: holiday_flag(&time),
            time,
            values,
        });
    }

    let mut value_columns = columns;
    let time_column = value_columns.remove(time_position);
    debug!(rows = rows.len(), values = value_columns.len(), "Normalized month");

    Ok(NormalizedMonth {
        time_column,
        time_position,
        value_columns,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    fn frame(columns: &[&str], rows: Vec<Vec<Option<&str>>>) -> Frame {
        Frame {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(|v| v.map(str::to_string)).collect())
                .collect(),
        }
    }

    #[test]
    fn test_placeholders_become_zero() {
        let cells = ["案内終了", "－", "45", "一時運休", "計画運休", ""];
        let parsed: Vec<i64> = cells.iter().map(|c| parse_wait(c).unwrap()).collect();
        assert_eq!(parsed, vec![0, 0, 45, 0, 0, 0]);
    }

    #[test]
    fn test_other_text_is_not_a_wait() {
        assert_eq!(parse_wait("休止"), None);
        assert_eq!(parse_wait("45分"), None);
        assert_eq!(parse_wait(" 30 "), Some(30));
    }

    #[test]
    fn test_weekday_number() {
        assert_eq!(weekday_number(&ts("2023-01-02 09:00")), 0);
        assert_eq!(weekday_number(&ts("2023-01-08 09:00")), 6);
    }

    #[test]
    fn test_holiday_flag() {
        assert_eq!(holiday_flag(&ts("2023-01-01 09:00")), 1);
        assert_eq!(holiday_flag(&ts("2023-01-03 09:00")), 0);
        assert_eq!(holiday_flag(&ts("2023-01-07 09:00")), 1);
    }

    #[test]
    fn test_parse_timestamp_with_seconds() {
        let expected = NaiveDate::from_ymd_opt(2023, 1, 2)
            .unwrap()
            .and_hms_opt(21, 15, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2023-01-02 21:15:00"), Some(expected));
        assert_eq!(parse_timestamp("2023-01-02 21:15"), Some(expected));
        assert_eq!(parse_timestamp("21:15"), None);
    }

    #[test]
    fn test_normalize_month() {
        let month = frame(
            &["時間", "ソアリン\nFF", "タートル・トーク"],
            vec![
                vec![Some("2023-01-02 09:00"), Some("45"), Some("案内終了")],
                vec![Some("2023-01-03 09:00"), Some("一時運休"), Some("10")],
            ],
        );
        let normalized = normalize(month, "時間").unwrap();

        assert_eq!(normalized.columns(), vec!["時間", "ソアリンFF", "タートル・トーク"]);
        assert_eq!(normalized.rows.len(), 2);
        assert_eq!(normalized.rows[0].values, vec![45, 0]);
        assert_eq!(normalized.rows[0].weekday, 0);
        assert_eq!(normalized.rows[0].holiday, 1);
        assert_eq!(normalized.rows[1].values, vec![0, 10]);
        assert_eq!(normalized.rows[1].holiday, 0);
    }

    #[test]
    fn test_unknown_status_fails_month() {
        let month = frame(&["時間", "A"], vec![vec![Some("2023-01-02 09:00"), Some("調整中")]]);
        assert!(matches!(
            normalize(month, "時間"),
            Err(NormalizeError::NotInteger { row: 0, .. })
        ));
    }

    #[test]
    fn test_bad_timestamp_fails_month() {
        let month = frame(&["時間", "A"], vec![vec![Some("2023-01-02 9時"), Some("5")]]);
        assert!(matches!(
            normalize(month, "時間"),
            Err(NormalizeError::Timestamp { row: 0, .. })
        ));
    }

    #[test]
    fn test_absent_cell_fails_month() {
        let month = frame(
            &["時間", "A", "B"],
            vec![
                vec![Some("2023-01-02 09:00"), Some("5"), None],
                vec![Some("2023-01-03 09:00"), None, Some("7")],
            ],
        );
        assert!(matches!(
            normalize(month, "時間"),
            Err(NormalizeError::Absent { row: 0, ref column }) if column == "B"
        ));
    }

    #[test]
    fn test_missing_time_column() {
        let month = frame(&["A"], vec![]);
        assert!(matches!(
            normalize(month, "時間"),
            Err(NormalizeError::MissingTimeColumn(_))
        ));
    }
}
