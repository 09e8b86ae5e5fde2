//! Combining per-table frames into one frame per day.
//!
//! The tables of a page are joined with a relational natural inner join on
//! the columns they share, which in practice is only the time column. A row
//! whose time slot does not appear in every table is dropped; how many rows
//! were dropped is logged so a layout change shows up in the logs instead of
//! as silently thinner CSV files.
//!
//! Appending days into a month is [`MonthTable::append`](crate::models::MonthTable::append).

use crate::models::Frame;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("no shared columns between {left:?} and {right:?}")]
    NoSharedColumns {
        left: Vec<String>,
        right: Vec<String>,
    },
}

/// Inner-join two frames on every column they have in common.
///
/// Output columns are the left columns followed by the right-only columns.
/// Rows come out in left order; a left row matching several right rows
/// yields one row per match.
pub fn natural_join(left: &Frame, right: &Frame) -> Result<Frame, JoinError> {
    let shared: Vec<(usize, usize)> = left
        .columns
        .iter()
        .enumerate()
        .filter_map(|(li, c)| right.column_index(c).map(|ri| (li, ri)))
        .collect();
    if shared.is_empty() {
        return Err(JoinError::NoSharedColumns {
            left: left.columns.clone(),
            right: right.columns.clone(),
        });
    }

    let right_only: Vec<usize> = (0..right.columns.len())
        .filter(|ri| !shared.iter().any(|(_, r)| r == ri))
        .collect();

    let mut joined = Frame::with_columns(
        left.columns
            .iter()
            .cloned()
            .chain(right_only.iter().map(|&ri| right.columns[ri].clone()))
            .collect(),
    );

    let mut right_matched = vec![false; right.rows.len()];
    let mut left_unmatched = 0usize;
    for lrow in &left.rows {
        let mut matched = false;
        for (ri, rrow) in right.rows.iter().enumerate() {
            if !shared.iter().all(|&(l, r)| lrow.get(l) == rrow.get(r)) {
                continue;
            }
            matched = true;
            right_matched[ri] = true;
            joined.rows.push(
                lrow.iter()
                    .cloned()
                    .chain(right_only.iter().map(|&c| rrow.get(c).cloned().flatten()))
                    .collect(),
            );
        }
        if !matched {
            left_unmatched += 1;
        }
    }

    let right_unmatched = right_matched.iter().filter(|m| !**m).count();
    if left_unmatched > 0 || right_unmatched > 0 {
        warn!(
            left_unmatched,
            right_unmatched,
            joined = joined.len(),
            "Join dropped rows whose time slot is missing from the other table"
        );
    }

    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(columns: &[&str], rows: &[&[&str]]) -> Frame {
        Frame {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|v| Some(v.to_string())).collect())
                .collect(),
        }
    }

    #[test]
    fn test_join_on_time_column() {
        let left = frame(&["時間", "A"], &[&["t1", "1"], &["t2", "2"]]);
        let right = frame(&["時間", "B"], &[&["t1", "10"], &["t2", "20"]]);
        let joined = natural_join(&left, &right).unwrap();
        assert_eq!(joined.columns, vec!["時間", "A", "B"]);
        assert_eq!(joined, frame(&["時間", "A", "B"], &[&["t1", "1", "10"], &["t2", "2", "20"]]));
    }

    #[test]
    fn test_join_drops_unaligned_rows() {
        let left = frame(&["時間", "A"], &[&["t1", "1"], &["t2", "2"], &["t3", "3"]]);
        let right = frame(&["時間", "B"], &[&["t2", "20"], &["t4", "40"]]);
        let joined = natural_join(&left, &right).unwrap();
        assert_eq!(joined, frame(&["時間", "A", "B"], &[&["t2", "2", "20"]]));
    }

    #[test]
    fn test_join_follows_left_order() {
        let left = frame(&["時間", "A"], &[&["t2", "2"], &["t1", "1"]]);
        let right = frame(&["時間", "B"], &[&["t1", "10"], &["t2", "20"]]);
        let joined = natural_join(&left, &right).unwrap();
        assert_eq!(joined.rows[0][0].as_deref(), Some("t2"));
    }

    #[test]
    fn test_join_duplicate_keys_multiply() {
        let left = frame(&["時間", "A"], &[&["t1", "1"]]);
        let right = frame(&["時間", "B"], &[&["t1", "10"], &["t1", "11"]]);
        let joined = natural_join(&left, &right).unwrap();
        assert_eq!(joined.len(), 2);
    }

    #[test]
    fn test_join_on_every_shared_column() {
        let left = frame(&["時間", "A"], &[&["t1", "1"], &["t2", "2"]]);
        let right = frame(&["時間", "A", "B"], &[&["t1", "1", "x"], &["t2", "9", "y"]]);
        let joined = natural_join(&left, &right).unwrap();
        assert_eq!(joined, frame(&["時間", "A", "B"], &[&["t1", "1", "x"]]));
    }

    #[test]
    fn test_join_without_shared_columns_fails() {
        let left = frame(&["時間"], &[]);
        let right = frame(&["B"], &[]);
        assert!(matches!(
            natural_join(&left, &right),
            Err(JoinError::NoSharedColumns { .. })
        ));
    }

    #[test]
    fn test_join_with_empty_side_keeps_columns() {
        let left = frame(&["時間", "A"], &[&["t1", "1"]]);
        let right = frame(&["時間", "B"], &[]);
        let joined = natural_join(&left, &right).unwrap();
        assert_eq!(joined.columns, vec!["時間", "A", "B"]);
        assert!(joined.is_empty());
    }
}
