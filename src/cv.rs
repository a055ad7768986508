//! Expanding-window chronological cross-validation.

use chrono::{Duration, NaiveDate};

use crate::core::FeatureTable;
use crate::error::{ForecastError, Result};

/// One chronological train/validation fold.
///
/// The validation window has fixed length; the training window is the full
/// prefix of history ending the day before validation starts. No gap, no
/// overlap.
#[derive(Debug, Clone)]
pub struct CVFold {
    pub fold_idx: usize,
    pub train: FeatureTable,
    pub val: FeatureTable,
    pub train_end: NaiveDate,
    pub val_start: NaiveDate,
    pub val_end: NaiveDate,
}

/// Generate expanding-window CV folds over a feature table.
///
/// `n_folds` consecutive, non-overlapping validation windows of
/// `val_size_days` are carved backward from the most recent date; each
/// fold trains on every row strictly before its validation window.
///
/// Fails with [`ForecastError::InsufficientData`] when the observed span is
/// shorter than `min_train_days + n_folds * val_size_days`. The check runs
/// before any fold is built, so the function returns either a complete fold
/// set or no folds at all. Individual folds whose training set ends up
/// below `min_train_days` rows, or whose validation set is empty, are
/// silently skipped.
///
/// Folds are returned oldest-first so metric averaging treats them as
/// exchangeable trials.
pub fn expanding_window_splits(
    table: &FeatureTable,
    n_folds: usize,
    val_size_days: usize,
    min_train_days: usize,
) -> Result<Vec<CVFold>> {
    let min_date = table.min_date().ok_or(ForecastError::EmptyData)?;
    let max_date = table.max_date().ok_or(ForecastError::EmptyData)?;

    let total_days = (max_date - min_date).num_days() as usize + 1;
    let required = min_train_days + n_folds * val_size_days;
    if total_days < required {
        return Err(ForecastError::InsufficientData {
            needed: required,
            got: total_days,
        });
    }

    let mut folds = Vec::new();
    for fold_idx in 0..n_folds {
        let val_end = max_date - Duration::days((fold_idx * val_size_days) as i64);
        let val_start = val_end - Duration::days(val_size_days as i64 - 1);
        let train_end = val_start - Duration::days(1);

        let train = table.filter_by_date(|d| d <= train_end);
        let val = table.filter_by_date(|d| d >= val_start && d <= val_end);

        if train.len() < min_train_days || val.is_empty() {
            continue;
        }

        folds.push(CVFold {
            fold_idx,
            train,
            val,
            train_end,
            val_start,
            val_end,
        });
    }

    folds.reverse();
    Ok(folds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_days(n: usize) -> FeatureTable {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates: Vec<NaiveDate> = (0..n).map(|i| start + Duration::days(i as i64)).collect();
        let rows: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64]).collect();
        let targets: Vec<f64> = (0..n).map(|i| i as f64).collect();
        FeatureTable::new(vec!["x".to_string()], dates, rows, targets).unwrap()
    }

    #[test]
    fn rejects_before_building_any_fold() {
        // 120 < 60 + 4 * 28 = 172
        let table = table_with_days(120);
        let err = expanding_window_splits(&table, 4, 28, 60).unwrap_err();
        assert_eq!(
            err,
            ForecastError::InsufficientData {
                needed: 172,
                got: 120
            }
        );
    }

    #[test]
    fn two_folds_fit_in_120_days() {
        let table = table_with_days(120);
        let folds = expanding_window_splits(&table, 2, 28, 60).unwrap();
        assert_eq!(folds.len(), 2);

        // Oldest-first: the first returned fold has the smaller training set.
        assert!(folds[0].train.len() < folds[1].train.len());
        assert_eq!(folds[0].train.len(), 64);
        assert_eq!(folds[1].train.len(), 92);
        assert_eq!(folds[0].val.len(), 28);
        assert_eq!(folds[1].val.len(), 28);
    }

    #[test]
    fn validation_windows_do_not_overlap() {
        let table = table_with_days(200);
        let folds = expanding_window_splits(&table, 3, 28, 60).unwrap();
        assert_eq!(folds.len(), 3);

        for pair in folds.windows(2) {
            // Consecutive windows: the later fold starts the day after the
            // earlier one ends.
            assert_eq!(pair[0].val_end + Duration::days(1), pair[1].val_start);
        }
    }

    #[test]
    fn train_is_strict_prefix_of_validation() {
        let table = table_with_days(150);
        let folds = expanding_window_splits(&table, 2, 28, 60).unwrap();

        for fold in &folds {
            assert_eq!(fold.train_end + Duration::days(1), fold.val_start);
            let max_train = fold.train.max_date().unwrap();
            let min_val = fold.val.min_date().unwrap();
            assert!(max_train < min_val);
        }
    }

    #[test]
    fn undersized_training_folds_are_skipped() {
        // A sparse table: one row on day 0, then rows on days 100..=147.
        // The span passes the up-front check but no fold can gather 60
        // training rows, so every fold is silently skipped.
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut days: Vec<i64> = vec![0];
        days.extend(100..=147);
        let dates: Vec<NaiveDate> = days.iter().map(|d| start + Duration::days(*d)).collect();
        let rows: Vec<Vec<f64>> = days.iter().map(|d| vec![*d as f64]).collect();
        let targets: Vec<f64> = days.iter().map(|d| *d as f64).collect();
        let table = FeatureTable::new(vec!["x".to_string()], dates, rows, targets).unwrap();

        let folds = expanding_window_splits(&table, 2, 28, 60).unwrap();
        assert!(folds.is_empty());
    }

    #[test]
    fn empty_table_errors() {
        let table = FeatureTable::default();
        let err = expanding_window_splits(&table, 2, 28, 60).unwrap_err();
        assert_eq!(err, ForecastError::EmptyData);
    }
}
