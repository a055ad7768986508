//! Feature pipeline: raw series history to training table or future template.

use chrono::Duration;

use crate::core::{FeatureTable, SeriesData};
use crate::error::{ForecastError, Result};
use crate::features::calendar::{calendar_row, HolidayCalendar, CALENDAR_FEATURES};
use crate::features::lag::{lag_columns, lag_feature_names};

/// What to do with rows whose lag/rolling features could not be fully
/// computed (the first `max(window)` days of a series).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowPolicy {
    /// Drop incomplete rows. The right choice for training tables.
    DropIncomplete,
    /// Keep incomplete rows and mark them in the table's completeness mask.
    FlagIncomplete,
}

/// Names of every feature column the pipeline produces, in output order.
pub fn feature_names() -> Vec<String> {
    let mut names: Vec<String> = CALENDAR_FEATURES.iter().map(|n| n.to_string()).collect();
    names.extend(lag_feature_names());
    names
}

/// Build the supervised feature table for one series.
///
/// Calendar features come from each row's date; lag/rolling features come
/// from the target history strictly before each row. Under
/// [`RowPolicy::DropIncomplete`] every lag/rolling column of the returned
/// table is fully populated.
pub fn build_features(
    series: &SeriesData,
    calendar: &dyn HolidayCalendar,
    policy: RowPolicy,
) -> Result<FeatureTable> {
    if series.is_empty() {
        return Err(ForecastError::EmptyData);
    }

    let lags = lag_columns(series.quantities());
    let (dates, rows, targets, complete) =
        assemble_rows(series.dates(), series.quantities(), &lags, calendar);

    match policy {
        RowPolicy::DropIncomplete => {
            let mut kept_dates = Vec::new();
            let mut kept_rows = Vec::new();
            let mut kept_targets = Vec::new();
            for i in 0..dates.len() {
                if complete[i] {
                    kept_dates.push(dates[i]);
                    kept_rows.push(rows[i].clone());
                    kept_targets.push(targets[i]);
                }
            }
            FeatureTable::new(feature_names(), kept_dates, kept_rows, kept_targets)
        }
        RowPolicy::FlagIncomplete => {
            FeatureTable::new(feature_names(), dates, rows, targets)?.with_complete(complete)
        }
    }
}

/// Build the feature table for the `horizon` days following the last
/// observed date.
///
/// A synthetic continuation with unknown targets is appended to the real
/// history so lag/rolling computations can see into it; only the future
/// rows are returned. Rows are never dropped here: any lag/rolling value
/// still undefined after looking at history (possible near the start of
/// very short histories) is filled with the all-time mean of the historical
/// target. That fallback is an explicit policy, not a silent default.
pub fn build_future_template(
    series: &SeriesData,
    horizon: usize,
    calendar: &dyn HolidayCalendar,
) -> Result<FeatureTable> {
    if horizon == 0 {
        return Err(ForecastError::InvalidParameter(
            "horizon must be positive".to_string(),
        ));
    }
    if series.is_empty() {
        return Err(ForecastError::EmptyData);
    }

    let last_date = series.last_date().ok_or(ForecastError::EmptyData)?;
    let n_hist = series.len();

    let mut combined_dates = series.dates().to_vec();
    let mut combined_values = series.quantities().to_vec();
    for step in 1..=horizon {
        combined_dates.push(last_date + Duration::days(step as i64));
        combined_values.push(f64::NAN);
    }

    let lags = lag_columns(&combined_values);
    let (dates, mut rows, targets, _complete) =
        assemble_rows(&combined_dates, &combined_values, &lags, calendar);

    let hist_mean = series.mean_quantity();
    let lag_start = CALENDAR_FEATURES.len();
    for row in rows.iter_mut().skip(n_hist) {
        for cell in row.iter_mut().skip(lag_start) {
            if cell.is_nan() {
                *cell = hist_mean;
            }
        }
    }

    FeatureTable::new(
        feature_names(),
        dates[n_hist..].to_vec(),
        rows[n_hist..].to_vec(),
        targets[n_hist..].to_vec(),
    )
}

type AssembledRows = (
    Vec<chrono::NaiveDate>,
    Vec<Vec<f64>>,
    Vec<f64>,
    Vec<bool>,
);

fn assemble_rows(
    dates: &[chrono::NaiveDate],
    targets: &[f64],
    lags: &[Vec<f64>],
    calendar: &dyn HolidayCalendar,
) -> AssembledRows {
    let n = dates.len();
    let mut rows = Vec::with_capacity(n);
    let mut complete = Vec::with_capacity(n);

    for i in 0..n {
        let mut row = calendar_row(dates[i], calendar);
        let mut all_present = true;
        for col in lags {
            if col[i].is_nan() {
                all_present = false;
            }
            row.push(col[i]);
        }
        rows.push(row);
        complete.push(all_present);
    }

    (dates.to_vec(), rows, targets.to_vec(), complete)
}
