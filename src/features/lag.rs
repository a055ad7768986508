//! Lag and rolling-window features, computed per series.
//!
//! Every rolling window ends the day before the current row, so the current
//! day's own target never leaks into its features. Rows are assumed to be
//! consecutive daily observations (the ordering invariant the whole core
//! relies on), which lets lags be index shifts.

/// Lag and rolling window lengths in days.
pub const LAG_WINDOWS: [usize; 3] = [7, 14, 28];

/// Names of all lag/rolling feature columns, in output order.
pub fn lag_feature_names() -> Vec<String> {
    let mut names = Vec::new();
    for w in LAG_WINDOWS {
        names.push(format!("lag_{w}"));
    }
    for stat in ["mean", "std", "min", "max"] {
        for w in LAG_WINDOWS {
            names.push(format!("rolling_{stat}_{w}"));
        }
    }
    names
}

/// Compute all lag/rolling columns over a target series.
///
/// Returns one column per [`lag_feature_names`] entry, each aligned with
/// `values`. Cells that cannot be computed (no trailing history, or the
/// source value is NaN) are NaN.
///
/// Rolling aggregates use minimum-period-1 semantics: a window with fewer
/// than `w` prior days still produces a value from the days available, and
/// NaN entries inside the window (unknown future targets when features are
/// built over a history+future span) are skipped rather than poisoning the
/// aggregate. The standard deviation of a single point is 0.
pub fn lag_columns(values: &[f64]) -> Vec<Vec<f64>> {
    let n = values.len();
    let mut columns = Vec::with_capacity(LAG_WINDOWS.len() * 5);

    for w in LAG_WINDOWS {
        let column: Vec<f64> = (0..n)
            .map(|i| if i >= w { values[i - w] } else { f64::NAN })
            .collect();
        columns.push(column);
    }

    for stat in [Rolling::Mean, Rolling::Std, Rolling::Min, Rolling::Max] {
        for w in LAG_WINDOWS {
            let column: Vec<f64> = (0..n).map(|i| rolling_cell(values, i, w, stat)).collect();
            columns.push(column);
        }
    }

    columns
}

#[derive(Clone, Copy)]
enum Rolling {
    Mean,
    Std,
    Min,
    Max,
}

/// Aggregate the trailing `w`-day window ending at row `i - 1`.
fn rolling_cell(values: &[f64], i: usize, w: usize, stat: Rolling) -> f64 {
    let start = i.saturating_sub(w);
    let window: Vec<f64> = values[start..i]
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .collect();
    if window.is_empty() {
        return f64::NAN;
    }

    let count = window.len() as f64;
    match stat {
        Rolling::Mean => window.iter().sum::<f64>() / count,
        Rolling::Std => {
            if window.len() == 1 {
                return 0.0;
            }
            let mean = window.iter().sum::<f64>() / count;
            let ss: f64 = window.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (count - 1.0)).sqrt()
        }
        Rolling::Min => window.iter().copied().fold(f64::INFINITY, f64::min),
        Rolling::Max => window.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    }
}
