//! Forecast evaluation metrics.
//!
//! All functions are pure and stateless over equal-length slices. Numeric
//! edge cases (zero naive scale, all-zero percentage denominators) return
//! NaN rather than erroring; callers treat NaN as a valid "undefined"
//! outcome and exclude it from aggregates.

use std::collections::BTreeMap;

/// Threshold below which a denominator counts as numerically zero.
const EPS: f64 = 1e-10;

/// Mean Absolute Scaled Error.
///
/// MAE of the forecast divided by the MAE of the seasonal-naive forecast
/// computed on `naive_actuals` (the actuals themselves when `None`, which
/// is appropriate for validation sets immediately following training data).
///
/// Values below 1 indicate the model beats the naive baseline. Returns NaN
/// when the naive scale is numerically zero or cannot be computed.
pub fn mase(
    actuals: &[f64],
    forecasts: &[f64],
    naive_actuals: Option<&[f64]>,
    seasonality: usize,
) -> f64 {
    if actuals.is_empty() || actuals.len() != forecasts.len() {
        return f64::NAN;
    }

    let mae = actuals
        .iter()
        .zip(forecasts.iter())
        .map(|(a, f)| (a - f).abs())
        .sum::<f64>()
        / actuals.len() as f64;

    let naive = naive_actuals.unwrap_or(actuals);
    if naive.len() <= seasonality {
        return f64::NAN;
    }
    let scale = naive
        .iter()
        .skip(seasonality)
        .zip(naive.iter())
        .map(|(curr, prev)| (curr - prev).abs())
        .sum::<f64>()
        / (naive.len() - seasonality) as f64;

    if scale < EPS {
        return f64::NAN;
    }

    mae / scale
}

/// Symmetric Mean Absolute Percentage Error on a 0-200 scale.
///
/// Rows where both actual and forecast are numerically zero are excluded
/// from the average; if every row is excluded the result is NaN.
pub fn smape(actuals: &[f64], forecasts: &[f64]) -> f64 {
    if actuals.is_empty() || actuals.len() != forecasts.len() {
        return f64::NAN;
    }

    let mut sum = 0.0;
    let mut count = 0usize;
    for (a, f) in actuals.iter().zip(forecasts.iter()) {
        let denom = (a.abs() + f.abs()) / 2.0;
        if denom > EPS {
            sum += (a - f).abs() / denom;
            count += 1;
        }
    }

    if count == 0 {
        return f64::NAN;
    }
    sum / count as f64 * 100.0
}

/// Weighted quantile loss: mean pinball loss at q=0.1 and q=0.9.
pub fn weighted_quantile_loss(actuals: &[f64], p10: &[f64], p90: &[f64]) -> f64 {
    if actuals.is_empty() || actuals.len() != p10.len() || actuals.len() != p90.len() {
        return f64::NAN;
    }

    let total: f64 = actuals
        .iter()
        .zip(p10.iter().zip(p90.iter()))
        .map(|(y, (lo, hi))| pinball(0.1, *y, *lo) + pinball(0.9, *y, *hi))
        .sum();
    total / actuals.len() as f64
}

fn pinball(q: f64, actual: f64, quantile: f64) -> f64 {
    let error = actual - quantile;
    if error >= 0.0 {
        q * error
    } else {
        (q - 1.0) * error
    }
}

/// Fraction of actuals inside the `[p10, p90]` interval. Ideal value 0.80.
pub fn coverage_80(actuals: &[f64], p10: &[f64], p90: &[f64]) -> f64 {
    if actuals.is_empty() || actuals.len() != p10.len() || actuals.len() != p90.len() {
        return f64::NAN;
    }

    let inside = actuals
        .iter()
        .zip(p10.iter().zip(p90.iter()))
        .filter(|(y, (lo, hi))| **y >= **lo && **y <= **hi)
        .count();
    inside as f64 / actuals.len() as f64
}

/// Compute every metric at once.
///
/// Always returns `mase` and `smape`; `wql` and `coverage_80` are included
/// only when both interval bounds are supplied.
pub fn compute_all(
    actuals: &[f64],
    p50: &[f64],
    p10: Option<&[f64]>,
    p90: Option<&[f64]>,
    naive_actuals: Option<&[f64]>,
    seasonality: usize,
) -> BTreeMap<String, f64> {
    let mut metrics = BTreeMap::new();
    metrics.insert(
        "mase".to_string(),
        mase(actuals, p50, naive_actuals, seasonality),
    );
    metrics.insert("smape".to_string(), smape(actuals, p50));

    if let (Some(lo), Some(hi)) = (p10, p90) {
        metrics.insert(
            "wql".to_string(),
            weighted_quantile_loss(actuals, lo, hi),
        );
        metrics.insert("coverage_80".to_string(), coverage_80(actuals, lo, hi));
    }

    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mase_of_perfect_forecast_is_zero() {
        let y = vec![10.0, 12.0, 9.0, 11.0, 14.0, 15.0, 13.0, 10.0, 12.0];
        assert_relative_eq!(mase(&y, &y, None, 1), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn mase_against_training_scale() {
        let actuals = vec![10.0, 10.0, 10.0];
        let forecasts = vec![12.0, 12.0, 12.0];
        // Naive errors at lag 1: |5-1|, |9-5| = 4, 4 -> scale 4; MAE 2
        let train = vec![1.0, 5.0, 9.0];
        let m = mase(&actuals, &forecasts, Some(&train), 1);
        assert_relative_eq!(m, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn mase_of_constant_series_is_undefined() {
        let y = vec![5.0, 5.0, 5.0, 5.0, 5.0];
        let f = vec![4.0, 5.0, 6.0, 5.0, 5.0];
        assert!(mase(&y, &f, None, 1).is_nan());
    }

    #[test]
    fn mase_with_short_naive_history_is_undefined() {
        let y = vec![1.0, 2.0, 3.0];
        assert!(mase(&y, &y, None, 7).is_nan());
    }

    #[test]
    fn smape_of_perfect_forecast_is_zero() {
        let y = vec![10.0, 12.0, 9.0];
        assert_relative_eq!(smape(&y, &y), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn smape_excludes_double_zero_rows() {
        // Only the second row contributes: |10-5| / ((10+5)/2) = 2/3
        let actuals = vec![0.0, 10.0];
        let forecasts = vec![0.0, 5.0];
        assert_relative_eq!(smape(&actuals, &forecasts), 200.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn smape_of_all_zero_rows_is_undefined() {
        let zeros = vec![0.0, 0.0, 0.0];
        assert!(smape(&zeros, &zeros).is_nan());
    }

    #[test]
    fn wql_known_value() {
        // One row: y=10, p10=8, p90=12.
        // pinball(0.1, 10, 8)  = 0.1 * 2 = 0.2
        // pinball(0.9, 10, 12) = 0.1 * 2 = 0.2
        let loss = weighted_quantile_loss(&[10.0], &[8.0], &[12.0]);
        assert_relative_eq!(loss, 0.4, epsilon = 1e-12);
    }

    #[test]
    fn coverage_full_and_partial() {
        let y = vec![5.0, 6.0, 7.0];
        let lo = vec![4.0, 4.0, 4.0];
        let hi = vec![8.0, 8.0, 8.0];
        assert_relative_eq!(coverage_80(&y, &lo, &hi), 1.0, epsilon = 1e-12);

        let y_out = vec![5.0, 6.0, 9.0];
        let c = coverage_80(&y_out, &lo, &hi);
        assert!(c < 1.0);
        assert_relative_eq!(c, 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn compute_all_without_intervals_omits_interval_metrics() {
        let y = vec![10.0, 11.0, 12.0, 13.0];
        let metrics = compute_all(&y, &y, None, None, None, 1);
        assert!(metrics.contains_key("mase"));
        assert!(metrics.contains_key("smape"));
        assert!(!metrics.contains_key("wql"));
        assert!(!metrics.contains_key("coverage_80"));
    }

    #[test]
    fn compute_all_with_intervals() {
        let y = vec![10.0, 11.0, 12.0, 13.0];
        let lo = vec![8.0, 9.0, 10.0, 11.0];
        let hi = vec![12.0, 13.0, 14.0, 15.0];
        let metrics = compute_all(&y, &y, Some(&lo), Some(&hi), None, 1);
        assert_eq!(metrics.len(), 4);
        assert_relative_eq!(metrics["coverage_80"], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn length_mismatch_is_undefined_not_error() {
        assert!(mase(&[1.0, 2.0], &[1.0], None, 1).is_nan());
        assert!(smape(&[1.0, 2.0], &[1.0]).is_nan());
        assert!(weighted_quantile_loss(&[1.0], &[1.0, 2.0], &[1.0]).is_nan());
        assert!(coverage_80(&[], &[], &[]).is_nan());
    }
}
