//! Forecast output for a single series.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

/// Metadata attached to a forecast: the tracking run that produced it and
/// the cross-validated metrics of the model behind it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetadata {
    pub run_id: String,
    pub cv_metrics: BTreeMap<String, f64>,
}

/// Multi-day quantile forecast for one series.
///
/// Rows are strictly consecutive days immediately following the last
/// observed date. Every row satisfies `0 <= p10 <= p50 <= p90`; the
/// constructor clips and reorders bounds to enforce this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResult {
    pub dates: Vec<NaiveDate>,
    pub p50: Vec<f64>,
    pub p10: Vec<f64>,
    pub p90: Vec<f64>,
    pub model_name: String,
    pub metadata: ForecastMetadata,
}

impl ForecastResult {
    /// Assemble a forecast, clipping all quantiles to non-negative and
    /// clamping bounds so `p10 <= p50 <= p90` holds per row.
    pub fn new(
        dates: Vec<NaiveDate>,
        p50: Vec<f64>,
        p10: Vec<f64>,
        p90: Vec<f64>,
        model_name: String,
        metadata: ForecastMetadata,
    ) -> Result<Self> {
        let n = dates.len();
        for (len, _label) in [(p50.len(), "p50"), (p10.len(), "p10"), (p90.len(), "p90")] {
            if len != n {
                return Err(ForecastError::DimensionMismatch {
                    expected: n,
                    got: len,
                });
            }
        }

        let p50: Vec<f64> = p50.into_iter().map(|v| v.max(0.0)).collect();
        let p10: Vec<f64> = p10
            .iter()
            .zip(p50.iter())
            .map(|(lo, mid)| lo.max(0.0).min(*mid))
            .collect();
        let p90: Vec<f64> = p90
            .iter()
            .zip(p50.iter())
            .map(|(hi, mid)| hi.max(*mid))
            .collect();

        Ok(Self {
            dates,
            p50,
            p10,
            p90,
            model_name,
            metadata,
        })
    }

    /// Number of forecast days.
    pub fn horizon(&self) -> usize {
        self.dates.len()
    }

    /// Iterate forecast rows as `(date, p50, p10, p90)`.
    pub fn rows(&self) -> impl Iterator<Item = (NaiveDate, f64, f64, f64)> + '_ {
        self.dates
            .iter()
            .zip(self.p50.iter())
            .zip(self.p10.iter().zip(self.p90.iter()))
            .map(|((date, p50), (p10, p90))| (*date, *p50, *p10, *p90))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dates(n: u32) -> Vec<NaiveDate> {
        (1..=n)
            .map(|d| NaiveDate::from_ymd_opt(2024, 3, d).unwrap())
            .collect()
    }

    #[test]
    fn clips_negative_quantiles() {
        let forecast = ForecastResult::new(
            dates(2),
            vec![-1.0, 5.0],
            vec![-3.0, 2.0],
            vec![-0.5, 8.0],
            "gbdt".to_string(),
            ForecastMetadata::default(),
        )
        .unwrap();

        assert_eq!(forecast.p50, vec![0.0, 5.0]);
        assert_eq!(forecast.p10, vec![0.0, 2.0]);
        assert_eq!(forecast.p90, vec![0.0, 8.0]);
    }

    #[test]
    fn reorders_crossed_bounds() {
        let forecast = ForecastResult::new(
            dates(1),
            vec![5.0],
            vec![7.0],
            vec![3.0],
            "gbdt".to_string(),
            ForecastMetadata::default(),
        )
        .unwrap();

        assert_eq!(forecast.p10, vec![5.0]);
        assert_eq!(forecast.p90, vec![5.0]);
    }

    #[test]
    fn rejects_length_mismatch() {
        let result = ForecastResult::new(
            dates(3),
            vec![1.0, 2.0],
            vec![1.0, 2.0, 3.0],
            vec![1.0, 2.0, 3.0],
            "gbdt".to_string(),
            ForecastMetadata::default(),
        );
        assert!(matches!(
            result,
            Err(ForecastError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn rows_iterates_in_order() {
        let forecast = ForecastResult::new(
            dates(2),
            vec![5.0, 6.0],
            vec![3.0, 4.0],
            vec![8.0, 9.0],
            "gbdt".to_string(),
            ForecastMetadata::default(),
        )
        .unwrap();

        let rows: Vec<_> = forecast.rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].1, 5.0);
        assert_eq!(rows[1].3, 9.0);
    }
}
