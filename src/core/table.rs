//! Dense feature table produced by the feature pipeline.

use chrono::NaiveDate;

use crate::error::{ForecastError, Result};

/// A supervised feature table for one series.
///
/// Each row pairs an observation date with a fixed-width feature vector and
/// a target quantity (NaN for future rows whose target is unknown). Tables
/// are immutable once built; every transform returns a new table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    names: Vec<String>,
    dates: Vec<NaiveDate>,
    rows: Vec<Vec<f64>>,
    targets: Vec<f64>,
    /// Per-row flag: true when every lag/rolling feature could be computed
    /// from real history. All-true unless rows were kept under
    /// `RowPolicy::FlagIncomplete`.
    complete: Vec<bool>,
}

impl FeatureTable {
    /// Create a table, checking row/column shape consistency.
    pub fn new(
        names: Vec<String>,
        dates: Vec<NaiveDate>,
        rows: Vec<Vec<f64>>,
        targets: Vec<f64>,
    ) -> Result<Self> {
        if dates.len() != rows.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: dates.len(),
                got: rows.len(),
            });
        }
        if dates.len() != targets.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: dates.len(),
                got: targets.len(),
            });
        }
        for row in &rows {
            if row.len() != names.len() {
                return Err(ForecastError::DimensionMismatch {
                    expected: names.len(),
                    got: row.len(),
                });
            }
        }
        let complete = vec![true; dates.len()];
        Ok(Self {
            names,
            dates,
            rows,
            targets,
            complete,
        })
    }

    /// Replace the per-row completeness mask.
    pub fn with_complete(mut self, complete: Vec<bool>) -> Result<Self> {
        if complete.len() != self.dates.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.dates.len(),
                got: complete.len(),
            });
        }
        self.complete = complete;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Number of feature columns.
    pub fn width(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    pub fn complete(&self) -> &[bool] {
        &self.complete
    }

    pub fn row(&self, index: usize) -> Result<&[f64]> {
        self.rows
            .get(index)
            .map(|r| r.as_slice())
            .ok_or(ForecastError::DimensionMismatch {
                expected: self.rows.len(),
                got: index,
            })
    }

    /// Index of a feature column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Extract a feature column by name.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r[idx]).collect())
    }

    pub fn min_date(&self) -> Option<NaiveDate> {
        self.dates.iter().min().copied()
    }

    pub fn max_date(&self) -> Option<NaiveDate> {
        self.dates.iter().max().copied()
    }

    /// Observed span in days: `(max_date - min_date) + 1`. Zero when empty.
    pub fn observed_day_span(&self) -> usize {
        match (self.min_date(), self.max_date()) {
            (Some(min), Some(max)) => (max - min).num_days() as usize + 1,
            _ => 0,
        }
    }

    /// New table keeping only rows whose date satisfies the predicate.
    pub fn filter_by_date<F>(&self, keep: F) -> FeatureTable
    where
        F: Fn(NaiveDate) -> bool,
    {
        let mut dates = Vec::new();
        let mut rows = Vec::new();
        let mut targets = Vec::new();
        let mut complete = Vec::new();
        for i in 0..self.dates.len() {
            if keep(self.dates[i]) {
                dates.push(self.dates[i]);
                rows.push(self.rows[i].clone());
                targets.push(self.targets[i]);
                complete.push(self.complete[i]);
            }
        }
        FeatureTable {
            names: self.names.clone(),
            dates,
            rows,
            targets,
            complete,
        }
    }
}
