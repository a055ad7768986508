//! Series identity and raw observation types.

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

/// Identity of one demand series: a (location, item) pair.
///
/// Both identifiers are opaque stable strings (typically UUIDs or codes
/// assigned by the caller's storage layer).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesId {
    pub location_id: String,
    pub item_id: String,
}

impl SeriesId {
    pub fn new(location_id: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            location_id: location_id.into(),
            item_id: item_id.into(),
        }
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.location_id, self.item_id)
    }
}

/// One raw daily observation.
///
/// Observations for a series are unique per date and strictly ascending by
/// date. Callers guarantee this ordering; the core assumes it and never
/// re-derives it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub series: SeriesId,
    pub date: NaiveDate,
    pub quantity: f64,
}

impl Observation {
    pub fn new(series: SeriesId, date: NaiveDate, quantity: f64) -> Self {
        Self {
            series,
            date,
            quantity,
        }
    }
}

/// History for a single series: the unit of work for the trainer.
#[derive(Debug, Clone)]
pub struct SeriesData {
    id: SeriesId,
    dates: Vec<NaiveDate>,
    quantities: Vec<f64>,
}

impl SeriesData {
    /// Create a series history. Dates and quantities must have equal length.
    pub fn new(id: SeriesId, dates: Vec<NaiveDate>, quantities: Vec<f64>) -> Result<Self> {
        if dates.len() != quantities.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: dates.len(),
                got: quantities.len(),
            });
        }
        Ok(Self {
            id,
            dates,
            quantities,
        })
    }

    pub fn id(&self) -> &SeriesId {
        &self.id
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn quantities(&self) -> &[f64] {
        &self.quantities
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Last observed date, if any history exists.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// All-time mean of the observed target. NaN for an empty series.
    pub fn mean_quantity(&self) -> f64 {
        if self.quantities.is_empty() {
            return f64::NAN;
        }
        self.quantities.iter().sum::<f64>() / self.quantities.len() as f64
    }
}

/// Group a flat observation stream into per-series histories.
///
/// Series appear in first-seen order; within a series, the input's date
/// ordering is preserved.
pub fn group_by_series(observations: &[Observation]) -> Vec<SeriesData> {
    let mut index: HashMap<SeriesId, usize> = HashMap::new();
    let mut groups: Vec<SeriesData> = Vec::new();

    for obs in observations {
        let idx = *index.entry(obs.series.clone()).or_insert_with(|| {
            groups.push(SeriesData {
                id: obs.series.clone(),
                dates: Vec::new(),
                quantities: Vec::new(),
            });
            groups.len() - 1
        });
        groups[idx].dates.push(obs.date);
        groups[idx].quantities.push(obs.quantity);
    }

    groups
}
