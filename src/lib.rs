//! # demandcast
//!
//! Daily demand forecasting per (location, item) series.
//!
//! Turns raw daily observations into a leakage-safe supervised feature
//! table, validates chronologically with expanding-window CV, fits a
//! gradient-boosted model per series, scores it with forecasting metrics
//! (MASE, sMAPE, quantile loss, interval coverage), and projects a
//! multi-day forecast with uncertainty bands. The batch runner trains many
//! series in parallel and isolates per-series failures.
//!
//! # Example
//!
//! ```
//! use chrono::{Duration, NaiveDate};
//! use demandcast::config::TrainConfig;
//! use demandcast::core::{Observation, SeriesId};
//! use demandcast::tracking::NoopTracker;
//! use demandcast::training::train_all;
//!
//! let series = SeriesId::new("store-1", "sku-1");
//! let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
//! let observations: Vec<Observation> = (0..120)
//!     .map(|i| {
//!         let demand = if i % 7 == 5 { 130.0 } else { 100.0 };
//!         Observation::new(series.clone(), start + Duration::days(i.into()), demand)
//!     })
//!     .collect();
//!
//! let config = TrainConfig::default()
//!     .with_horizon(14)
//!     .with_folds(0)
//!     .with_model_param("n_estimators", serde_json::json!(20));
//!
//! let summary = train_all(&observations, &config, &NoopTracker).unwrap();
//! assert_eq!(summary.results.len(), 1);
//! assert_eq!(summary.results[0].forecast.horizon(), 14);
//! ```

pub mod config;
pub mod core;
pub mod cv;
pub mod error;
pub mod features;
pub mod metrics;
pub mod models;
pub mod tracking;
pub mod training;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::config::TrainConfig;
    pub use crate::core::{ForecastResult, Observation, SeriesData, SeriesId};
    pub use crate::error::{ForecastError, Result};
    pub use crate::models::{default_registry, Forecaster};
    pub use crate::tracking::{ExperimentTracker, InMemoryTracker, NoopTracker};
    pub use crate::training::{train_all, BatchRunner, CancellationToken, SeriesTrainResult};
}
