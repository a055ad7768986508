//! Core data structures shared across the pipeline.

pub mod forecast;
pub mod series;
pub mod table;

pub use forecast::{ForecastMetadata, ForecastResult};
pub use series::{group_by_series, Observation, SeriesData, SeriesId};
pub use table::FeatureTable;
