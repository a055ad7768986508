//! Demand forecasting models.

pub mod gbdt;
pub mod traits;

pub use gbdt::{GbdtParams, GradientBoostedTrees};
pub use traits::{
    default_registry, BoxedForecaster, Forecaster, ModelParams, ModelRegistry, ModelSpec,
};
