//! Training orchestration: the per-series trainer and the batch runner.

pub mod batch;
pub mod trainer;

pub use batch::{train_all, BatchRunner, BatchSummary, CancellationToken, SeriesFailure};
pub use trainer::{train_single_series, SeriesTrainResult};
