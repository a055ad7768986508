//! Error types for the demandcast library.

use thiserror::Error;

/// Result type alias for forecasting operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors that can occur during feature building, validation, and training.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Too few historical days for the requested operation.
    ///
    /// Recoverable at the trainer level: a CV configuration that does not
    /// fit the history causes fold skipping, not series failure.
    #[error("insufficient data: need at least {needed} days, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Model has not been fitted yet.
    #[error("model must be fitted before prediction")]
    FitRequired,

    /// No factory registered under the requested model name.
    #[error("unknown model: {0}")]
    UnknownModel(String),

    /// Training failed for one series. Caught by the batch runner, which
    /// records the failure and continues with the remaining series.
    #[error("training failed for series {series}: {reason}")]
    SeriesTraining { series: String, reason: String },

    /// Every series in a batch failed. Fatal to the invoking job.
    #[error("batch failed, no series trained successfully: {0}")]
    BatchFailed(String),

    /// Numerical computation error.
    #[error("computation error: {0}")]
    ComputationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = ForecastError::EmptyData;
        assert_eq!(err.to_string(), "empty input data");

        let err = ForecastError::InsufficientData {
            needed: 172,
            got: 120,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data: need at least 172 days, got 120"
        );

        let err = ForecastError::UnknownModel("prophet".to_string());
        assert_eq!(err.to_string(), "unknown model: prophet");

        let err = ForecastError::SeriesTraining {
            series: "store-1/sku-9".to_string(),
            reason: "empty input data".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "training failed for series store-1/sku-9: empty input data"
        );

        let err = ForecastError::FitRequired;
        assert_eq!(err.to_string(), "model must be fitted before prediction");
    }

    #[test]
    fn errors_are_clonable_and_comparable() {
        let err1 = ForecastError::BatchFailed("3 series failed".to_string());
        let err2 = err1.clone();
        assert_eq!(err1, err2);
    }
}
