//! Training run configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

/// Configuration for a training run.
///
/// Shared by every series in a batch and immutable for the duration of the
/// run. Deserializable so job payloads can carry it directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Number of future days to forecast.
    pub horizon_days: usize,
    /// Number of expanding-window CV folds. Zero disables CV.
    pub n_cv_folds: usize,
    /// Validation window length in days per fold.
    pub val_size_days: usize,
    /// Minimum training window size; folds with less training data are skipped.
    pub min_train_days: usize,
    /// Seasonal period for the naive MASE baseline (7 for weekly seasonality).
    pub seasonality: usize,
    /// Registered model name to train.
    pub model_name: String,
    /// Model hyperparameter overrides, passed to the model factory.
    pub model_params: BTreeMap<String, serde_json::Value>,
    /// Whether to log the fitted model as a tracking artifact.
    pub register_model: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            horizon_days: 365,
            n_cv_folds: 4,
            val_size_days: 28,
            min_train_days: 60,
            seasonality: 7,
            model_name: "gbdt".to_string(),
            model_params: BTreeMap::new(),
            register_model: true,
        }
    }
}

impl TrainConfig {
    /// Set the forecast horizon.
    pub fn with_horizon(mut self, horizon_days: usize) -> Self {
        self.horizon_days = horizon_days;
        self
    }

    /// Set the CV fold count.
    pub fn with_folds(mut self, n_cv_folds: usize) -> Self {
        self.n_cv_folds = n_cv_folds;
        self
    }

    /// Set the model name.
    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    /// Set a model hyperparameter override.
    pub fn with_model_param(
        mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        self.model_params.insert(key.into(), value);
        self
    }

    /// Check numeric bounds. `n_cv_folds` may be zero; everything else must
    /// be strictly positive.
    pub fn validate(&self) -> Result<()> {
        if self.horizon_days == 0 {
            return Err(ForecastError::InvalidParameter(
                "horizon_days must be positive".to_string(),
            ));
        }
        if self.val_size_days == 0 {
            return Err(ForecastError::InvalidParameter(
                "val_size_days must be positive".to_string(),
            ));
        }
        if self.min_train_days == 0 {
            return Err(ForecastError::InvalidParameter(
                "min_train_days must be positive".to_string(),
            ));
        }
        if self.seasonality == 0 {
            return Err(ForecastError::InvalidParameter(
                "seasonality must be positive".to_string(),
            ));
        }
        if self.model_name.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "model_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = TrainConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.seasonality, 7);
        assert_eq!(config.model_name, "gbdt");
    }

    #[test]
    fn zero_folds_is_allowed() {
        let config = TrainConfig::default().with_folds(0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_horizon_is_rejected() {
        let config = TrainConfig::default().with_horizon(0);
        assert!(matches!(
            config.validate(),
            Err(ForecastError::InvalidParameter(_))
        ));
    }

    #[test]
    fn deserializes_from_partial_json() {
        let config: TrainConfig =
            serde_json::from_str(r#"{"horizon_days": 28, "n_cv_folds": 2}"#).unwrap();
        assert_eq!(config.horizon_days, 28);
        assert_eq!(config.n_cv_folds, 2);
        // Unspecified fields fall back to defaults
        assert_eq!(config.val_size_days, 28);
        assert!(config.register_model);
    }

    #[test]
    fn model_params_round_trip() {
        let config = TrainConfig::default()
            .with_model_param("n_estimators", serde_json::json!(100))
            .with_model_param("learning_rate", serde_json::json!(0.1));
        let json = serde_json::to_string(&config).unwrap();
        let back: TrainConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.model_params["n_estimators"], serde_json::json!(100));
    }
}
