//! Forecaster trait defining the common interface for all demand models,
//! plus the name-keyed model registry.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::error::{ForecastError, Result};
use crate::models::gbdt::GradientBoostedTrees;

/// Hyperparameter overrides passed to a model factory.
pub type ModelParams = BTreeMap<String, serde_json::Value>;

/// Common interface every demand model implements.
///
/// Object-safe; the trainer works through `Box<dyn Forecaster>`.
pub trait Forecaster: Send + std::fmt::Debug {
    /// Train on a feature matrix and target vector. A model is reusable
    /// only through a fresh instance; `fit` must be callable repeatedly
    /// from a clean one.
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()>;

    /// Point estimates, one non-negative value per row. Demand cannot be
    /// negative; implementations must clip.
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>>;

    /// `(p10, p90)` prediction intervals.
    ///
    /// The default is a symmetric band of width `alpha` around the point
    /// estimate, with the low side clipped at zero. It is usable by any
    /// model without a native uncertainty output. Concrete models may
    /// override with a calibrated estimate; the gradient-boosted model
    /// does, and ignores `alpha` entirely (see its docs).
    fn predict_intervals(&self, x: &[Vec<f64>], alpha: f64) -> Result<(Vec<f64>, Vec<f64>)> {
        let p50 = self.predict(x)?;
        let p10 = p50
            .iter()
            .map(|v| (v * (1.0 - alpha / 2.0)).max(0.0))
            .collect();
        let p90 = p50.iter().map(|v| v * (1.0 + alpha / 2.0)).collect();
        Ok((p10, p90))
    }

    /// Hyperparameters for tracking/logging.
    fn params(&self) -> ModelParams;

    /// Model name, matching its registry key.
    fn name(&self) -> &str;

    /// Feature-name -> importance mapping for a fitted model. Empty when
    /// the model has no importance notion.
    fn feature_importances(&self, _feature_names: &[String]) -> BTreeMap<String, f64> {
        BTreeMap::new()
    }

    /// Serialized fitted model for artifact registration, when supported.
    fn model_artifact(&self) -> Option<Vec<u8>> {
        None
    }
}

/// Type alias for boxed forecaster trait objects.
pub type BoxedForecaster = Box<dyn Forecaster>;

type Factory = Box<dyn Fn(&ModelParams) -> Result<BoxedForecaster> + Send + Sync>;

/// A named model factory.
pub struct ModelSpec {
    pub name: &'static str,
    factory: Factory,
}

impl ModelSpec {
    pub fn new<F>(name: &'static str, factory: F) -> Self
    where
        F: Fn(&ModelParams) -> Result<BoxedForecaster> + Send + Sync + 'static,
    {
        Self {
            name,
            factory: Box::new(factory),
        }
    }

    /// Create a fresh, unfitted model instance.
    pub fn create(&self, params: &ModelParams) -> Result<BoxedForecaster> {
        (self.factory)(params)
    }
}

/// Registry mapping model names to factories.
///
/// Adding a model means registering one factory entry and one concrete
/// type implementing [`Forecaster`]; nothing in the trainer branches on
/// model names.
#[derive(Default)]
pub struct ModelRegistry {
    models: Vec<ModelSpec>,
}

impl ModelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model specification.
    pub fn register(&mut self, spec: ModelSpec) {
        self.models.push(spec);
    }

    /// Whether a model name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.models.iter().any(|s| s.name == name)
    }

    /// Registered model names.
    pub fn names(&self) -> Vec<&'static str> {
        self.models.iter().map(|s| s.name).collect()
    }

    /// Instantiate a fresh model by name.
    pub fn create(&self, name: &str, params: &ModelParams) -> Result<BoxedForecaster> {
        self.models
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ForecastError::UnknownModel(name.to_string()))?
            .create(params)
    }
}

/// The registry with every built-in model.
pub fn default_registry() -> &'static ModelRegistry {
    static REGISTRY: OnceLock<ModelRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut registry = ModelRegistry::new();
        registry.register(ModelSpec::new("gbdt", |params| {
            Ok(Box::new(GradientBoostedTrees::from_params_map(params)?))
        }));
        registry
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal model that predicts a constant, for exercising the trait's
    /// default interval band.
    #[derive(Debug)]
    struct ConstantModel {
        value: f64,
        fitted: bool,
    }

    impl Forecaster for ConstantModel {
        fn fit(&mut self, _x: &[Vec<f64>], y: &[f64]) -> Result<()> {
            if y.is_empty() {
                return Err(ForecastError::EmptyData);
            }
            self.value = y.iter().sum::<f64>() / y.len() as f64;
            self.fitted = true;
            Ok(())
        }

        fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
            if !self.fitted {
                return Err(ForecastError::FitRequired);
            }
            Ok(vec![self.value.max(0.0); x.len()])
        }

        fn params(&self) -> ModelParams {
            BTreeMap::new()
        }

        fn name(&self) -> &str {
            "constant"
        }
    }

    #[test]
    fn default_interval_band_is_symmetric_and_clipped() {
        let mut model = ConstantModel {
            value: 0.0,
            fitted: false,
        };
        model.fit(&[vec![0.0]], &[10.0]).unwrap();

        let x = vec![vec![0.0], vec![0.0]];
        let (p10, p90) = model.predict_intervals(&x, 0.2).unwrap();
        assert_eq!(p10, vec![9.0, 9.0]);
        assert_eq!(p90, vec![11.0, 11.0]);
    }

    #[test]
    fn default_registry_has_gbdt() {
        let registry = default_registry();
        assert!(registry.contains("gbdt"));
        assert_eq!(registry.names(), vec!["gbdt"]);

        let model = registry.create("gbdt", &ModelParams::new()).unwrap();
        assert_eq!(model.name(), "gbdt");
    }

    #[test]
    fn unknown_model_errors() {
        let registry = default_registry();
        let err = registry.create("prophet", &ModelParams::new()).unwrap_err();
        assert_eq!(err, ForecastError::UnknownModel("prophet".to_string()));
    }

    #[test]
    fn registry_creates_independent_instances() {
        let registry = default_registry();
        let mut a = registry.create("gbdt", &ModelParams::new()).unwrap();
        let b = registry.create("gbdt", &ModelParams::new()).unwrap();

        let x: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..30).map(|i| i as f64).collect();
        a.fit(&x, &y).unwrap();

        assert!(a.predict(&x).is_ok());
        assert!(matches!(b.predict(&x), Err(ForecastError::FitRequired)));
    }
}
