//! Per-series training: CV evaluation, final fit, future forecast.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::TrainConfig;
use crate::core::{ForecastMetadata, ForecastResult, SeriesData, SeriesId};
use crate::cv::expanding_window_splits;
use crate::error::{ForecastError, Result};
use crate::features::{build_features, build_future_template, HolidayCalendar, RowPolicy};
use crate::metrics::compute_all;
use crate::models::ModelRegistry;
use crate::tracking::{ExperimentTracker, RunScope, RunTags};

/// Width of the base interface's default interval band. The gradient-boosted
/// model ignores it; see `models::gbdt`.
const DEFAULT_INTERVAL_ALPHA: f64 = 0.2;

/// Everything produced by training one series.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesTrainResult {
    pub series: SeriesId,
    pub model_name: String,
    /// Tracking run id; empty when no tracking collaborator was available.
    pub run_id: String,
    /// CV metrics averaged across folds, NaN-aware. Empty when no folds
    /// completed.
    pub cv_metrics: BTreeMap<String, f64>,
    pub forecast: ForecastResult,
    pub feature_importances: BTreeMap<String, f64>,
}

/// Train, evaluate, and forecast one series.
///
/// Steps run linearly: feature table, CV folds (zero folds when history is
/// too short for the CV configuration), per-fold scoring, NaN-aware metric
/// averaging, final fit on the full table, in-sample diagnostics, future
/// template, forecast assembly. A tracking run wraps the whole sequence and
/// is closed on every exit path; tracker failures never fail the series.
pub fn train_single_series(
    series: &SeriesData,
    config: &TrainConfig,
    registry: &ModelRegistry,
    tracker: &dyn ExperimentTracker,
    calendar: &dyn HolidayCalendar,
    batch_run_id: &str,
) -> Result<SeriesTrainResult> {
    let scope = RunScope::open(tracker, &run_tags(series.id(), config, batch_run_id));
    let run_id = scope.id().unwrap_or_default().to_string();
    scope.log_params(&config_params(config));

    // Step 1: supervised feature table.
    let table = build_features(series, calendar, RowPolicy::DropIncomplete)?;

    // Step 2: CV folds. Too little history degrades to zero folds; a partial
    // run with undefined CV metrics is valid.
    let folds = match expanding_window_splits(
        &table,
        config.n_cv_folds,
        config.val_size_days,
        config.min_train_days,
    ) {
        Ok(folds) => folds,
        Err(ForecastError::InsufficientData { needed, got }) => {
            warn!(series = %series.id(), needed, got, "skipping CV: not enough history");
            Vec::new()
        }
        Err(ForecastError::EmptyData) => {
            warn!(series = %series.id(), "skipping CV: empty feature table");
            Vec::new()
        }
        Err(e) => return Err(e),
    };

    // Step 3: score each fold with a fresh model instance.
    let mut fold_metrics: Vec<BTreeMap<String, f64>> = Vec::new();
    for fold in &folds {
        let mut model = registry.create(&config.model_name, &config.model_params)?;
        model.fit(fold.train.rows(), fold.train.targets())?;

        let p50 = model.predict(fold.val.rows())?;
        let (p10, p90) = model.predict_intervals(fold.val.rows(), DEFAULT_INTERVAL_ALPHA)?;

        let scores = compute_all(
            fold.val.targets(),
            &p50,
            Some(&p10),
            Some(&p90),
            Some(fold.train.targets()),
            config.seasonality,
        );
        scope.log_metrics(&prefixed(&scores, &format!("fold{}_", fold.fold_idx)));
        debug!(series = %series.id(), fold = fold.fold_idx, ?scores, "fold scored");
        fold_metrics.push(scores);
    }

    // Step 4: average each metric across folds, ignoring NaN.
    let cv_metrics = average_fold_metrics(&fold_metrics);
    if cv_metrics.is_empty() {
        warn!(series = %series.id(), "no CV folds completed");
    } else {
        scope.log_metrics(&prefixed(&cv_metrics, "cv_"));
    }

    // Step 5: final model on the entire table.
    let mut final_model = registry.create(&config.model_name, &config.model_params)?;
    final_model.fit(table.rows(), table.targets())?;

    // Step 6: in-sample diagnostics. No CV protection here, purely
    // observational.
    let in_sample = final_model.predict(table.rows())?;
    let train_scores = compute_all(
        table.targets(),
        &in_sample,
        None,
        None,
        Some(table.targets()),
        config.seasonality,
    );
    scope.log_metrics(&prefixed(&train_scores, "train_"));

    let feature_importances = final_model.feature_importances(table.names());
    if let Ok(bytes) = serde_json::to_vec(&feature_importances) {
        scope.log_artifact("feature_importances.json", &bytes);
    }
    if config.register_model {
        if let Some(bytes) = final_model.model_artifact() {
            scope.log_artifact(&format!("model/{}.json", final_model.name()), &bytes);
        }
    }

    // Step 7: forecast the configured horizon.
    let future = build_future_template(series, config.horizon_days, calendar)?;
    let p50 = final_model.predict(future.rows())?;
    let (p10, p90) = final_model.predict_intervals(future.rows(), DEFAULT_INTERVAL_ALPHA)?;

    let forecast = ForecastResult::new(
        future.dates().to_vec(),
        p50,
        p10,
        p90,
        config.model_name.clone(),
        ForecastMetadata {
            run_id: run_id.clone(),
            cv_metrics: cv_metrics.clone(),
        },
    )?;

    if let Ok(bytes) = serde_json::to_vec(&forecast_summary(series.id(), config, &forecast)) {
        scope.log_artifact("forecast_summary.json", &bytes);
    }

    info!(
        series = %series.id(),
        horizon = forecast.horizon(),
        folds = fold_metrics.len(),
        "series trained"
    );

    // Step 8: assemble the result. The scope drop ends the tracking run.
    Ok(SeriesTrainResult {
        series: series.id().clone(),
        model_name: config.model_name.clone(),
        run_id,
        cv_metrics,
        forecast,
        feature_importances,
    })
}

fn run_tags(series: &SeriesId, config: &TrainConfig, batch_run_id: &str) -> RunTags {
    let mut tags = RunTags::new();
    tags.insert("batch_run_id".to_string(), batch_run_id.to_string());
    tags.insert("location_id".to_string(), series.location_id.clone());
    tags.insert("item_id".to_string(), series.item_id.clone());
    tags.insert("model_name".to_string(), config.model_name.clone());
    tags
}

fn config_params(config: &TrainConfig) -> BTreeMap<String, serde_json::Value> {
    let mut params = BTreeMap::new();
    params.insert(
        "model_name".to_string(),
        serde_json::json!(config.model_name),
    );
    params.insert(
        "horizon_days".to_string(),
        serde_json::json!(config.horizon_days),
    );
    params.insert(
        "n_cv_folds".to_string(),
        serde_json::json!(config.n_cv_folds),
    );
    params.insert(
        "val_size_days".to_string(),
        serde_json::json!(config.val_size_days),
    );
    for (key, value) in &config.model_params {
        params.insert(format!("model_{key}"), value.clone());
    }
    params
}

fn prefixed(metrics: &BTreeMap<String, f64>, prefix: &str) -> BTreeMap<String, f64> {
    metrics
        .iter()
        .map(|(k, v)| (format!("{prefix}{k}"), *v))
        .collect()
}

/// Average each metric across folds, ignoring NaN entries. A metric that is
/// NaN in every fold stays NaN.
fn average_fold_metrics(fold_metrics: &[BTreeMap<String, f64>]) -> BTreeMap<String, f64> {
    let Some(first) = fold_metrics.first() else {
        return BTreeMap::new();
    };

    first
        .keys()
        .map(|key| {
            let values: Vec<f64> = fold_metrics
                .iter()
                .filter_map(|fm| fm.get(key))
                .copied()
                .filter(|v| !v.is_nan())
                .collect();
            let mean = if values.is_empty() {
                f64::NAN
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            };
            (key.clone(), mean)
        })
        .collect()
}

#[derive(Serialize)]
struct ForecastSummary<'a> {
    location_id: &'a str,
    item_id: &'a str,
    horizon_days: usize,
    cv_metrics: &'a BTreeMap<String, f64>,
    p50_head: &'a [f64],
}

fn forecast_summary<'a>(
    series: &'a SeriesId,
    config: &TrainConfig,
    forecast: &'a ForecastResult,
) -> ForecastSummary<'a> {
    ForecastSummary {
        location_id: &series.location_id,
        item_id: &series.item_id,
        horizon_days: config.horizon_days,
        cv_metrics: &forecast.metadata.cv_metrics,
        p50_head: &forecast.p50[..forecast.p50.len().min(7)],
    }
}
