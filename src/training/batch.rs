//! Batch runner: one independent training job per series.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::TrainConfig;
use crate::core::{group_by_series, Observation, SeriesId};
use crate::error::{ForecastError, Result};
use crate::features::{HolidayCalendar, NoHolidays};
use crate::models::{default_registry, ModelRegistry};
use crate::tracking::{ExperimentTracker, NoopTracker};
use crate::training::trainer::{train_single_series, SeriesTrainResult};

/// Maximum length of the aggregated failure message on [`ForecastError::BatchFailed`].
const FAILURE_MESSAGE_LIMIT: usize = 500;

/// Cooperative cancellation flag shared with the invoking job.
///
/// Cancelling abandons series that have not started yet; series already in
/// flight run to completion, so finished results are never corrupted.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// One series that failed during a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesFailure {
    pub series: SeriesId,
    pub reason: String,
}

impl SeriesFailure {
    /// The typed error this failure was recorded from.
    pub fn to_error(&self) -> ForecastError {
        ForecastError::SeriesTraining {
            series: self.series.to_string(),
            reason: self.reason.clone(),
        }
    }
}

/// Outcome of a batch run.
#[derive(Debug)]
pub struct BatchSummary {
    /// Identity of this batch run, shared by every tracking run it opened.
    pub run_id: String,
    /// Results for every series that trained successfully.
    pub results: Vec<SeriesTrainResult>,
    /// Series that failed, with reasons. Failures never abort the batch.
    pub failures: Vec<SeriesFailure>,
    /// Whether the run was cancelled before all series were attempted.
    pub cancelled: bool,
}

/// Runs the series trainer over every distinct series in an observation
/// stream, isolating failures at series granularity.
///
/// Series are independent, so they are trained in parallel across the
/// rayon thread pool; no state is shared between them.
pub struct BatchRunner<'a> {
    config: &'a TrainConfig,
    registry: &'a ModelRegistry,
    tracker: &'a dyn ExperimentTracker,
    calendar: &'a dyn HolidayCalendar,
}

impl<'a> BatchRunner<'a> {
    /// Runner with the default model registry, no tracker, and no holidays.
    pub fn new(config: &'a TrainConfig) -> Self {
        Self {
            config,
            registry: default_registry(),
            tracker: &NoopTracker,
            calendar: &NoHolidays,
        }
    }

    pub fn with_registry(mut self, registry: &'a ModelRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_tracker(mut self, tracker: &'a dyn ExperimentTracker) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn with_calendar(mut self, calendar: &'a dyn HolidayCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    /// Train every series in the input.
    ///
    /// A failure in one series is recorded and skipped; the batch
    /// continues. Fails with [`ForecastError::BatchFailed`] only when at
    /// least one series was attempted and none succeeded.
    pub fn run(
        &self,
        observations: &[Observation],
        cancel: &CancellationToken,
    ) -> Result<BatchSummary> {
        self.config.validate()?;
        if !self.registry.contains(&self.config.model_name) {
            return Err(ForecastError::UnknownModel(self.config.model_name.clone()));
        }
        if observations.is_empty() {
            return Err(ForecastError::EmptyData);
        }

        let run_id = Uuid::new_v4().to_string();
        let series = group_by_series(observations);
        info!(run_id = %run_id, n_series = series.len(), "starting batch run");

        // Per-series outcome: None when skipped due to cancellation.
        let outcomes: Vec<Option<std::result::Result<SeriesTrainResult, SeriesFailure>>> = series
            .par_iter()
            .map(|data| {
                if cancel.is_cancelled() {
                    return None;
                }
                match train_single_series(
                    data,
                    self.config,
                    self.registry,
                    self.tracker,
                    self.calendar,
                    &run_id,
                ) {
                    Ok(result) => Some(Ok(result)),
                    Err(e) => {
                        let failure = SeriesFailure {
                            series: data.id().clone(),
                            reason: e.to_string(),
                        };
                        warn!(series = %failure.series, reason = %failure.reason, "series failed");
                        Some(Err(failure))
                    }
                }
            })
            .collect();

        let cancelled = outcomes.iter().any(|o| o.is_none());
        let mut results = Vec::new();
        let mut failures = Vec::new();
        for outcome in outcomes.into_iter().flatten() {
            match outcome {
                Ok(result) => results.push(result),
                Err(failure) => failures.push(failure),
            }
        }

        if results.is_empty() && !failures.is_empty() {
            return Err(ForecastError::BatchFailed(aggregate_failures(&failures)));
        }

        info!(
            run_id = %run_id,
            succeeded = results.len(),
            failed = failures.len(),
            cancelled,
            "batch run finished"
        );

        Ok(BatchSummary {
            run_id,
            results,
            failures,
            cancelled,
        })
    }
}

/// Train every distinct series in `observations` with the default registry
/// and calendar. The plain entrypoint a job-queue handler calls.
pub fn train_all(
    observations: &[Observation],
    config: &TrainConfig,
    tracker: &dyn ExperimentTracker,
) -> Result<BatchSummary> {
    BatchRunner::new(config)
        .with_tracker(tracker)
        .run(observations, &CancellationToken::new())
}

fn aggregate_failures(failures: &[SeriesFailure]) -> String {
    let mut message = String::new();
    for failure in failures {
        if !message.is_empty() {
            message.push_str("; ");
        }
        message.push_str(&format!("{}: {}", failure.series, failure.reason));
        if message.len() > FAILURE_MESSAGE_LIMIT {
            message.truncate(FAILURE_MESSAGE_LIMIT);
            message.push_str("...");
            break;
        }
    }
    message
}
