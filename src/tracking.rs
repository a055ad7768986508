//! Experiment-tracking collaborator boundary.
//!
//! The tracker is append-only and strictly observational: absence or
//! failure of the collaborator is surfaced as a warning, never as a
//! forecasting failure. The handle is passed explicitly into the trainer
//! so tests can substitute a fake with zero I/O.

use std::collections::BTreeMap;
use std::sync::Mutex;

use thiserror::Error;
use tracing::warn;

use crate::models::ModelParams;

/// Tags attached to a tracking run at start.
pub type RunTags = BTreeMap<String, String>;

/// Failure inside the tracking collaborator. Non-fatal by contract.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("tracking error: {0}")]
pub struct TrackingError(pub String);

/// Append-only experiment tracker client.
pub trait ExperimentTracker: Send + Sync {
    fn start_run(&self, tags: &RunTags) -> Result<String, TrackingError>;
    fn log_params(&self, run_id: &str, params: &ModelParams) -> Result<(), TrackingError>;
    fn log_metrics(&self, run_id: &str, metrics: &BTreeMap<String, f64>)
        -> Result<(), TrackingError>;
    fn log_artifact(&self, run_id: &str, path: &str, bytes: &[u8]) -> Result<(), TrackingError>;
    fn end_run(&self, run_id: &str) -> Result<(), TrackingError>;
}

/// Tracker that records nothing. The default when no collaborator is wired.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracker;

impl ExperimentTracker for NoopTracker {
    fn start_run(&self, _tags: &RunTags) -> Result<String, TrackingError> {
        Ok(String::new())
    }

    fn log_params(&self, _run_id: &str, _params: &ModelParams) -> Result<(), TrackingError> {
        Ok(())
    }

    fn log_metrics(
        &self,
        _run_id: &str,
        _metrics: &BTreeMap<String, f64>,
    ) -> Result<(), TrackingError> {
        Ok(())
    }

    fn log_artifact(&self, _run_id: &str, _path: &str, _bytes: &[u8]) -> Result<(), TrackingError> {
        Ok(())
    }

    fn end_run(&self, _run_id: &str) -> Result<(), TrackingError> {
        Ok(())
    }
}

/// A run recorded by [`InMemoryTracker`].
#[derive(Debug, Clone, Default)]
pub struct RecordedRun {
    pub id: String,
    pub tags: RunTags,
    pub params: ModelParams,
    pub metrics: BTreeMap<String, f64>,
    /// Artifact paths with payload sizes.
    pub artifacts: Vec<(String, usize)>,
    pub ended: bool,
}

/// Tracker that records runs in memory. Used by tests and local runs.
#[derive(Debug, Default)]
pub struct InMemoryTracker {
    runs: Mutex<Vec<RecordedRun>>,
}

impl InMemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded runs.
    pub fn runs(&self) -> Vec<RecordedRun> {
        self.runs.lock().expect("tracker lock poisoned").clone()
    }

    fn with_run<F>(&self, run_id: &str, apply: F) -> Result<(), TrackingError>
    where
        F: FnOnce(&mut RecordedRun),
    {
        let mut runs = self.runs.lock().expect("tracker lock poisoned");
        let run = runs
            .iter_mut()
            .find(|r| r.id == run_id)
            .ok_or_else(|| TrackingError(format!("unknown run: {run_id}")))?;
        apply(run);
        Ok(())
    }
}

impl ExperimentTracker for InMemoryTracker {
    fn start_run(&self, tags: &RunTags) -> Result<String, TrackingError> {
        let mut runs = self.runs.lock().expect("tracker lock poisoned");
        let id = format!("run-{}", runs.len());
        runs.push(RecordedRun {
            id: id.clone(),
            tags: tags.clone(),
            ..RecordedRun::default()
        });
        Ok(id)
    }

    fn log_params(&self, run_id: &str, params: &ModelParams) -> Result<(), TrackingError> {
        self.with_run(run_id, |run| {
            run.params.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
        })
    }

    fn log_metrics(
        &self,
        run_id: &str,
        metrics: &BTreeMap<String, f64>,
    ) -> Result<(), TrackingError> {
        self.with_run(run_id, |run| {
            run.metrics.extend(metrics.iter().map(|(k, v)| (k.clone(), *v)));
        })
    }

    fn log_artifact(&self, run_id: &str, path: &str, bytes: &[u8]) -> Result<(), TrackingError> {
        self.with_run(run_id, |run| {
            run.artifacts.push((path.to_string(), bytes.len()));
        })
    }

    fn end_run(&self, run_id: &str) -> Result<(), TrackingError> {
        self.with_run(run_id, |run| {
            run.ended = true;
        })
    }
}

/// Scoped tracking run: opened around one series' training, guaranteed to
/// end on every exit path via `Drop`.
///
/// All operations degrade to warnings on collaborator failure; a scope
/// whose `start_run` failed simply swallows subsequent calls.
pub struct RunScope<'a> {
    tracker: &'a dyn ExperimentTracker,
    run_id: Option<String>,
}

impl<'a> RunScope<'a> {
    pub fn open(tracker: &'a dyn ExperimentTracker, tags: &RunTags) -> Self {
        let run_id = match tracker.start_run(tags) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "failed to start tracking run");
                None
            }
        };
        Self { tracker, run_id }
    }

    /// The tracking run id, when the run opened successfully.
    pub fn id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    pub fn log_params(&self, params: &ModelParams) {
        if let Some(id) = &self.run_id {
            if let Err(e) = self.tracker.log_params(id, params) {
                warn!(run_id = %id, error = %e, "failed to log params");
            }
        }
    }

    /// Log metrics, dropping NaN values (undefined metrics are valid
    /// outcomes but meaningless to a tracker).
    pub fn log_metrics(&self, metrics: &BTreeMap<String, f64>) {
        let Some(id) = &self.run_id else {
            return;
        };
        let finite: BTreeMap<String, f64> = metrics
            .iter()
            .filter(|(_, v)| !v.is_nan())
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        if finite.is_empty() {
            return;
        }
        if let Err(e) = self.tracker.log_metrics(id, &finite) {
            warn!(run_id = %id, error = %e, "failed to log metrics");
        }
    }

    pub fn log_artifact(&self, path: &str, bytes: &[u8]) {
        if let Some(id) = &self.run_id {
            if let Err(e) = self.tracker.log_artifact(id, path, bytes) {
                warn!(run_id = %id, path, error = %e, "failed to log artifact");
            }
        }
    }
}

impl Drop for RunScope<'_> {
    fn drop(&mut self) {
        if let Some(id) = self.run_id.take() {
            if let Err(e) = self.tracker.end_run(&id) {
                warn!(run_id = %id, error = %e, "failed to end tracking run");
            }
        }
    }
}
