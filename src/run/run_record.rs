//! Run Record - one execution of the scoring pipeline

use super::EvaluationMetrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a run or of one of its steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Created but not yet started.
    Pending,
    /// Currently executing.
    Running,
    /// Completed successfully.
    Success,
    /// Aborted by an error.
    Failed,
}

/// Outcome of a single pipeline step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepRecord {
    /// Step label (`train`, `evaluate`, `score`, `report`)
    pub step: String,
    /// Final status of the step
    pub status: RunStatus,
    /// Wall-clock time spent waiting on the warehouse
    pub elapsed_ms: u64,
    /// Warehouse job id, when reported
    pub job_id: Option<String>,
    /// Error message for a failed step
    pub error: Option<String>,
}

/// Run Record tracks one pipeline execution from start to completion.
///
/// Serialized alongside exported prospects so a downstream consumer can tell
/// which model and which run produced them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineRun {
    run_id: String,
    model: String,
    status: RunStatus,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    steps: Vec<StepRecord>,
    metrics: Option<EvaluationMetrics>,
    scored_rows: Option<u64>,
    prospect_count: Option<usize>,
}

impl PipelineRun {
    /// Create a new run record in Pending status with a time-ordered id.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::now_v7().to_string(),
            model: model.into(),
            status: RunStatus::Pending,
            started_at: None,
            ended_at: None,
            steps: Vec::new(),
            metrics: None,
            scored_rows: None,
            prospect_count: None,
        }
    }

    /// Get the run ID.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Get the model name the run trained and scored with.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the current run status.
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.status
    }

    /// Get the start timestamp, if the run has started.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Get the end timestamp, if the run has completed.
    #[must_use]
    pub const fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Steps recorded so far, in execution order.
    #[must_use]
    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    /// Evaluation metrics, once the evaluator has run.
    #[must_use]
    pub const fn metrics(&self) -> Option<&EvaluationMetrics> {
        self.metrics.as_ref()
    }

    /// Rows the scorer updated, when the warehouse reported it.
    #[must_use]
    pub const fn scored_rows(&self) -> Option<u64> {
        self.scored_rows
    }

    /// Number of prospects the reporter printed.
    #[must_use]
    pub const fn prospect_count(&self) -> Option<usize> {
        self.prospect_count
    }

    /// Start the run, transitioning from Pending to Running.
    pub fn start(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Append a step outcome.
    pub fn record_step(
        &mut self,
        step: impl Into<String>,
        status: RunStatus,
        elapsed_ms: u64,
        job_id: Option<&str>,
        error: Option<String>,
    ) {
        self.steps.push(StepRecord {
            step: step.into(),
            status,
            elapsed_ms,
            job_id: job_id.map(ToString::to_string),
            error,
        });
    }

    /// Store the evaluator's metrics.
    pub fn set_metrics(&mut self, metrics: EvaluationMetrics) {
        self.metrics = Some(metrics);
    }

    /// Store the scorer's affected-row count.
    pub fn set_scored_rows(&mut self, rows: Option<u64>) {
        self.scored_rows = rows;
    }

    /// Store how many prospects were reported.
    pub fn set_prospect_count(&mut self, count: usize) {
        self.prospect_count = Some(count);
    }

    /// Complete the run with the given final status.
    ///
    /// Sets the `ended_at` timestamp to now.
    pub fn complete(&mut self, status: RunStatus) {
        self.status = status;
        self.ended_at = Some(Utc::now());
    }
}
