//! Lead scoring orchestrator
//!
//! Four steps, strictly in order, each awaited to completion before the
//! next starts:
//!
//! ```text
//! train ──▶ evaluate ──▶ score ──▶ report
//! ```
//!
//! The first failure aborts the remaining steps and is returned unchanged.
//! There is no retry and no rollback: the warehouse owns all durable state.

mod evaluator;
mod reporter;
mod scorer;
mod trainer;

pub use evaluator::format_metrics;
pub use reporter::format_prospect;

use crate::clinic::Prospect;
use crate::config::PipelineConfig;
use crate::run::{EvaluationMetrics, PipelineRun, RunStatus};
use crate::warehouse::{ResultSet, Warehouse};
use crate::Result;
use std::io::Write;
use std::time::Instant;
use tracing::{error, info};

/// Value produced by a step plus the job that produced it
#[derive(Debug, Clone)]
pub struct StepOutput<T> {
    /// Step result
    pub value: T,
    /// Warehouse job id, when reported
    pub job_id: Option<String>,
}

impl<T> StepOutput<T> {
    fn new(value: T, result: &ResultSet) -> Self {
        Self {
            value,
            job_id: result.job_id().map(ToString::to_string),
        }
    }
}

/// Runs the scoring steps against a warehouse, printing to `out`.
///
/// # Example
///
/// ```rust
/// use lead_scorer::config::PipelineConfig;
/// use lead_scorer::pipeline::Pipeline;
/// use lead_scorer::warehouse::MemoryWarehouse;
///
/// # async fn example() -> lead_scorer::Result<()> {
/// let mut config = PipelineConfig::default();
/// config.warehouse.project = "demo".into();
///
/// let mut pipeline = Pipeline::new(MemoryWarehouse::new(), config, Vec::new());
/// let prospects = pipeline.run(50).await?;
/// assert!(prospects.is_empty());
/// # Ok(())
/// # }
/// ```
pub struct Pipeline<W, O> {
    warehouse: W,
    config: PipelineConfig,
    out: O,
    run: PipelineRun,
}

impl<W, O> Pipeline<W, O>
where
    W: Warehouse,
    O: Write,
{
    /// Create a pipeline. `config` is assumed validated.
    pub fn new(warehouse: W, config: PipelineConfig, out: O) -> Self {
        let run = PipelineRun::new(&config.tables.model_name);
        Self {
            warehouse,
            config,
            out,
            run,
        }
    }

    /// The warehouse the pipeline talks to
    pub fn warehouse(&self) -> &W {
        &self.warehouse
    }

    /// Active configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Record of the current (or last) run
    pub fn run_record(&self) -> &PipelineRun {
        &self.run
    }

    /// Consume the pipeline, returning the console sink
    pub fn into_output(self) -> O {
        self.out
    }

    /// Run all four steps, stopping at the first failure.
    ///
    /// # Errors
    /// Returns the first step's error; later steps are not attempted
    pub async fn run(&mut self, limit: usize) -> Result<Vec<Prospect>> {
        self.run = PipelineRun::new(&self.config.tables.model_name);
        self.run.start();
        info!(run_id = self.run.run_id(), limit, "pipeline started");

        let outcome = self.run_steps(limit).await;
        match &outcome {
            Ok(prospects) => {
                self.run.complete(RunStatus::Success);
                info!(
                    run_id = self.run.run_id(),
                    prospects = prospects.len(),
                    "pipeline complete"
                );
            }
            Err(e) => {
                self.run.complete(RunStatus::Failed);
                error!(run_id = self.run.run_id(), error = %e, "pipeline aborted");
            }
        }
        outcome
    }

    async fn run_steps(&mut self, limit: usize) -> Result<Vec<Prospect>> {
        writeln!(self.out, "🚀 Clinic Propensity Scoring Pipeline\n")?;
        self.train().await?;
        self.evaluate().await?;
        self.score().await?;
        let prospects = self.report(limit).await?;
        writeln!(self.out, "\n✅ Pipeline complete!")?;
        writeln!(
            self.out,
            "💡 Next: export the top prospects for outreach (run --export <path>)"
        )?;
        Ok(prospects)
    }

    /// Trainer step.
    ///
    /// # Errors
    /// Returns the warehouse error unchanged
    pub async fn train(&mut self) -> Result<()> {
        let started = Self::begin("train");
        let outcome = trainer::train(&self.warehouse, &self.config, &mut self.out).await;
        self.finish("train", started, outcome).map(|o| o.value)
    }

    /// Evaluator step.
    ///
    /// # Errors
    /// Returns `EmptyResult` on a zero-row evaluation, or the warehouse
    /// error unchanged
    pub async fn evaluate(&mut self) -> Result<EvaluationMetrics> {
        let started = Self::begin("evaluate");
        let outcome = evaluator::evaluate(&self.warehouse, &self.config, &mut self.out).await;
        let metrics = self.finish("evaluate", started, outcome)?.value;
        self.run.set_metrics(metrics);
        Ok(metrics)
    }

    /// Scorer step. Returns the affected-row count when reported.
    ///
    /// # Errors
    /// Returns the warehouse error unchanged
    pub async fn score(&mut self) -> Result<Option<u64>> {
        let started = Self::begin("score");
        let outcome = scorer::score(&self.warehouse, &self.config, &mut self.out).await;
        let affected = self.finish("score", started, outcome)?.value;
        self.run.set_scored_rows(affected);
        Ok(affected)
    }

    /// Reporter step.
    ///
    /// # Errors
    /// Returns a decoding or inspection error, or the warehouse error
    /// unchanged
    pub async fn report(&mut self, limit: usize) -> Result<Vec<Prospect>> {
        let started = Self::begin("report");
        let outcome = reporter::report(&self.warehouse, &self.config, limit, &mut self.out).await;
        let prospects = self.finish("report", started, outcome)?.value;
        self.run.set_prospect_count(prospects.len());
        Ok(prospects)
    }

    fn begin(step: &'static str) -> Instant {
        info!(step, "step started");
        Instant::now()
    }

    fn finish<T>(
        &mut self,
        step: &'static str,
        started: Instant,
        outcome: Result<StepOutput<T>>,
    ) -> Result<StepOutput<T>> {
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &outcome {
            Ok(output) => {
                info!(
                    step,
                    elapsed_ms,
                    job_id = output.job_id.as_deref().unwrap_or("-"),
                    "step finished"
                );
                self.run.record_step(
                    step,
                    RunStatus::Success,
                    elapsed_ms,
                    output.job_id.as_deref(),
                    None,
                );
            }
            Err(e) => {
                error!(step, elapsed_ms, error = %e, "step failed");
                self.run
                    .record_step(step, RunStatus::Failed, elapsed_ms, None, Some(e.to_string()));
            }
        }
        outcome
    }
}
