//! Pipeline run tracking
//!
//! ## Schema Overview
//!
//! ```text
//! PipelineRun (1) ──< StepRecord (N)   [train, evaluate, score, report]
//!        │
//!        └── EvaluationMetrics (0..1)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use lead_scorer::run::{PipelineRun, RunStatus};
//!
//! let mut run = PipelineRun::new("clinic_propensity_model");
//! run.start();
//! run.record_step("train", RunStatus::Success, 1200, Some("job_abc"), None);
//! run.complete(RunStatus::Success);
//! assert_eq!(run.steps().len(), 1);
//! ```

mod metrics;
mod run_record;

pub use metrics::EvaluationMetrics;
pub use run_record::{PipelineRun, RunStatus, StepRecord};
