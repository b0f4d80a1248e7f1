//! Evaluator: read back the model's evaluation metrics

use super::StepOutput;
use crate::config::PipelineConfig;
use crate::run::EvaluationMetrics;
use crate::sql;
use crate::warehouse::Warehouse;
use crate::{Error, Result};
use std::io::Write;
use tracing::warn;

/// Submit `ML.EVALUATE`, print the five headline metrics, and return them.
///
/// # Errors
/// Returns `EmptyResult` when the warehouse sends back no row, a column
/// error when a metric is missing, or the warehouse error unchanged
pub async fn evaluate<W, O>(
    warehouse: &W,
    config: &PipelineConfig,
    out: &mut O,
) -> Result<StepOutput<EvaluationMetrics>>
where
    W: Warehouse,
    O: Write,
{
    writeln!(out, "📊 Evaluating model...")?;
    let result = warehouse.execute(&sql::evaluate_model(config)).await?;

    if result.is_empty() {
        return Err(Error::EmptyResult { step: "evaluate" });
    }
    if result.num_rows() > 1 {
        warn!(
            rows = result.num_rows(),
            "evaluation returned more than one row; using the first"
        );
    }

    let metrics = EvaluationMetrics::from_row(&result, 0)?;
    out.write_all(format_metrics(&metrics).as_bytes())?;
    Ok(StepOutput::new(metrics, &result))
}

/// Five indented lines, three decimals each
#[must_use]
pub fn format_metrics(metrics: &EvaluationMetrics) -> String {
    format!(
        "  Precision: {:.3}\n  Recall: {:.3}\n  Accuracy: {:.3}\n  F1 Score: {:.3}\n  AUC: {:.3}\n",
        metrics.precision, metrics.recall, metrics.accuracy, metrics.f1_score, metrics.roc_auc
    )
}
