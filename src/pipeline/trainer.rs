//! Trainer: create-or-replace the propensity model

use super::StepOutput;
use crate::config::PipelineConfig;
use crate::sql;
use crate::warehouse::Warehouse;
use crate::Result;
use std::io::Write;

/// Submit the training statement and wait for the job to finish.
///
/// # Errors
/// Returns the warehouse error unchanged; nothing is retried
pub async fn train<W, O>(
    warehouse: &W,
    config: &PipelineConfig,
    out: &mut O,
) -> Result<StepOutput<()>>
where
    W: Warehouse,
    O: Write,
{
    writeln!(out, "🤖 Training clinic propensity model...")?;
    let result = warehouse.execute(&sql::train_model(config)).await?;
    writeln!(out, "✅ Model trained successfully")?;
    Ok(StepOutput::new((), &result))
}
