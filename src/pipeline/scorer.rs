//! Scorer: write score, tier and timestamp onto unconverted clinics

use super::StepOutput;
use crate::config::PipelineConfig;
use crate::sql;
use crate::warehouse::Warehouse;
use crate::Result;
use std::io::Write;
use tracing::warn;

/// Submit the single scoring `UPDATE` and wait for it.
///
/// Returns the affected-row count when the warehouse reports one. Matching
/// no rows is legal (every clinic may already be converted) and only logged.
///
/// # Errors
/// Returns the warehouse error unchanged
pub async fn score<W, O>(
    warehouse: &W,
    config: &PipelineConfig,
    out: &mut O,
) -> Result<StepOutput<Option<u64>>>
where
    W: Warehouse,
    O: Write,
{
    writeln!(out, "🎯 Scoring all clinics...")?;
    let result = warehouse.execute(&sql::score_clinics(config)).await?;

    let affected = result.affected_rows();
    match affected {
        Some(0) => {
            warn!("scoring matched no unconverted clinics");
            writeln!(out, "✅ All clinics scored (0 rows updated)")?;
        }
        Some(n) => writeln!(out, "✅ All clinics scored ({n} rows updated)")?,
        None => writeln!(out, "✅ All clinics scored")?,
    }
    Ok(StepOutput::new(affected, &result))
}
