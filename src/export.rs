//! Prospect export
//!
//! Writes the reported prospects, together with the run that produced them,
//! as a JSON document for the outreach tooling that places the calls.

use crate::clinic::Prospect;
use crate::run::PipelineRun;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

/// Exported document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProspectExport {
    /// Run that scored and selected the prospects
    pub run: PipelineRun,
    /// Prospects in rank order
    pub prospects: Vec<Prospect>,
}

/// Write `prospects` and `run` to `path` as pretty-printed JSON.
///
/// # Errors
/// Returns error if the file cannot be created or written
pub fn write_export(path: &Path, run: &PipelineRun, prospects: &[Prospect]) -> Result<()> {
    let export = ProspectExport {
        run: run.clone(),
        prospects: prospects.to_vec(),
    };
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &export)?;
    info!(path = %path.display(), prospects = prospects.len(), "prospects exported");
    Ok(())
}

/// Read an export back.
///
/// # Errors
/// Returns error if the file cannot be read or is not a valid export
pub fn read_export(path: &Path) -> Result<ProspectExport> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::RunStatus;
    use crate::tier::PropensityTier;

    #[test]
    fn test_write_then_read() {
        let mut run = PipelineRun::new("clinic_propensity_model");
        run.start();
        run.complete(RunStatus::Success);
        let prospects = vec![Prospect {
            clinic_id: "c-9".into(),
            name: "Radiance Aesthetics".into(),
            city: "Denver".into(),
            state: "CO".into(),
            phone: None,
            email: Some("front@radiance.example".into()),
            propensity_score: 0.74,
            propensity_tier: PropensityTier::Hot,
            affluence_score: Some(64.5),
            services: vec!["laser".into()],
        }];

        let path = std::env::temp_dir().join(format!("lead_scorer_export_{}.json", run.run_id()));
        write_export(&path, &run, &prospects).unwrap();
        let export = read_export(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(export.prospects, prospects);
        assert_eq!(export.run.run_id(), run.run_id());
        assert_eq!(export.run.status(), RunStatus::Success);
    }

    #[test]
    fn test_write_to_missing_directory_fails() {
        let run = PipelineRun::new("m");
        let result = write_export(Path::new("/nonexistent-dir/out.json"), &run, &[]);
        assert!(matches!(result, Err(crate::Error::Io(_))));
    }
}
