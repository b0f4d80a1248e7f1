//! In-process warehouse stand-in using `DashMap`.
//!
//! Holds clinic rows in memory and answers each [`StatementKind`] with the
//! same semantics the rendered SQL has in the real warehouse. The trained
//! "model" is a plain scoring function supplied by the caller. Used by the
//! test suite and by the binary's `--offline` mode.

use super::{ResultSet, Warehouse};
use crate::clinic::{ClinicRecord, Prospect, LIST_SEPARATOR};
use crate::run::EvaluationMetrics;
use crate::sql::{Statement, StatementKind, PROSPECT_COLUMNS};
use crate::tier::{PropensityTier, TierThresholds};
use crate::{Error, Result};
use arrow::array::{ArrayRef, Float64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use chrono::{Duration, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

type ScoringFn = Box<dyn Fn(&ClinicRecord) -> f64 + Send + Sync>;

/// In-memory warehouse holding the clinics table and a stand-in model.
///
/// # Example
///
/// ```rust
/// use lead_scorer::clinic::ClinicRecord;
/// use lead_scorer::warehouse::MemoryWarehouse;
///
/// let warehouse = MemoryWarehouse::new().with_model(|_clinic| 0.75);
/// warehouse.insert_clinic(ClinicRecord::new("c-1", "Glow Med Spa"));
/// assert_eq!(warehouse.len(), 1);
/// ```
pub struct MemoryWarehouse {
    clinics: DashMap<String, ClinicRecord>,
    model: ScoringFn,
    evaluation: Vec<EvaluationMetrics>,
    model_version: AtomicU64,
    statements: Mutex<Vec<Statement>>,
    fail_step: Mutex<Option<&'static str>>,
    jobs: AtomicU64,
}

impl MemoryWarehouse {
    /// Empty warehouse with a heuristic model and plausible metrics.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clinics: DashMap::new(),
            model: Box::new(heuristic_score),
            evaluation: vec![EvaluationMetrics {
                precision: 0.812,
                recall: 0.701,
                accuracy: 0.874,
                f1_score: 0.752,
                roc_auc: 0.903,
                log_loss: Some(0.318),
            }],
            model_version: AtomicU64::new(0),
            statements: Mutex::new(Vec::new()),
            fail_step: Mutex::new(None),
            jobs: AtomicU64::new(0),
        }
    }

    /// Replace the stand-in model. Scores are clamped to [0, 1].
    #[must_use]
    pub fn with_model<F>(mut self, model: F) -> Self
    where
        F: Fn(&ClinicRecord) -> f64 + Send + Sync + 'static,
    {
        self.model = Box::new(model);
        self
    }

    /// Rows `ML.EVALUATE` returns. An empty vector simulates a model
    /// with no evaluation output.
    #[must_use]
    pub fn with_evaluation(mut self, rows: Vec<EvaluationMetrics>) -> Self {
        self.evaluation = rows;
        self
    }

    /// Fail every statement of the given step (`train`, `evaluate`,
    /// `score`, `report`) as the real warehouse would on a remote error.
    pub fn fail_on(&self, step: &'static str) {
        *self.fail_step.lock().unwrap_or_else(PoisonError::into_inner) = Some(step);
    }

    /// Insert or replace a clinic row.
    pub fn insert_clinic(&self, clinic: ClinicRecord) {
        self.clinics.insert(clinic.clinic_id.clone(), clinic);
    }

    /// Snapshot of a clinic row.
    #[must_use]
    pub fn clinic(&self, clinic_id: &str) -> Option<ClinicRecord> {
        self.clinics.get(clinic_id).map(|c| c.value().clone())
    }

    /// Number of clinic rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clinics.len()
    }

    /// Check if the clinics table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clinics.is_empty()
    }

    /// True once a train statement has run.
    #[must_use]
    pub fn model_trained(&self) -> bool {
        self.model_version.load(Ordering::SeqCst) > 0
    }

    /// Number of times the model has been (re)created.
    #[must_use]
    pub fn model_version(&self) -> u64 {
        self.model_version.load(Ordering::SeqCst)
    }

    /// Every statement submitted, in order, including failed ones.
    #[must_use]
    pub fn statements(&self) -> Vec<Statement> {
        self.statements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn next_job_id(&self) -> String {
        format!("memory_job_{}", self.jobs.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn require_model(&self) -> Result<()> {
        if self.model_trained() {
            Ok(())
        } else {
            Err(Error::Remote {
                status: "notFound".to_string(),
                message: "Not found: Model (train it first)".to_string(),
            })
        }
    }

    fn evaluate(&self) -> Result<ResultSet> {
        self.require_model()?;
        Ok(ResultSet::new(EvaluationMetrics::to_batch(&self.evaluation)?))
    }

    fn score(&self, thresholds: &TierThresholds) -> Result<ResultSet> {
        self.require_model()?;
        let now = Utc::now();
        let mut updated = 0u64;
        for mut entry in self.clinics.iter_mut() {
            let clinic = entry.value_mut();
            if clinic.converted {
                continue;
            }
            let score = (self.model)(clinic).clamp(0.0, 1.0);
            clinic.propensity_score = Some(score);
            clinic.propensity_tier = Some(PropensityTier::classify(score, thresholds));
            clinic.last_scored_at = Some(now);
            updated += 1;
        }
        Ok(ResultSet::empty().with_affected_rows(updated))
    }

    fn top_prospects(&self, limit: usize, lookback_days: u32) -> Result<ResultSet> {
        let cutoff = Utc::now() - Duration::days(i64::from(lookback_days));
        let mut prospects: Vec<Prospect> = self
            .clinics
            .iter()
            .filter_map(|entry| {
                let clinic = entry.value();
                let (score, tier) = (clinic.propensity_score?, clinic.propensity_tier?);
                let quiet = clinic.last_outreach_date.map_or(true, |d| d < cutoff);
                (tier.is_reportable() && !clinic.converted && quiet)
                    .then(|| Prospect::from_clinic(clinic, score, tier))
            })
            .collect();

        // DashMap iteration order is arbitrary; break score ties by id
        prospects.sort_by(|a, b| {
            b.propensity_score
                .total_cmp(&a.propensity_score)
                .then_with(|| a.clinic_id.cmp(&b.clinic_id))
        });
        prospects.truncate(limit);

        Ok(ResultSet::new(prospects_to_batch(&prospects)?))
    }
}

impl Default for MemoryWarehouse {
    fn default() -> Self {
        Self::new()
    }
}

impl Warehouse for MemoryWarehouse {
    async fn execute(&self, statement: &Statement) -> Result<ResultSet> {
        self.statements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(statement.clone());

        let failing = *self.fail_step.lock().unwrap_or_else(PoisonError::into_inner);
        if failing == Some(statement.kind.label()) {
            return Err(Error::Injected(format!(
                "{} statement rejected",
                statement.kind.label()
            )));
        }

        let result = match statement.kind {
            StatementKind::TrainModel => {
                self.model_version.fetch_add(1, Ordering::SeqCst);
                Ok(ResultSet::empty())
            }
            StatementKind::EvaluateModel => self.evaluate(),
            StatementKind::ScoreClinics { thresholds } => self.score(&thresholds),
            StatementKind::TopProspects {
                limit,
                lookback_days,
            } => self.top_prospects(limit, lookback_days),
        }?;
        Ok(result.with_job_id(self.next_job_id()))
    }
}

/// Logistic blend of engagement and market features used when no model is
/// supplied.
#[allow(clippy::cast_precision_loss)]
fn heuristic_score(clinic: &ClinicRecord) -> f64 {
    let z = -2.0
        + 0.1 * clinic.service_count() as f64
        + 2.5 * clinic.response_rate()
        + 1.5 * clinic.email_open_rate()
        + 0.02 * clinic.affluence_score
        + 0.3 * (clinic.rating - 3.0);
    1.0 / (1.0 + (-z).exp())
}

/// Lay prospects out in the report query's column order.
fn prospects_to_batch(prospects: &[Prospect]) -> Result<RecordBatch> {
    let text = |f: fn(&Prospect) -> Option<String>| -> ArrayRef {
        Arc::new(StringArray::from(
            prospects.iter().map(f).collect::<Vec<_>>(),
        ))
    };
    let fields = PROSPECT_COLUMNS
        .iter()
        .map(|&name| {
            let data_type = match name {
                "propensity_score" | "affluence_score" => DataType::Float64,
                _ => DataType::Utf8,
            };
            Field::new(name, data_type, true)
        })
        .collect::<Vec<_>>();

    let batch = RecordBatch::try_new(
        Arc::new(Schema::new(fields)),
        vec![
            text(|p| Some(p.clinic_id.clone())),
            text(|p| Some(p.name.clone())),
            text(|p| Some(p.city.clone())),
            text(|p| Some(p.state.clone())),
            text(|p| p.phone.clone()),
            text(|p| p.email.clone()),
            Arc::new(Float64Array::from(
                prospects
                    .iter()
                    .map(|p| p.propensity_score)
                    .collect::<Vec<_>>(),
            )),
            text(|p| Some(p.propensity_tier.to_string())),
            Arc::new(Float64Array::from(
                prospects
                    .iter()
                    .map(|p| p.affluence_score)
                    .collect::<Vec<_>>(),
            )),
            text(|p| Some(p.services.join(LIST_SEPARATOR))),
        ],
    )?;
    Ok(batch)
}
