//! SQL statement templates
//!
//! Builds the four statements the pipeline submits. Identifiers, features,
//! thresholds, lookback and limit all come from [`PipelineConfig`]; nothing
//! here talks to the warehouse.
//!
//! ## Statements
//!
//! - `CREATE OR REPLACE MODEL` over the labelled training table
//! - `SELECT * FROM ML.EVALUATE(MODEL ...)`
//! - `UPDATE clinics ... FROM ML.PREDICT(...)` writing score, tier, timestamp
//! - `SELECT ... ORDER BY propensity_score DESC LIMIT n` for the report

mod inspect;

pub use inspect::{OrderDirection, QueryInspector, QueryPlan};

use crate::config::PipelineConfig;
use crate::tier::TierThresholds;
use crate::{Error, Result};

/// Columns the report query selects, in order
pub const PROSPECT_COLUMNS: [&str; 10] = [
    "clinic_id",
    "name",
    "city",
    "state",
    "phone",
    "email",
    "propensity_score",
    "propensity_tier",
    "affluence_score",
    "services",
];

/// What a statement does, with the parameters it was rendered from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatementKind {
    /// Create-or-replace the model
    TrainModel,
    /// Read evaluation metrics for the model
    EvaluateModel,
    /// Score unconverted clinics in place
    ScoreClinics {
        /// Thresholds baked into the `CASE` expression
        thresholds: TierThresholds,
    },
    /// Select the top reportable prospects
    TopProspects {
        /// `LIMIT` value
        limit: usize,
        /// Outreach quiet period in days
        lookback_days: u32,
    },
}

impl StatementKind {
    /// Short step label used in logs and errors
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::TrainModel => "train",
            Self::EvaluateModel => "evaluate",
            Self::ScoreClinics { .. } => "score",
            Self::TopProspects { .. } => "report",
        }
    }
}

/// A rendered statement ready for submission
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// What the statement does
    pub kind: StatementKind,
    /// Standard SQL text
    pub sql: String,
}

/// Check a dataset, table, or model name.
///
/// # Errors
/// Returns `InvalidIdentifier` unless the name is non-empty ASCII
/// letters, digits and underscores
pub fn validate_identifier(name: &str) -> Result<()> {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(Error::InvalidIdentifier(name.to_string()))
    }
}

/// Check a column name: an identifier that does not start with a digit.
///
/// # Errors
/// Returns `InvalidIdentifier` for anything else
pub fn validate_column(name: &str) -> Result<()> {
    validate_identifier(name)?;
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(Error::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}

/// Check a cloud project id (lowercase letters, digits, hyphens).
///
/// # Errors
/// Returns `InvalidIdentifier` for anything else
pub fn validate_project_id(project: &str) -> Result<()> {
    let ok = !project.is_empty()
        && !project.starts_with('-')
        && !project.ends_with('-')
        && project
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidIdentifier(project.to_string()))
    }
}

/// Fully qualified, backtick-quoted reference to an object in the dataset
#[must_use]
pub fn object_ref(config: &PipelineConfig, name: &str) -> String {
    format!(
        "`{}.{}.{}`",
        config.warehouse.project, config.warehouse.dataset, name
    )
}

/// Scoring-time expression for a feature the clinics table does not store.
///
/// Training rows carry these precomputed; clinic rows have to derive them.
#[must_use]
pub fn derived_feature_expr(feature: &str) -> Option<&'static str> {
    match feature {
        "service_count" => Some("ARRAY_LENGTH(services)"),
        "email_open_rate" => {
            Some("CASE WHEN emails_sent > 0 THEN emails_opened / emails_sent ELSE 0 END")
        }
        "response_rate" => {
            Some("CASE WHEN outreach_count > 0 THEN response_count / outreach_count ELSE 0 END")
        }
        _ => None,
    }
}

/// `CREATE OR REPLACE MODEL` over the training table
#[must_use]
pub fn train_model(config: &PipelineConfig) -> Statement {
    let model = &config.model;
    let label = &model.label_column;
    let features: String = model
        .features
        .iter()
        .map(|feature| format!("  {feature},\n"))
        .collect();
    let sql = format!(
        "CREATE OR REPLACE MODEL {model_ref}
OPTIONS(
  model_type='{model_type}',
  input_label_cols=['{label}'],
  auto_class_weights={class_weights},
  max_iterations={max_iterations}
) AS
SELECT
{features}  {label}
FROM {training}
WHERE {label} IS NOT NULL",
        model_ref = object_ref(config, &config.tables.model_name),
        model_type = model.model_type,
        class_weights = if model.auto_class_weights { "TRUE" } else { "FALSE" },
        max_iterations = model.max_iterations,
        training = object_ref(config, &config.tables.training_table),
    );

    Statement {
        kind: StatementKind::TrainModel,
        sql,
    }
}

/// `ML.EVALUATE` over the trained model
#[must_use]
pub fn evaluate_model(config: &PipelineConfig) -> Statement {
    Statement {
        kind: StatementKind::EvaluateModel,
        sql: format!(
            "SELECT\n  *\nFROM ML.EVALUATE(MODEL {})",
            object_ref(config, &config.tables.model_name)
        ),
    }
}

/// Positive-class probability in `ML.PREDICT` output
const POSITIVE_PROB: &str = "p.predicted_label_probs[OFFSET(1)].prob";

/// Single `UPDATE` that writes score, tier and timestamp onto every
/// unconverted clinic
#[must_use]
pub fn score_clinics(config: &PipelineConfig) -> Statement {
    let thresholds = config.scoring.thresholds;
    let clinics = object_ref(config, &config.tables.clinics_table);
    let features: String = config
        .model
        .features
        .iter()
        .map(|feature| match derived_feature_expr(feature) {
            Some(expr) => format!(",\n      {expr} AS {feature}"),
            None => format!(",\n      {feature}"),
        })
        .collect();
    let sql = format!(
        "UPDATE {clinics} c
SET
  propensity_score = {POSITIVE_PROB},
  propensity_tier = CASE
    WHEN {POSITIVE_PROB} >= {hot} THEN 'hot'
    WHEN {POSITIVE_PROB} >= {warm} THEN 'warm'
    ELSE 'cold'
  END,
  last_scored_at = CURRENT_TIMESTAMP()
FROM (
  SELECT
    clinic_id,
    predicted_label_probs
  FROM ML.PREDICT(MODEL {model_ref}, (
    SELECT
      clinic_id{features}
    FROM {clinics}
    WHERE NOT converted
  ))
) p
WHERE c.clinic_id = p.clinic_id",
        hot = thresholds.hot,
        warm = thresholds.warm,
        model_ref = object_ref(config, &config.tables.model_name),
    );

    Statement {
        kind: StatementKind::ScoreClinics { thresholds },
        sql,
    }
}

/// Top hot/warm prospects not converted and outside the outreach quiet
/// period, best score first
#[must_use]
pub fn top_prospects(config: &PipelineConfig, limit: usize) -> Statement {
    let lookback_days = config.scoring.lookback_days;
    let sql = format!(
        "SELECT
  {columns}
FROM {clinics}
WHERE propensity_tier IN ('hot', 'warm')
  AND NOT converted
  AND (last_outreach_date IS NULL OR last_outreach_date < TIMESTAMP_SUB(CURRENT_TIMESTAMP(), INTERVAL {lookback_days} DAY))
ORDER BY propensity_score DESC
LIMIT {limit}",
        columns = PROSPECT_COLUMNS.join(",\n  "),
        clinics = object_ref(config, &config.tables.clinics_table),
    );

    Statement {
        kind: StatementKind::TopProspects {
            limit,
            lookback_days,
        },
        sql,
    }
}
