//! Pipeline configuration
//!
//! Loaded from YAML or JSON, then overridden from the environment. Every
//! identifier and tuning constant the SQL templates use lives here rather
//! than in the templates themselves.

use crate::sql::{validate_column, validate_identifier, validate_project_id};
use crate::tier::TierThresholds;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default BigQuery REST endpoint
pub const DEFAULT_API_BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Warehouse connection
    #[serde(default)]
    pub warehouse: WarehouseConfig,

    /// Warehouse object names
    #[serde(default)]
    pub tables: TableConfig,

    /// Model definition
    #[serde(default)]
    pub model: ModelConfig,

    /// Scoring and reporting knobs
    #[serde(default)]
    pub scoring: ScoringConfig,
}

/// Warehouse connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// Cloud project that owns the dataset and runs the jobs
    #[serde(default)]
    pub project: String,

    /// Dataset holding the tables and the model
    #[serde(default = "default_dataset")]
    pub dataset: String,

    /// Job location (e.g. `US`); the service picks one when unset
    #[serde(default)]
    pub location: Option<String>,

    /// REST base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// OAuth bearer token. Never written back out.
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,

    /// Delay between job-status polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long the service holds each query/poll request open
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            project: String::new(),
            dataset: default_dataset(),
            location: None,
            api_base_url: default_api_base_url(),
            access_token: None,
            poll_interval_ms: default_poll_interval_ms(),
            wait_timeout_ms: default_wait_timeout_ms(),
        }
    }
}

fn default_dataset() -> String {
    "novalyte_intelligence".to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

const fn default_poll_interval_ms() -> u64 {
    1000
}

const fn default_wait_timeout_ms() -> u64 {
    10_000
}

/// Names of the persisted warehouse objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Labelled training rows
    #[serde(default = "default_training_table")]
    pub training_table: String,

    /// Clinic records scored in place
    #[serde(default = "default_clinics_table")]
    pub clinics_table: String,

    /// Trained model artifact
    #[serde(default = "default_model_name")]
    pub model_name: String,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            training_table: default_training_table(),
            clinics_table: default_clinics_table(),
            model_name: default_model_name(),
        }
    }
}

fn default_training_table() -> String {
    "clinic_conversion_training".to_string()
}

fn default_clinics_table() -> String {
    "clinics".to_string()
}

fn default_model_name() -> String {
    "clinic_propensity_model".to_string()
}

/// Model definition passed to `CREATE OR REPLACE MODEL`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Warehouse model type
    #[serde(default = "default_model_type")]
    pub model_type: String,

    /// Binary label column in the training table
    #[serde(default = "default_label_column")]
    pub label_column: String,

    /// Let the warehouse rebalance classes
    #[serde(default = "default_true")]
    pub auto_class_weights: bool,

    /// Optimizer iteration cap
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Ordered feature columns. `service_count`, `email_open_rate` and
    /// `response_rate` are derived when scoring.
    #[serde(default = "default_features")]
    pub features: Vec<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_type: default_model_type(),
            label_column: default_label_column(),
            auto_class_weights: true,
            max_iterations: default_max_iterations(),
            features: default_features(),
        }
    }
}

fn default_model_type() -> String {
    "LOGISTIC_REG".to_string()
}

fn default_label_column() -> String {
    "label".to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_max_iterations() -> u32 {
    50
}

/// Feature columns used when none are configured.
#[must_use]
pub fn default_features() -> Vec<String> {
    [
        "type",
        "rating",
        "review_count",
        "affluence_score",
        "median_income",
        "market_population",
        "service_count",
        "outreach_count",
        "response_count",
        "calls_count",
        "emails_sent",
        "emails_opened",
        "email_open_rate",
        "response_rate",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

/// Scoring and reporting parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Tier lower bounds
    #[serde(default)]
    pub thresholds: TierThresholds,

    /// Leads contacted more recently than this are left out of the report
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    /// Report size
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            thresholds: TierThresholds::default(),
            lookback_days: default_lookback_days(),
            limit: default_limit(),
        }
    }
}

const fn default_lookback_days() -> u32 {
    30
}

const fn default_limit() -> usize {
    50
}

impl PipelineConfig {
    /// Load from a file, picking the format from its extension.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let config = match ext {
            "json" => serde_json::from_str(&contents)?,
            // YAML is a superset of JSON
            _ => serde_yaml::from_str(&contents)?,
        };
        Ok(config)
    }

    /// Load from a YAML string.
    ///
    /// # Errors
    /// Returns error if the YAML is malformed
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Apply environment overrides.
    ///
    /// | Env Var                 | Field                      |
    /// |-------------------------|----------------------------|
    /// | `BIGQUERY_PROJECT`      | `warehouse.project`        |
    /// | `BIGQUERY_DATASET`      | `warehouse.dataset`        |
    /// | `BIGQUERY_LOCATION`     | `warehouse.location`       |
    /// | `BIGQUERY_ACCESS_TOKEN` | `warehouse.access_token`   |
    /// | `PROPENSITY_MODEL`      | `tables.model_name`        |
    /// | `PROPENSITY_LIMIT`      | `scoring.limit`            |
    ///
    /// # Errors
    /// Returns `InvalidConfig` if `PROPENSITY_LIMIT` is not an integer
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (the environment in production).
    ///
    /// # Errors
    /// Returns `InvalidConfig` if `PROPENSITY_LIMIT` is not an integer
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(project) = lookup("BIGQUERY_PROJECT") {
            self.warehouse.project = project;
        }
        if let Some(dataset) = lookup("BIGQUERY_DATASET") {
            self.warehouse.dataset = dataset;
        }
        if let Some(location) = lookup("BIGQUERY_LOCATION") {
            self.warehouse.location = Some(location);
        }
        if let Some(token) = lookup("BIGQUERY_ACCESS_TOKEN") {
            self.warehouse.access_token = Some(token);
        }
        if let Some(model) = lookup("PROPENSITY_MODEL") {
            self.tables.model_name = model;
        }
        if let Some(limit) = lookup("PROPENSITY_LIMIT") {
            self.scoring.limit = limit.trim().parse().map_err(|_| {
                Error::InvalidConfig(format!("PROPENSITY_LIMIT must be an integer, got {limit:?}"))
            })?;
        }
        Ok(())
    }

    /// Reject configurations the templates cannot render safely.
    ///
    /// # Errors
    /// Returns `InvalidConfig` or `InvalidIdentifier` naming the first
    /// offending field
    pub fn validate(&self) -> Result<()> {
        if self.warehouse.project.is_empty() {
            return Err(Error::InvalidConfig(
                "warehouse.project is required (or set BIGQUERY_PROJECT)".to_string(),
            ));
        }
        validate_project_id(&self.warehouse.project)?;
        validate_identifier(&self.warehouse.dataset)?;
        validate_identifier(&self.tables.training_table)?;
        validate_identifier(&self.tables.clinics_table)?;
        validate_identifier(&self.tables.model_name)?;
        validate_identifier(&self.model.model_type)?;
        validate_column(&self.model.label_column)?;

        if self.model.features.is_empty() {
            return Err(Error::InvalidConfig(
                "model.features must name at least one column".to_string(),
            ));
        }
        for feature in &self.model.features {
            validate_column(feature)?;
        }
        if self.model.max_iterations == 0 {
            return Err(Error::InvalidConfig(
                "model.max_iterations must be positive".to_string(),
            ));
        }

        self.scoring.thresholds.validate()?;
        if self.scoring.limit == 0 {
            return Err(Error::InvalidConfig(
                "scoring.limit must be positive".to_string(),
            ));
        }
        if self.scoring.lookback_days == 0 {
            return Err(Error::InvalidConfig(
                "scoring.lookback_days must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.warehouse.project = "warp-486714".to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.tables.model_name, "clinic_propensity_model");
        assert_eq!(config.model.features.len(), 14);
        assert_eq!(config.scoring.limit, 50);
        assert_eq!(config.scoring.lookback_days, 30);
        assert!((config.scoring.thresholds.hot - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_from_yaml_partial() {
        let config = PipelineConfig::from_yaml(
            r"
warehouse:
  project: acme-prod
  dataset: leads
scoring:
  limit: 10
  thresholds:
    hot: 0.8
    warm: 0.5
",
        )
        .unwrap();
        assert_eq!(config.warehouse.project, "acme-prod");
        assert_eq!(config.warehouse.dataset, "leads");
        assert_eq!(config.scoring.limit, 10);
        assert!((config.scoring.thresholds.warm - 0.5).abs() < f64::EPSILON);
        // untouched sections keep defaults
        assert_eq!(config.tables.clinics_table, "clinics");
        assert_eq!(config.scoring.lookback_days, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("BIGQUERY_PROJECT", "other-project"),
            ("BIGQUERY_ACCESS_TOKEN", "ya29.token"),
            ("PROPENSITY_LIMIT", "25"),
        ]
        .into_iter()
        .collect();

        let mut config = valid();
        config
            .apply_overrides(|k| env.get(k).map(ToString::to_string))
            .unwrap();
        assert_eq!(config.warehouse.project, "other-project");
        assert_eq!(config.warehouse.access_token.as_deref(), Some("ya29.token"));
        assert_eq!(config.scoring.limit, 25);
    }

    #[test]
    fn test_override_bad_limit() {
        let mut config = valid();
        let result = config.apply_overrides(|k| (k == "PROPENSITY_LIMIT").then(|| "lots".to_string()));
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_access_token_not_serialized() {
        let mut config = valid();
        config.warehouse.access_token = Some("secret".to_string());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_validate_rejects() {
        assert!(PipelineConfig::default().validate().is_err());

        let mut config = valid();
        config.tables.clinics_table = "clinics; DROP TABLE x".to_string();
        assert!(matches!(config.validate(), Err(Error::InvalidIdentifier(_))));

        let mut config = valid();
        config.model.features.clear();
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = valid();
        config.scoring.limit = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.scoring.thresholds = TierThresholds { hot: 0.2, warm: 0.6 };
        assert!(config.validate().is_err());
    }
}
