//! Clinic records and report rows

use crate::tier::{safe_ratio, PropensityTier};
use crate::warehouse::ResultSet;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A lead as stored in the clinics table.
///
/// The three `propensity_*`/`last_scored_at` fields are outputs written by
/// the scoring statement; everything else is input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicRecord {
    /// Primary key
    pub clinic_id: String,
    /// Display name
    pub name: String,
    /// City
    pub city: String,
    /// State or region code
    pub state: String,
    /// Contact phone
    pub phone: Option<String>,
    /// Contact email
    pub email: Option<String>,
    /// Clinic category (`type` column)
    #[serde(rename = "type")]
    pub clinic_type: String,
    /// Average review rating
    pub rating: f64,
    /// Number of reviews
    pub review_count: i64,
    /// Affluence of the surrounding market
    pub affluence_score: f64,
    /// Median household income of the market
    pub median_income: f64,
    /// Population of the market
    pub market_population: i64,
    /// Services offered
    pub services: Vec<String>,
    /// Contact attempts so far
    pub outreach_count: i64,
    /// Responses to outreach
    pub response_count: i64,
    /// Calls placed
    pub calls_count: i64,
    /// Emails sent
    pub emails_sent: i64,
    /// Emails opened
    pub emails_opened: i64,
    /// Already a customer
    pub converted: bool,
    /// Most recent contact attempt
    pub last_outreach_date: Option<DateTime<Utc>>,
    /// Predicted conversion probability
    pub propensity_score: Option<f64>,
    /// Bucket of `propensity_score`
    pub propensity_tier: Option<PropensityTier>,
    /// When the scorer last wrote this row
    pub last_scored_at: Option<DateTime<Utc>>,
}

impl ClinicRecord {
    /// Unscored, never-contacted clinic with zeroed features
    #[must_use]
    pub fn new(clinic_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            clinic_id: clinic_id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// `ARRAY_LENGTH(services)`
    #[must_use]
    pub fn service_count(&self) -> i64 {
        i64::try_from(self.services.len()).unwrap_or(i64::MAX)
    }

    /// Opened / sent, 0 when nothing was sent
    #[must_use]
    pub fn email_open_rate(&self) -> f64 {
        safe_ratio(self.emails_opened, self.emails_sent)
    }

    /// Responses / outreach attempts, 0 when never contacted
    #[must_use]
    pub fn response_rate(&self) -> f64 {
        safe_ratio(self.response_count, self.outreach_count)
    }
}

/// One row of the top-prospects report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prospect {
    /// Primary key
    pub clinic_id: String,
    /// Display name
    pub name: String,
    /// City
    pub city: String,
    /// State or region code
    pub state: String,
    /// Contact phone, when on file
    pub phone: Option<String>,
    /// Contact email, when on file
    pub email: Option<String>,
    /// Predicted conversion probability
    pub propensity_score: f64,
    /// Tier written by the scorer
    pub propensity_tier: PropensityTier,
    /// Affluence of the surrounding market
    pub affluence_score: Option<f64>,
    /// Services offered
    pub services: Vec<String>,
}

impl Prospect {
    /// Project a scored clinic onto the report columns
    #[must_use]
    pub fn from_clinic(clinic: &ClinicRecord, score: f64, tier: PropensityTier) -> Self {
        Self {
            clinic_id: clinic.clinic_id.clone(),
            name: clinic.name.clone(),
            city: clinic.city.clone(),
            state: clinic.state.clone(),
            phone: clinic.phone.clone(),
            email: clinic.email.clone(),
            propensity_score: score,
            propensity_tier: tier,
            affluence_score: Some(clinic.affluence_score),
            services: clinic.services.clone(),
        }
    }

    /// Decode row `row` of a report result set.
    ///
    /// # Errors
    /// Returns error if a required column is missing, null, or mistyped, or
    /// the tier label is unknown
    pub fn from_row(rs: &ResultSet, row: usize) -> Result<Self> {
        let required = |column: &str| Error::MissingColumn(format!("{column} (null in row {row})"));
        let text = |column: &str| -> Result<String> {
            Ok(rs.str_value(row, column)?.unwrap_or_default().to_string())
        };
        let optional_text = |column: &str| -> Result<Option<String>> {
            Ok(rs
                .str_value(row, column)?
                .filter(|s| !s.is_empty())
                .map(ToString::to_string))
        };

        let clinic_id = rs
            .str_value(row, "clinic_id")?
            .ok_or_else(|| required("clinic_id"))?
            .to_string();
        let propensity_score = rs
            .f64_value(row, "propensity_score")?
            .ok_or_else(|| required("propensity_score"))?;
        let propensity_tier = rs
            .str_value(row, "propensity_tier")?
            .ok_or_else(|| required("propensity_tier"))?
            .parse::<PropensityTier>()?;

        let affluence_score = if rs.batch().column_by_name("affluence_score").is_some() {
            rs.f64_value(row, "affluence_score")?
        } else {
            None
        };
        let services = if rs.batch().column_by_name("services").is_some() {
            split_services(rs.str_value(row, "services")?.unwrap_or_default())
        } else {
            Vec::new()
        };

        Ok(Self {
            clinic_id,
            name: text("name")?,
            city: text("city")?,
            state: text("state")?,
            phone: optional_text("phone")?,
            email: optional_text("email")?,
            propensity_score,
            propensity_tier,
            affluence_score,
            services,
        })
    }

    /// Decode every row of a report result set.
    ///
    /// # Errors
    /// Returns the first row decoding error
    pub fn from_result_set(rs: &ResultSet) -> Result<Vec<Self>> {
        (0..rs.num_rows()).map(|row| Self::from_row(rs, row)).collect()
    }
}

/// Separator used when a repeated column is flattened to one string
pub const LIST_SEPARATOR: &str = ", ";

fn split_services(joined: &str) -> Vec<String> {
    joined
        .split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}
