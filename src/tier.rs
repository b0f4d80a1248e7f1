//! Propensity tiers and zero-guarded ratios
//!
//! The warehouse computes both of these inside the scoring statement. The
//! Rust versions are the reference the SQL templates are rendered from, and
//! what the in-memory warehouse evaluates.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default lower bound of the hot tier
pub const DEFAULT_HOT_THRESHOLD: f64 = 0.7;

/// Default lower bound of the warm tier
pub const DEFAULT_WARM_THRESHOLD: f64 = 0.4;

/// Coarse bucket derived from a propensity score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropensityTier {
    /// Score at or above the hot threshold
    Hot,
    /// Score at or above the warm threshold, below hot
    Warm,
    /// Everything else
    Cold,
}

impl PropensityTier {
    /// Bucket a score. Each tier's lower bound is inclusive.
    ///
    /// # Example
    /// ```
    /// use lead_scorer::tier::{PropensityTier, TierThresholds};
    ///
    /// let t = TierThresholds::default();
    /// assert_eq!(PropensityTier::classify(0.7, &t), PropensityTier::Hot);
    /// assert_eq!(PropensityTier::classify(0.4, &t), PropensityTier::Warm);
    /// assert_eq!(PropensityTier::classify(0.39, &t), PropensityTier::Cold);
    /// ```
    #[must_use]
    pub fn classify(score: f64, thresholds: &TierThresholds) -> Self {
        if score >= thresholds.hot {
            Self::Hot
        } else if score >= thresholds.warm {
            Self::Warm
        } else {
            Self::Cold
        }
    }

    /// Lowercase label as stored in the `propensity_tier` column
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hot => "hot",
            Self::Warm => "warm",
            Self::Cold => "cold",
        }
    }

    /// Tiers the reporter surfaces
    #[must_use]
    pub const fn is_reportable(self) -> bool {
        matches!(self, Self::Hot | Self::Warm)
    }
}

impl fmt::Display for PropensityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropensityTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hot" => Ok(Self::Hot),
            "warm" => Ok(Self::Warm),
            "cold" => Ok(Self::Cold),
            other => Err(Error::InvalidTier(other.to_string())),
        }
    }
}

/// Lower bounds of the hot and warm tiers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    /// Minimum score for `hot`
    pub hot: f64,
    /// Minimum score for `warm`
    pub warm: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            hot: DEFAULT_HOT_THRESHOLD,
            warm: DEFAULT_WARM_THRESHOLD,
        }
    }
}

impl TierThresholds {
    /// Check `0 <= warm <= hot <= 1`
    ///
    /// # Errors
    /// Returns `InvalidConfig` when the bounds are out of order, out of
    /// range, or not finite
    pub fn validate(&self) -> Result<()> {
        let in_range = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
        if !in_range(self.hot) || !in_range(self.warm) {
            return Err(Error::InvalidConfig(format!(
                "tier thresholds must lie in [0, 1] (hot={}, warm={})",
                self.hot, self.warm
            )));
        }
        if self.warm > self.hot {
            return Err(Error::InvalidConfig(format!(
                "warm threshold {} exceeds hot threshold {}",
                self.warm, self.hot
            )));
        }
        Ok(())
    }
}

/// Divide, yielding 0 when the denominator is 0
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn safe_ratio(numerator: i64, denominator: i64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
