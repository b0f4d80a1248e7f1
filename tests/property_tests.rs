//! Property-based tests for lead-scorer
//!
//! - Tier classification is total and monotone in the score
//! - Ratios never divide by zero
//! - Reports never exceed the limit and are ranked by score
//! - Run with ProptestConfig::with_cases(100)

use chrono::{Duration, Utc};
use lead_scorer::clinic::ClinicRecord;
use lead_scorer::config::PipelineConfig;
use lead_scorer::pipeline::Pipeline;
use lead_scorer::tier::{safe_ratio, PropensityTier, TierThresholds};
use lead_scorer::warehouse::MemoryWarehouse;
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

/// Clinic with a random score (carried in `affluence_score`) and history
fn arb_clinic(index: usize) -> impl Strategy<Value = ClinicRecord> {
    (
        0.0f64..=1.0,
        any::<bool>(),
        proptest::option::of(0i64..120),
    )
        .prop_map(move |(score, converted, days_ago)| ClinicRecord {
            affluence_score: score,
            converted,
            last_outreach_date: days_ago.map(|d| Utc::now() - Duration::days(d)),
            ..ClinicRecord::new(format!("c-{index:03}"), format!("Clinic {index}"))
        })
}

fn arb_clinics() -> impl Strategy<Value = Vec<ClinicRecord>> {
    (0usize..40).prop_flat_map(|n| (0..n).map(arb_clinic).collect::<Vec<_>>())
}

fn tier_rank(tier: PropensityTier) -> u8 {
    match tier {
        PropensityTier::Cold => 0,
        PropensityTier::Warm => 1,
        PropensityTier::Hot => 2,
    }
}

// ============================================================================
// Tier and ratio properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Default thresholds split [0, 1] at exactly 0.4 and 0.7
    #[test]
    fn prop_tier_matches_thresholds(score in 0.0f64..=1.0) {
        let tier = PropensityTier::classify(score, &TierThresholds::default());
        let expected = if score >= 0.7 {
            PropensityTier::Hot
        } else if score >= 0.4 {
            PropensityTier::Warm
        } else {
            PropensityTier::Cold
        };
        prop_assert_eq!(tier, expected);
    }

    /// A higher score never lands in a lower tier
    #[test]
    fn prop_tier_monotone(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
        let t = TierThresholds::default();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(
            tier_rank(PropensityTier::classify(lo, &t)) <= tier_rank(PropensityTier::classify(hi, &t))
        );
    }

    /// Tier labels survive display and parse
    #[test]
    fn prop_tier_label_parses_back(score in 0.0f64..=1.0) {
        let tier = PropensityTier::classify(score, &TierThresholds::default());
        prop_assert_eq!(tier.to_string().parse::<PropensityTier>().unwrap(), tier);
    }

    /// Zero denominators yield 0, everything else a finite quotient
    #[test]
    fn prop_safe_ratio_finite(num in 0i64..10_000, den in 0i64..10_000) {
        let ratio = safe_ratio(num, den);
        prop_assert!(ratio.is_finite());
        if den == 0 {
            prop_assert_eq!(ratio, 0.0);
        }
    }

    /// Rates of counts where opened <= sent stay within [0, 1]
    #[test]
    fn prop_open_rate_bounded(sent in 0i64..500, frac in 0.0f64..=1.0) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        let opened = (sent as f64 * frac).floor() as i64;
        let clinic = ClinicRecord {
            emails_sent: sent,
            emails_opened: opened,
            ..ClinicRecord::new("c", "C")
        };
        prop_assert!((0.0..=1.0).contains(&clinic.email_open_rate()));
    }
}

// ============================================================================
// Report properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// The report holds at most `limit` eligible prospects, best first
    #[test]
    fn prop_report_bounded_and_ranked(clinics in arb_clinics(), limit in 1usize..60) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let warehouse = MemoryWarehouse::new().with_model(|c| c.affluence_score);
        for clinic in &clinics {
            warehouse.insert_clinic(clinic.clone());
        }
        let mut config = PipelineConfig::default();
        config.warehouse.project = "prop-test".to_string();

        let mut pipeline = Pipeline::new(warehouse, config, Vec::new());
        let prospects = runtime.block_on(pipeline.run(limit)).unwrap();

        prop_assert!(prospects.len() <= limit);
        for pair in prospects.windows(2) {
            prop_assert!(pair[0].propensity_score >= pair[1].propensity_score);
        }

        let cutoff = Utc::now() - Duration::days(30);
        for prospect in &prospects {
            prop_assert!(prospect.propensity_tier.is_reportable());
            let source = clinics.iter().find(|c| c.clinic_id == prospect.clinic_id).unwrap();
            prop_assert!(!source.converted);
            prop_assert!(source.last_outreach_date.map_or(true, |d| d < cutoff));
        }

        let eligible = clinics
            .iter()
            .filter(|c| {
                !c.converted
                    && c.affluence_score >= 0.4
                    && c.last_outreach_date.map_or(true, |d| d < cutoff)
            })
            .count();
        prop_assert_eq!(prospects.len(), eligible.min(limit));
    }
}
