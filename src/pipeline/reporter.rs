//! Reporter: print the ranked list of prospects worth calling

use super::StepOutput;
use crate::clinic::Prospect;
use crate::config::PipelineConfig;
use crate::sql::{self, OrderDirection, QueryInspector, Statement};
use crate::warehouse::Warehouse;
use crate::{Error, Result};
use std::io::Write;

/// Query, print and return the top `limit` prospects.
///
/// # Errors
/// Returns `ParseError` if the rendered query does not sort by score
/// descending with the requested limit, a decoding error for malformed
/// rows, or the warehouse error unchanged
pub async fn report<W, O>(
    warehouse: &W,
    config: &PipelineConfig,
    limit: usize,
    out: &mut O,
) -> Result<StepOutput<Vec<Prospect>>>
where
    W: Warehouse,
    O: Write,
{
    writeln!(out, "\n🔥 Top {limit} prospects:")?;

    let statement = sql::top_prospects(config, limit);
    check_report_query(&statement, limit)?;
    let result = warehouse.execute(&statement).await?;
    let prospects = Prospect::from_result_set(&result)?;

    if prospects.is_empty() {
        writeln!(out, "  (no prospects)")?;
    }
    for (i, prospect) in prospects.iter().enumerate() {
        out.write_all(format_prospect(i + 1, prospect).as_bytes())?;
    }
    Ok(StepOutput::new(prospects, &result))
}

/// Refuse to submit a report query whose ranking is not what the printout
/// claims.
fn check_report_query(statement: &Statement, limit: usize) -> Result<()> {
    let plan = QueryInspector::new().inspect(&statement.sql)?;
    let ranked = matches!(
        plan.order_by.first(),
        Some((column, OrderDirection::Desc)) if column == "propensity_score"
    );
    if !ranked || plan.limit != Some(limit) {
        return Err(Error::ParseError(format!(
            "report query must order by propensity_score DESC with LIMIT {limit} (got order {:?}, limit {:?})",
            plan.order_by, plan.limit
        )));
    }
    Ok(())
}

/// One ranked entry: headline plus optional phone and email lines
#[must_use]
pub fn format_prospect(rank: usize, prospect: &Prospect) -> String {
    let mut text = format!(
        "{rank}. {} ({}, {}) - Score: {:.2} ({})\n",
        prospect.name,
        prospect.city,
        prospect.state,
        prospect.propensity_score,
        prospect.propensity_tier
    );
    if let Some(phone) = &prospect.phone {
        text.push_str(&format!("   📞 {phone}\n"));
    }
    if let Some(email) = &prospect.email {
        text.push_str(&format!("   📧 {email}\n"));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::PropensityTier;

    fn prospect() -> Prospect {
        Prospect {
            clinic_id: "c-1".into(),
            name: "Glow Med Spa".into(),
            city: "Austin".into(),
            state: "TX".into(),
            phone: Some("+1 512 555 0100".into()),
            email: None,
            propensity_score: 0.876,
            propensity_tier: PropensityTier::Hot,
            affluence_score: Some(71.0),
            services: vec![],
        }
    }

    #[test]
    fn test_format_prospect() {
        assert_eq!(
            format_prospect(1, &prospect()),
            "1. Glow Med Spa (Austin, TX) - Score: 0.88 (hot)\n   📞 +1 512 555 0100\n"
        );
    }

    #[test]
    fn test_format_prospect_with_email() {
        let p = Prospect {
            phone: None,
            email: Some("hello@glow.example".into()),
            ..prospect()
        };
        assert_eq!(
            format_prospect(12, &p),
            "12. Glow Med Spa (Austin, TX) - Score: 0.88 (hot)\n   📧 hello@glow.example\n"
        );
    }

    #[test]
    fn test_report_query_check_accepts_rendered_sql() {
        let mut config = PipelineConfig::default();
        config.warehouse.project = "p".into();
        assert!(check_report_query(&sql::top_prospects(&config, 50), 50).is_ok());
    }

    #[test]
    fn test_report_query_check_rejects_wrong_order() {
        let statement = Statement {
            kind: sql::StatementKind::TopProspects {
                limit: 5,
                lookback_days: 30,
            },
            sql: "SELECT name FROM clinics ORDER BY propensity_score ASC LIMIT 5".into(),
        };
        assert!(matches!(
            check_report_query(&statement, 5),
            Err(Error::ParseError(_))
        ));
    }

    #[test]
    fn test_report_query_check_rejects_wrong_limit() {
        let statement = Statement {
            kind: sql::StatementKind::TopProspects {
                limit: 5,
                lookback_days: 30,
            },
            sql: "SELECT name FROM clinics ORDER BY propensity_score DESC LIMIT 500".into(),
        };
        assert!(check_report_query(&statement, 5).is_err());
    }
}
