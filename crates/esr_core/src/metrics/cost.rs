use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::domain::Incident;
use crate::metrics::MetricGroup;

/// Period length assumed when no record carries a created timestamp.
pub const DEFAULT_PERIOD_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CostAvoidance {
    pub analyst_hours: i64,
    pub analyst_cost_equivalent: i64,
    pub coverage_cost_equivalent: i64,
    pub breach_exposure_avoided: i64,
    pub total_modeled: i64,
    pub coverage_hours: i64,
    pub cost_calculation_methodology: String,
}

impl MetricGroup for CostAvoidance {
    const NAME: &'static str = "cost_avoidance";
}

/// Inclusive day span between the earliest and latest created timestamp.
pub fn created_span_days(records: &[Incident]) -> Option<i64> {
    let mut dates = records.iter().filter_map(Incident::created);
    let first = dates.next()?;
    let (lo, hi) = dates.fold((first, first), |(lo, hi), dt| (lo.min(dt), hi.max(dt)));
    Some((hi - lo).whole_days() + 1)
}

pub fn cost_avoidance(records: &[Incident], config: &ClientConfig) -> CostAvoidance {
    let model = &config.cost_modeling;
    let total = records.len() as f64;

    let analyst_hours = (total * model.handling_hours_per_incident) as i64;
    let analyst_cost = analyst_hours * model.analyst_hourly_rate;

    let days = created_span_days(records).unwrap_or(DEFAULT_PERIOD_DAYS);
    let coverage_hours = days * 24;
    let coverage_cost = (coverage_hours as f64 * model.coverage_hourly_rate as f64
        / model.coverage_allocation_divisor) as i64;

    let true_positives = records.iter().filter(|r| r.is_true_positive()).count() as i64;
    let per_threat = (model.breach_cost_estimate as f64 * model.containment_value_fraction) as i64;
    let breach_exposure = true_positives * per_threat;

    CostAvoidance {
        analyst_hours,
        analyst_cost_equivalent: analyst_cost,
        coverage_cost_equivalent: coverage_cost,
        breach_exposure_avoided: breach_exposure,
        total_modeled: analyst_cost + coverage_cost + breach_exposure,
        coverage_hours,
        cost_calculation_methodology: format!(
            "{} analyst hours per incident at ${}/hour; {} coverage hours at ${}/hour allocated at 1/{}; {}% of a ${} average breach cost per true positive",
            model.handling_hours_per_incident,
            model.analyst_hourly_rate,
            coverage_hours,
            model.coverage_hourly_rate,
            model.coverage_allocation_divisor,
            model.containment_value_fraction * 100.0,
            model.breach_cost_estimate,
        ),
    }
}
