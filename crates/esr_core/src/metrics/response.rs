use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::domain::{Incident, Priority};
use crate::metrics::{mean_minutes, percent_of, percentile, round1, MetricGroup};
use crate::normalize::priority::parse_priority_level;
use crate::normalize::timestamps::duration_minutes;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseMetrics {
    pub mttr_minutes: i64,
    pub mttd_minutes: i64,
    pub p90_minutes: i64,
    pub critical_high_mttr: i64,
    pub medium_low_mttr: i64,
    /// Positive when faster than the industry benchmark.
    pub response_advantage_percent: f64,
    pub sla_compliance_rate: f64,
    pub avg_response_time: i64,
    pub fastest_response_time: i64,
    pub industry_median_minutes: i64,
}

impl MetricGroup for ResponseMetrics {
    const NAME: &'static str = "response";
}

fn ttr_minutes(inc: &Incident) -> Option<i64> {
    inc.soc_ttr.map(duration_minutes)
}

/// `(benchmark - actual) / benchmark * 100`; 0 for a non-positive benchmark.
pub fn advantage_percent(benchmark: f64, actual: f64) -> f64 {
    if benchmark > 0.0 {
        (benchmark - actual) / benchmark * 100.0
    } else {
        0.0
    }
}

pub fn response_metrics(records: &[Incident], config: &ClientConfig) -> ResponseMetrics {
    let mut all_ttr = Vec::new();
    let mut all_ttd = Vec::new();
    let mut critical_high = Vec::new();
    let mut medium_low = Vec::new();
    let mut sla_met = 0usize;
    let mut sla_measured = 0usize;

    for inc in records {
        let priority = parse_priority_level(inc.current_priority.as_deref());
        if let Some(minutes) = ttr_minutes(inc) {
            all_ttr.push(minutes);
            match priority {
                Some(p) if p.is_critical_or_high() => critical_high.push(minutes),
                Some(p) if p.is_medium_or_low() => medium_low.push(minutes),
                _ => {}
            }
            if let Some(p) = priority {
                sla_measured += 1;
                if minutes <= config.sla_target(p) {
                    sla_met += 1;
                }
            }
        }
        if let Some(d) = inc.soc_ttd {
            all_ttd.push(duration_minutes(d));
        }
    }

    let mttr = mean_minutes(&all_ttr);
    let benchmark = config.industry_benchmarks.mttr_minutes;
    ResponseMetrics {
        mttr_minutes: mttr,
        mttd_minutes: mean_minutes(&all_ttd),
        p90_minutes: percentile(&all_ttr, 90),
        critical_high_mttr: mean_minutes(&critical_high),
        medium_low_mttr: mean_minutes(&medium_low),
        response_advantage_percent: round1(advantage_percent(benchmark as f64, mttr as f64)),
        sla_compliance_rate: round1(percent_of(sla_met, sla_measured)),
        avg_response_time: mttr,
        fastest_response_time: all_ttr.iter().copied().min().unwrap_or(0),
        industry_median_minutes: benchmark,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriorityResponse {
    pub priority: Priority,
    pub count: usize,
    pub avg_response: i64,
    pub target: i64,
    /// Whether the average response met the target (not every record).
    pub met_sla: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseByPriority {
    pub response_by_priority: Vec<PriorityResponse>,
}

impl MetricGroup for ResponseByPriority {
    const NAME: &'static str = "response_by_priority";
}

/// Per-priority response summary for Critical, High, Medium and Low, skipping levels
/// without any measured response.
pub fn response_by_priority(records: &[Incident], config: &ClientConfig) -> ResponseByPriority {
    let rows = Priority::SLA_LEVELS
        .iter()
        .filter_map(|level| {
            let values = records
                .iter()
                .filter(|inc| parse_priority_level(inc.current_priority.as_deref()) == Some(*level))
                .filter_map(ttr_minutes)
                .collect::<Vec<_>>();
            if values.is_empty() {
                return None;
            }
            let avg = mean_minutes(&values);
            let target = config.sla_target(*level);
            Some(PriorityResponse {
                priority: *level,
                count: values.len(),
                avg_response: avg,
                target,
                met_sla: avg <= target,
            })
        })
        .collect();
    ResponseByPriority {
        response_by_priority: rows,
    }
}
