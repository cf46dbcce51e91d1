use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::metrics::response::advantage_percent;
use crate::metrics::{round0, round1, MetricGroup, Scalar};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonRow {
    pub metric: String,
    pub yours: Scalar,
    pub industry: Scalar,
    pub difference_percent: f64,
    pub direction: String,
    /// Renderer-ready label, e.g. `"34% Better"`.
    pub difference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndustryComparison {
    pub industry_comparison: Vec<ComparisonRow>,
}

impl MetricGroup for IndustryComparison {
    const NAME: &'static str = "industry_comparison";
}

fn row(metric: &str, yours: Scalar, industry: Scalar, worse_label: &str) -> ComparisonRow {
    let (actual, benchmark) = (as_f64(yours), as_f64(industry));
    let diff = advantage_percent(benchmark, actual);
    let direction = if diff > 0.0 { "Better" } else { worse_label };
    ComparisonRow {
        metric: metric.to_string(),
        yours,
        industry,
        difference_percent: round1(diff),
        direction: direction.to_string(),
        difference: format!("{}% {direction}", round0(diff).abs()),
    }
}

fn as_f64(s: Scalar) -> f64 {
    match s {
        Scalar::Int(i) => i as f64,
        Scalar::Float(f) => f,
    }
}

/// Benchmark rows for MTTR, MTTD and incidents/day, each only when the actual value is
/// positive. Empty when the client has no industry benchmarks.
pub fn industry_comparison(
    mttr_minutes: i64,
    mttd_minutes: i64,
    incidents_per_day: f64,
    config: &ClientConfig,
) -> IndustryComparison {
    let mut rows = Vec::new();
    if config.industry_benchmarks_available {
        let b = &config.industry_benchmarks;
        if mttr_minutes > 0 {
            rows.push(row(
                "MTTR",
                Scalar::Int(mttr_minutes),
                Scalar::Int(b.mttr_minutes),
                "Slower",
            ));
        }
        if mttd_minutes > 0 {
            rows.push(row(
                "MTTD",
                Scalar::Int(mttd_minutes),
                Scalar::Int(b.mttd_minutes),
                "Slower",
            ));
        }
        if incidents_per_day > 0.0 {
            rows.push(row(
                "Incidents/Day",
                Scalar::Float(incidents_per_day),
                Scalar::Float(b.incidents_per_day),
                "Higher",
            ));
        }
    }
    IndustryComparison {
        industry_comparison: rows,
    }
}
