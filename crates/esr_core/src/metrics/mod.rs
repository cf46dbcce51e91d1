pub mod after_hours;
pub mod comparison;
pub mod cost;
pub mod header;
pub mod quality;
pub mod response;
pub mod result;
pub mod trend;
pub mod volume;

use time::Date;
use tracing::debug;

use crate::analytics::{detection_sources, mitre_breakdown, severity_flows};
use crate::config::ClientConfig;
use crate::domain::Incident;
use crate::error::AppError;

pub use result::{MetricGroup, MetricsResult, Scalar};

/// Round to one decimal place, ties to even.
pub fn round1(x: f64) -> f64 {
    (x * 10.0).round_ties_even() / 10.0
}

/// Round to a whole number, ties to even.
pub fn round0(x: f64) -> i64 {
    x.round_ties_even() as i64
}

/// `part / whole * 100`, or 0 when `whole` is 0.
pub fn percent_of(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Truncated integer mean; 0 for an empty sample.
pub fn mean_minutes(values: &[i64]) -> i64 {
    if values.is_empty() {
        return 0;
    }
    values.iter().sum::<i64>() / values.len() as i64
}

/// Nearest-rank percentile on the ascending sample: `index = floor(n * pct / 100)`,
/// clamped to the last element. 0 for an empty sample.
pub fn percentile(values: &[i64], pct: u32) -> i64 {
    if values.is_empty() {
        return 0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let idx = (sorted.len() * pct as usize / 100).min(sorted.len() - 1);
    sorted[idx]
}

/// Compute every metric group for the current (last) period and merge them.
///
/// Trend uses all periods; everything else folds over the current period only.
pub fn compute_all_metrics(
    periods: &[Vec<Incident>],
    client_name: &str,
    config: &ClientConfig,
    report_date: Date,
) -> Result<MetricsResult, AppError> {
    let current: &[Incident] = periods.last().map(Vec::as_slice).unwrap_or(&[]);

    let volume = volume::volume_metrics(current, config);
    let response = response::response_metrics(current, config);
    let by_priority = response::response_by_priority(current, config);
    let sources = detection_sources(current);
    let mitre = mitre_breakdown(current);
    let flows = severity_flows(current);
    let after_hours = after_hours::after_hours_metrics(current, config);
    let quality = quality::detection_quality(current, config);
    let collaboration = quality::collaboration_metrics(current, config);
    let trends = trend::trend_metrics(periods);
    let header = header::report_header(current, client_name, config, report_date, &volume)?;
    let cost = cost::cost_avoidance(current, config);
    let industry = comparison::industry_comparison(
        response.mttr_minutes,
        response.mttd_minutes,
        header.incidents_per_day,
        config,
    );

    let mut result = MetricsResult::new();
    result.merge_group(&header)?;
    result.merge_group(&volume)?;
    result.merge_group(&response)?;
    result.merge_group(&by_priority)?;
    result.merge_group(&sources)?;
    result.merge_group(&mitre)?;
    result.merge_group(&flows)?;
    result.merge_group(&after_hours)?;
    result.merge_group(&quality)?;
    result.merge_group(&collaboration)?;
    result.merge_group(&cost)?;
    result.merge_group(&industry)?;
    result.merge_group(&trends)?;

    debug!(
        client = client_name,
        periods = periods.len(),
        incidents = current.len(),
        keys = result.len(),
        "computed metrics"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_uses_floor_index() {
        let values = [100, 10, 90, 20, 80, 30, 70, 40, 60, 50];
        // floor(10 * 0.9) = 9 -> last element of the sorted sample.
        assert_eq!(percentile(&values, 90), 100);
        assert_eq!(percentile(&[5], 90), 5);
        assert_eq!(percentile(&[], 90), 0);
        assert_eq!(percentile(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20], 90), 19);
    }

    #[test]
    fn means_truncate_and_handle_empty() {
        assert_eq!(mean_minutes(&[]), 0);
        assert_eq!(mean_minutes(&[10, 11]), 10);
        assert_eq!(mean_minutes(&[1, 2, 2]), 1);
    }

    #[test]
    fn rounding_is_ties_to_even() {
        assert_eq!(round1(100.0 / 3.0), 33.3);
        assert_eq!(round1(2.0 / 3.0 * 100.0), 66.7);
        assert_eq!(round0(0.5), 0);
        assert_eq!(round0(1.5), 2);
        assert_eq!(round0(2.5), 2);
        assert_eq!(percent_of(1, 0), 0.0);
    }
}
