use serde::{Deserialize, Serialize};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::Date;

use crate::config::ClientConfig;
use crate::domain::Incident;
use crate::error::AppError;
use crate::metrics::cost::created_span_days;
use crate::metrics::volume::VolumeMetrics;
use crate::metrics::{round1, MetricGroup};

/// Long date used on the title slide, e.g. `August 01, 2025`.
pub const REPORT_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[month repr:long] [day], [year]");

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportHeader {
    pub client_name: String,
    pub tier: String,
    pub period_start: String,
    pub period_end: String,
    pub period_days: i64,
    pub report_date: String,
    pub incidents_per_day: f64,
    pub client_touch_decisions: usize,
    pub threats_blocked: usize,
    pub zero_breaches: bool,
    pub mttr_industry_benchmark: i64,
    pub mttd_industry_benchmark: i64,
}

impl MetricGroup for ReportHeader {
    const NAME: &'static str = "header";
}

pub fn format_report_date(date: Date) -> Result<String, AppError> {
    date.format(REPORT_DATE_FORMAT).map_err(|e| {
        AppError::new("METRICS_DATE_FORMAT_FAILED", "Failed to format report date")
            .with_details(format!("date={date}; err={e}"))
    })
}

/// Title-slide fields for the current period.
///
/// Period bounds come from created timestamps; configured overrides win. With no created
/// timestamps the bounds collapse to `report_date` and the period is one day long.
pub fn report_header(
    records: &[Incident],
    client_name: &str,
    config: &ClientConfig,
    report_date: Date,
    volume: &VolumeMetrics,
) -> Result<ReportHeader, AppError> {
    let mut created = records.iter().filter_map(Incident::created);
    let (start, end) = match created.next() {
        Some(first) => {
            let (lo, hi) = created.fold((first, first), |(lo, hi), dt| (lo.min(dt), hi.max(dt)));
            (lo.date(), hi.date())
        }
        None => (report_date, report_date),
    };
    let period_days = created_span_days(records).unwrap_or(1);

    let period_start = match &config.period_start {
        Some(s) => s.clone(),
        None => format_report_date(start)?,
    };
    let period_end = match &config.period_end {
        Some(s) => s.clone(),
        None => format_report_date(end)?,
    };

    Ok(ReportHeader {
        client_name: config
            .client_name_override
            .clone()
            .unwrap_or_else(|| client_name.to_string()),
        tier: config.tier.clone(),
        period_start,
        period_end,
        period_days,
        report_date: format_report_date(report_date)?,
        incidents_per_day: round1(records.len() as f64 / period_days as f64),
        client_touch_decisions: volume
            .incidents_escalated
            .saturating_sub(volume.closed_end_to_end),
        threats_blocked: volume.true_threats_contained,
        zero_breaches: true,
        mttr_industry_benchmark: config.industry_benchmarks.mttr_minutes,
        mttd_industry_benchmark: config.industry_benchmarks.mttd_minutes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::volume::volume_metrics;
    use time::macros::{date, datetime};

    fn created(dt: time::PrimitiveDateTime, status: &str) -> Incident {
        Incident {
            created_utc: Some(dt),
            current_status: Some(status.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn period_from_created_timestamps() {
        let records = vec![
            created(datetime!(2025-08-01 09:00), "Closed"),
            created(datetime!(2025-08-03 22:00), "Open"),
            created(datetime!(2025-08-10 01:00), "Open"),
        ];
        let config = ClientConfig::default();
        let volume = volume_metrics(&records, &config);
        let h = report_header(&records, "Acme", &config, date!(2025 - 09 - 02), &volume).unwrap();
        assert_eq!(h.period_start, "August 01, 2025");
        assert_eq!(h.period_end, "August 10, 2025");
        assert_eq!(h.period_days, 9);
        assert_eq!(h.report_date, "September 02, 2025");
        assert_eq!(h.incidents_per_day, 0.3);
        assert_eq!(h.client_touch_decisions, 2);
        assert_eq!(h.client_name, "Acme");
        assert!(h.zero_breaches);
    }

    #[test]
    fn overrides_and_fallbacks() {
        let mut config = ClientConfig::default();
        config.client_name_override = Some("Acme Corp".into());
        config.period_start = Some("Q3 start".into());
        let records = vec![Incident::default(), Incident::default()];
        let volume = volume_metrics(&records, &config);
        let h = report_header(&records, "acme", &config, date!(2025 - 07 - 04), &volume).unwrap();
        assert_eq!(h.client_name, "Acme Corp");
        assert_eq!(h.period_start, "Q3 start");
        assert_eq!(h.period_end, "July 04, 2025");
        assert_eq!(h.period_days, 1);
        assert_eq!(h.incidents_per_day, 2.0);
        assert_eq!(h.mttr_industry_benchmark, 192);
    }
}
