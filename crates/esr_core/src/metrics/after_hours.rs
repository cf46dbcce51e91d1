use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use crate::config::{BusinessHours, ClientConfig};
use crate::domain::{Incident, Priority};
use crate::metrics::{percent_of, round1, MetricGroup};
use crate::normalize::priority::parse_priority_level;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageBucket {
    BusinessHours,
    Weeknight,
    Weekend,
}

pub fn is_weekend(dt: PrimitiveDateTime) -> bool {
    dt.weekday().number_days_from_monday() >= 5
}

/// Weekends always count as after-hours, regardless of the clock.
pub fn classify(dt: PrimitiveDateTime, hours: &BusinessHours) -> CoverageBucket {
    if is_weekend(dt) {
        CoverageBucket::Weekend
    } else if hours.contains_hour(dt.hour()) {
        CoverageBucket::BusinessHours
    } else {
        CoverageBucket::Weeknight
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AfterHoursMetrics {
    pub after_hours_escalations: usize,
    pub after_hours_weeknight: usize,
    pub after_hours_weekend: usize,
    pub after_hours_critical: usize,
    pub after_hours_high: usize,
    pub after_hours_medium: usize,
    pub after_hours_low: usize,
    pub after_hours_informational: usize,
    /// Records with no usable timestamp; in none of the buckets.
    pub after_hours_untimed: usize,
    pub business_hours_percent: f64,
    /// Weeknight share only; weekends are reported separately.
    pub after_hours_percent: f64,
    pub weekend_percent: f64,
    pub business_hours_definition: String,
    /// Renderer switch for the after-hours slide.
    pub after_hours_available: bool,
}

impl MetricGroup for AfterHoursMetrics {
    const NAME: &'static str = "after_hours";
}

pub fn after_hours_metrics(records: &[Incident], config: &ClientConfig) -> AfterHoursMetrics {
    let total = records.len();
    let (mut business, mut weeknight, mut weekend, mut untimed) = (0, 0, 0, 0);
    let mut by_priority = [0usize; 5];

    for inc in records {
        let Some(dt) = inc.operative_local_time() else {
            untimed += 1;
            continue;
        };
        match classify(dt, &config.business_hours) {
            CoverageBucket::BusinessHours => {
                business += 1;
                continue;
            }
            CoverageBucket::Weeknight => weeknight += 1,
            CoverageBucket::Weekend => weekend += 1,
        }
        if let Some(p) = parse_priority_level(inc.current_priority.as_deref()) {
            by_priority[priority_slot(p)] += 1;
        }
    }

    AfterHoursMetrics {
        after_hours_escalations: weeknight + weekend,
        after_hours_weeknight: weeknight,
        after_hours_weekend: weekend,
        after_hours_critical: by_priority[priority_slot(Priority::Critical)],
        after_hours_high: by_priority[priority_slot(Priority::High)],
        after_hours_medium: by_priority[priority_slot(Priority::Medium)],
        after_hours_low: by_priority[priority_slot(Priority::Low)],
        after_hours_informational: by_priority[priority_slot(Priority::Informational)],
        after_hours_untimed: untimed,
        business_hours_percent: round1(percent_of(business, total)),
        after_hours_percent: round1(percent_of(weeknight, total)),
        weekend_percent: round1(percent_of(weekend, total)),
        business_hours_definition: config.business_hours.definition(),
        after_hours_available: config.after_hours_available,
    }
}

fn priority_slot(p: Priority) -> usize {
    match p {
        Priority::Critical => 0,
        Priority::High => 1,
        Priority::Medium => 2,
        Priority::Low => 3,
        Priority::Informational => 4,
    }
}
