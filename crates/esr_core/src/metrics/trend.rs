use serde::{Deserialize, Serialize};

use crate::domain::Incident;
use crate::metrics::{mean_minutes, percent_of, round1, MetricGroup};
use crate::normalize::timestamps::duration_minutes;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendMetrics {
    pub mttr_trend: Vec<i64>,
    pub mttd_trend: Vec<i64>,
    pub fp_trend: Vec<f64>,
    pub period_labels: Vec<String>,
}

impl MetricGroup for TrendMetrics {
    const NAME: &'static str = "trend";
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodSnapshot {
    pub incidents: usize,
    pub mttr_minutes: i64,
    pub mttd_minutes: i64,
    pub false_positive_rate: f64,
}

pub fn period_snapshot(records: &[Incident]) -> PeriodSnapshot {
    let ttr = records
        .iter()
        .filter_map(|r| r.soc_ttr.map(duration_minutes))
        .collect::<Vec<_>>();
    let ttd = records
        .iter()
        .filter_map(|r| r.soc_ttd.map(duration_minutes))
        .collect::<Vec<_>>();
    let fp = records.iter().filter(|r| r.is_false_positive()).count();
    PeriodSnapshot {
        incidents: records.len(),
        mttr_minutes: mean_minutes(&ttr),
        mttd_minutes: mean_minutes(&ttd),
        false_positive_rate: round1(percent_of(fp, records.len())),
    }
}

/// `"Current"` for the last period, `"Period -N"` for one N periods earlier.
pub fn period_label(index: usize, count: usize) -> String {
    let back = count.saturating_sub(index + 1);
    if back == 0 {
        "Current".to_string()
    } else {
        format!("Period -{back}")
    }
}

/// One point per period, oldest first.
pub fn trend_metrics(periods: &[Vec<Incident>]) -> TrendMetrics {
    let mut trend = TrendMetrics {
        mttr_trend: Vec::with_capacity(periods.len()),
        mttd_trend: Vec::with_capacity(periods.len()),
        fp_trend: Vec::with_capacity(periods.len()),
        period_labels: Vec::with_capacity(periods.len()),
    };
    for (idx, records) in periods.iter().enumerate() {
        let snap = period_snapshot(records);
        trend.mttr_trend.push(snap.mttr_minutes);
        trend.mttd_trend.push(snap.mttd_minutes);
        trend.fp_trend.push(snap.false_positive_rate);
        trend.period_labels.push(period_label(idx, periods.len()));
    }
    trend
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn rec(verdict: &str, ttr: Option<i64>) -> Incident {
        Incident {
            verdict: Some(verdict.to_string()),
            soc_ttr: ttr.map(Duration::minutes),
            ..Default::default()
        }
    }

    #[test]
    fn labels_count_back_from_current() {
        let periods = vec![vec![], vec![], vec![]];
        let t = trend_metrics(&periods);
        assert_eq!(t.period_labels, vec!["Period -2", "Period -1", "Current"]);
        assert_eq!(t.mttr_trend, vec![0, 0, 0]);
        assert_eq!(t.fp_trend, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn per_period_points() {
        let periods = vec![
            vec![rec("False Positive", Some(100)), rec("True Positive", Some(50))],
            vec![
                rec("True Positive", Some(30)),
                rec("Benign", None),
                rec("False Positive", None),
            ],
        ];
        let t = trend_metrics(&periods);
        assert_eq!(t.mttr_trend, vec![75, 30]);
        assert_eq!(t.fp_trend, vec![50.0, 33.3]);
        assert_eq!(t.period_labels, vec!["Period -1", "Current"]);
    }

    #[test]
    fn single_period_is_current() {
        assert_eq!(period_label(0, 1), "Current");
        assert!(trend_metrics(&[]).period_labels.is_empty());
    }
}
