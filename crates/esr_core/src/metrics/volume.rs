use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::domain::Incident;
use crate::metrics::{percent_of, round0, round1, MetricGroup};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EscalationShare {
    pub count: usize,
    /// Whole-number percent of all records.
    pub percent: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VolumeMetrics {
    pub alerts_triaged: usize,
    pub incidents_escalated: usize,
    pub closed_end_to_end: usize,
    pub true_threats_contained: usize,
    pub playbook_auto: EscalationShare,
    pub analyst_escalation: EscalationShare,
    pub automation_percent: f64,
}

impl MetricGroup for VolumeMetrics {
    const NAME: &'static str = "volume";
}

/// Records with no escalation method count as neither playbook nor analyst.
pub fn volume_metrics(records: &[Incident], config: &ClientConfig) -> VolumeMetrics {
    let total = records.len();
    let closed = records.iter().filter(|r| r.is_closed()).count();
    let true_positives = records.iter().filter(|r| r.is_true_positive()).count();

    let (mut playbook, mut analyst) = (0usize, 0usize);
    for method in records
        .iter()
        .filter_map(|r| r.initial_escalation_method.as_deref())
    {
        if config.operator.is_analyst_escalation(method) {
            analyst += 1;
        } else {
            playbook += 1;
        }
    }

    let playbook_pct = percent_of(playbook, total);
    VolumeMetrics {
        alerts_triaged: total,
        incidents_escalated: total,
        closed_end_to_end: closed,
        true_threats_contained: true_positives,
        playbook_auto: EscalationShare {
            count: playbook,
            percent: round0(playbook_pct),
        },
        analyst_escalation: EscalationShare {
            count: analyst,
            percent: round0(percent_of(analyst, total)),
        },
        automation_percent: round1(playbook_pct),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(status: &str, verdict: &str, method: Option<&str>) -> Incident {
        Incident {
            current_status: Some(status.to_string()),
            verdict: Some(verdict.to_string()),
            initial_escalation_method: method.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn counts_and_escalation_split() {
        let records = vec![
            rec("Closed", "True Positive", Some("CS SOC")),
            rec("Open", "False Positive", Some("Playbook: Phishing")),
            rec("CLOSED - auto", "Benign", Some("Playbook: EDR")),
            rec("Open", "Benign", None),
        ];
        let v = volume_metrics(&records, &ClientConfig::default());
        assert_eq!(v.alerts_triaged, 4);
        assert_eq!(v.closed_end_to_end, 2);
        assert_eq!(v.true_threats_contained, 1);
        assert_eq!(v.playbook_auto, EscalationShare { count: 2, percent: 50 });
        assert_eq!(v.analyst_escalation, EscalationShare { count: 1, percent: 25 });
        assert_eq!(v.automation_percent, 50.0);
    }

    #[test]
    fn empty_set_is_all_zero() {
        let v = volume_metrics(&[], &ClientConfig::default());
        assert_eq!(v.alerts_triaged, 0);
        assert_eq!(v.playbook_auto.percent, 0);
        assert_eq!(v.automation_percent, 0.0);
    }
}
