use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::domain::Incident;
use crate::metrics::{percent_of, round0, round1, MetricGroup};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionQuality {
    pub true_threat_precision: f64,
    pub signal_fidelity: f64,
    pub client_validated: f64,
    pub false_positive_rate: f64,
    pub containment_rate: f64,
    pub signal_to_noise_ratio: f64,
}

impl MetricGroup for DetectionQuality {
    const NAME: &'static str = "detection_quality";
}

fn closed_by_client(inc: &Incident, config: &ClientConfig) -> bool {
    inc.closed_by
        .as_deref()
        .map(|c| !config.operator.is_operator(c))
        .unwrap_or(false)
}

/// Precision, noise and containment ratios for one record set.
///
/// Containment is measured against true positives and is 100 when there are none.
/// Signal-to-noise falls back to the true-positive count when there are no false positives.
pub fn detection_quality(records: &[Incident], config: &ClientConfig) -> DetectionQuality {
    let total = records.len();
    if total == 0 {
        return DetectionQuality {
            true_threat_precision: 0.0,
            signal_fidelity: 0.0,
            client_validated: 0.0,
            false_positive_rate: 0.0,
            containment_rate: 100.0,
            signal_to_noise_ratio: 0.0,
        };
    }

    let tp = records.iter().filter(|r| r.is_true_positive()).count();
    let fp = records.iter().filter(|r| r.is_false_positive()).count();
    let contained = records.iter().filter(|r| r.is_contained()).count();
    let client_closed = records
        .iter()
        .filter(|r| closed_by_client(r, config))
        .count();

    let fp_rate = percent_of(fp, total);
    let containment = if tp == 0 {
        100.0
    } else {
        percent_of(contained, tp)
    };
    let snr = if fp == 0 {
        tp as f64
    } else {
        tp as f64 / fp as f64
    };

    DetectionQuality {
        true_threat_precision: round1(percent_of(tp, total)),
        signal_fidelity: round1(100.0 - fp_rate),
        client_validated: round1(percent_of(client_closed, total)),
        false_positive_rate: round1(fp_rate),
        containment_rate: round1(containment),
        signal_to_noise_ratio: round1(snr),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollaborationMetrics {
    pub avg_touches: f64,
    pub client_participation_rate: f64,
    pub client_led_closure_rate: f64,
    /// Whole-percent labels, e.g. `"42%"`.
    pub client_participation: String,
    pub client_led_closures: String,
}

impl MetricGroup for CollaborationMetrics {
    const NAME: &'static str = "collaboration";
}

fn distinct_touchers(raw: &str) -> Vec<&str> {
    let mut users: Vec<&str> = Vec::new();
    for user in raw.split(',').map(str::trim).filter(|u| !u.is_empty()) {
        if !users.contains(&user) {
            users.push(user);
        }
    }
    users
}

pub fn collaboration_metrics(records: &[Incident], config: &ClientConfig) -> CollaborationMetrics {
    let total = records.len();
    let mut touch_counts = Vec::new();
    let mut participated = 0usize;

    for inc in records {
        let Some(raw) = inc.touched_by.as_deref() else { continue };
        let users = distinct_touchers(raw);
        if users.is_empty() {
            continue;
        }
        touch_counts.push(users.len());
        if users.iter().any(|u| !config.operator.is_operator(u)) {
            participated += 1;
        }
    }
    let client_closed = records
        .iter()
        .filter(|r| closed_by_client(r, config))
        .count();

    let avg_touches = if touch_counts.is_empty() {
        0.0
    } else {
        touch_counts.iter().sum::<usize>() as f64 / touch_counts.len() as f64
    };
    let participation = percent_of(participated, total);
    let closure = percent_of(client_closed, total);

    CollaborationMetrics {
        avg_touches: round1(avg_touches),
        client_participation_rate: round1(participation),
        client_led_closure_rate: round1(closure),
        client_participation: format!("{}%", round0(participation)),
        client_led_closures: format!("{}%", round0(closure)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(v: &str) -> Incident {
        Incident {
            verdict: Some(v.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn containment_is_full_without_true_positives() {
        let q = detection_quality(&[verdict("False Positive")], &ClientConfig::default());
        assert_eq!(q.containment_rate, 100.0);
        assert_eq!(q.false_positive_rate, 100.0);
        assert_eq!(q.signal_fidelity, 0.0);
        assert_eq!(detection_quality(&[], &ClientConfig::default()).containment_rate, 100.0);
    }

    #[test]
    fn signal_to_noise_without_false_positives_is_tp_count() {
        let records = (0..7).map(|_| verdict("True Positive")).collect::<Vec<_>>();
        let q = detection_quality(&records, &ClientConfig::default());
        assert_eq!(q.signal_to_noise_ratio, 7.0);
        assert_eq!(q.true_threat_precision, 100.0);
        assert_eq!(q.containment_rate, 0.0);
    }

    #[test]
    fn false_positive_rate_one_decimal() {
        let records = vec![
            verdict("False Positive"),
            verdict("True Positive"),
            verdict("True Positive"),
        ];
        let q = detection_quality(&records, &ClientConfig::default());
        assert_eq!(q.false_positive_rate, 33.3);
        assert_eq!(q.signal_fidelity, 66.7);
        assert_eq!(q.signal_to_noise_ratio, 2.0);
    }

    #[test]
    fn contained_and_client_validated() {
        let records = vec![
            Incident {
                verdict: Some("True Positive".into()),
                response_action: Some("Isolate Host".into()),
                response_action_status: Some("Success".into()),
                closed_by: Some("Pat (Client)".into()),
                ..Default::default()
            },
            Incident {
                verdict: Some("True Positive".into()),
                response_action_status: Some("Success".into()),
                closed_by: Some("Analyst CRITICALSTART".into()),
                ..Default::default()
            },
        ];
        let q = detection_quality(&records, &ClientConfig::default());
        assert_eq!(q.containment_rate, 50.0);
        assert_eq!(q.client_validated, 50.0);
    }

    #[test]
    fn collaboration_counts_distinct_touchers() {
        let records = vec![
            Incident {
                touched_by: Some("a (CriticalStart), b, b".into()),
                closed_by: Some("b".into()),
                ..Default::default()
            },
            Incident {
                touched_by: Some("c (CRITICALSTART)".into()),
                closed_by: Some("c (CRITICALSTART)".into()),
                ..Default::default()
            },
            Incident::default(),
        ];
        let c = collaboration_metrics(&records, &ClientConfig::default());
        assert_eq!(c.avg_touches, 1.5);
        assert_eq!(c.client_participation_rate, 33.3);
        assert_eq!(c.client_participation, "33%");
        assert_eq!(c.client_led_closures, "33%");
    }

    #[test]
    fn collaboration_empty_set() {
        let c = collaboration_metrics(&[], &ClientConfig::default());
        assert_eq!(c.avg_touches, 0.0);
        assert_eq!(c.client_participation, "0%");
    }
}
