use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::domain::{Incident, Priority};
use crate::metrics::{percent_of, round1, MetricGroup};
use crate::normalize::priority::{parse_priority_level, parse_vendor_severity};

pub const UNKNOWN_LABEL: &str = "Unknown";
pub const MITRE_TOP_TACTICS: usize = 5;

/// Groups keyed by label, iterated in first-seen order.
///
/// Every ranking below is a stable sort over this order, so ties keep encounter order.
struct FirstSeen<K, V> {
    index: HashMap<K, usize>,
    entries: Vec<(K, V)>,
}

impl<K: Eq + Hash + Clone, V: Default> FirstSeen<K, V> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn entry(&mut self, key: K) -> &mut V {
        let idx = match self.index.get(&key) {
            Some(idx) => *idx,
            None => {
                self.entries.push((key.clone(), V::default()));
                self.index.insert(key, self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }

    fn into_entries(self) -> Vec<(K, V)> {
        self.entries
    }
}

fn label_or_unknown(value: &Option<String>) -> &str {
    match value.as_deref() {
        Some(v) if !v.is_empty() => v,
        _ => UNKNOWN_LABEL,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionSource {
    pub source: String,
    pub incidents: usize,
    pub false_positives: usize,
    pub percent: f64,
    pub fp_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionSources {
    pub detection_sources: Vec<DetectionSource>,
}

impl MetricGroup for DetectionSources {
    const NAME: &'static str = "detection_sources";
}

/// Per-product volume and false-positive rate, largest first.
pub fn detection_sources(records: &[Incident]) -> DetectionSources {
    let mut groups: FirstSeen<String, (usize, usize)> = FirstSeen::new();
    for inc in records {
        let counts = groups.entry(label_or_unknown(&inc.product).to_string());
        counts.0 += 1;
        if inc.is_false_positive() {
            counts.1 += 1;
        }
    }

    let mut entries = groups.into_entries();
    entries.sort_by(|a, b| b.1 .0.cmp(&a.1 .0));

    let total = records.len();
    let detection_sources = entries
        .into_iter()
        .map(|(source, (count, fp))| DetectionSource {
            source,
            incidents: count,
            false_positives: fp,
            percent: round1(percent_of(count, total)),
            fp_rate: round1(percent_of(fp, count)),
        })
        .collect();
    DetectionSources { detection_sources }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MitreBreakdown {
    pub tactics: Vec<String>,
    /// Critical plus High.
    pub high_severity: Vec<usize>,
    pub medium_severity: Vec<usize>,
    pub low_severity: Vec<usize>,
    pub info_severity: Vec<usize>,
}

impl MetricGroup for MitreBreakdown {
    const NAME: &'static str = "mitre";
}

#[derive(Debug, Default, Clone, Copy)]
struct TacticCounts {
    total: usize,
    by_priority: [usize; 5],
}

impl TacticCounts {
    fn get(&self, p: Priority) -> usize {
        self.by_priority[p as usize]
    }
}

/// Top tactics by volume with a per-priority cross-tab.
///
/// Records without a resolvable priority count toward a tactic's rank but appear in
/// none of the severity series.
pub fn mitre_breakdown(records: &[Incident]) -> MitreBreakdown {
    let mut groups: FirstSeen<String, TacticCounts> = FirstSeen::new();
    for inc in records {
        let counts = groups.entry(label_or_unknown(&inc.mitre_tactic_name).to_string());
        counts.total += 1;
        if let Some(p) = parse_priority_level(inc.current_priority.as_deref()) {
            counts.by_priority[p as usize] += 1;
        }
    }

    let mut entries = groups.into_entries();
    entries.sort_by(|a, b| b.1.total.cmp(&a.1.total));
    entries.truncate(MITRE_TOP_TACTICS);

    let mut out = MitreBreakdown {
        tactics: Vec::with_capacity(entries.len()),
        high_severity: Vec::with_capacity(entries.len()),
        medium_severity: Vec::with_capacity(entries.len()),
        low_severity: Vec::with_capacity(entries.len()),
        info_severity: Vec::with_capacity(entries.len()),
    };
    for (tactic, counts) in entries {
        out.tactics.push(tactic);
        out.high_severity
            .push(counts.get(Priority::Critical) + counts.get(Priority::High));
        out.medium_severity.push(counts.get(Priority::Medium));
        out.low_severity.push(counts.get(Priority::Low));
        out.info_severity.push(counts.get(Priority::Informational));
    }
    out
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeverityFlow {
    pub from: String,
    pub to: String,
    pub flow: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeverityFlows {
    pub severity_flows: Vec<SeverityFlow>,
}

impl MetricGroup for SeverityFlows {
    const NAME: &'static str = "severity_flows";
}

/// Vendor severity to CS priority transitions, busiest first.
pub fn severity_flows(records: &[Incident]) -> SeverityFlows {
    let mut groups: FirstSeen<(Priority, Priority), usize> = FirstSeen::new();
    for inc in records {
        let vendor = parse_vendor_severity(inc.vendor_severity.as_deref());
        let cs = parse_priority_level(inc.current_priority.as_deref());
        let (Some(vendor), Some(cs)) = (vendor, cs) else { continue };
        *groups.entry((vendor, cs)) += 1;
    }

    let mut flows = groups
        .into_entries()
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|((vendor, cs), count)| SeverityFlow {
            from: format!("Vendor {vendor}"),
            to: format!("CS {cs}"),
            flow: count,
        })
        .collect::<Vec<_>>();
    flows.sort_by(|a, b| b.flow.cmp(&a.flow));
    SeverityFlows {
        severity_flows: flows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sourced(product: Option<&str>, verdict: &str) -> Incident {
        Incident {
            product: product.map(str::to_string),
            verdict: Some(verdict.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn detection_sources_rank_by_count_with_first_seen_ties() {
        let records = vec![
            sourced(Some("EDR"), "False Positive"),
            sourced(Some("SIEM"), "True Positive"),
            sourced(None, "Benign"),
            sourced(Some("SIEM"), "False Positive"),
            sourced(Some("EDR"), "True Positive"),
            sourced(Some("EDR"), "True Positive"),
        ];
        let out = detection_sources(&records).detection_sources;
        let names = out.iter().map(|s| s.source.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["EDR", "SIEM", "Unknown"]);
        assert_eq!(
            out[0],
            DetectionSource {
                source: "EDR".into(),
                incidents: 3,
                false_positives: 1,
                percent: 50.0,
                fp_rate: 33.3,
            }
        );
        assert_eq!(out[1].fp_rate, 50.0);
        assert_eq!(out[2].percent, 16.7);
    }

    #[test]
    fn detection_source_fp_matches_overall_rate() {
        let records = vec![
            sourced(Some("EDR"), "False Positive"),
            sourced(Some("EDR"), "True Positive"),
            sourced(Some("EDR"), "True Positive"),
        ];
        let out = detection_sources(&records).detection_sources;
        assert_eq!(out[0].false_positives, 1);
        assert_eq!(out[0].fp_rate, 33.3);
    }

    fn tactic(name: Option<&str>, priority: &str) -> Incident {
        Incident {
            mitre_tactic_name: name.map(str::to_string),
            current_priority: Some(priority.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn mitre_top_five_and_cross_tab() {
        let mut records = vec![
            tactic(Some("Execution"), "Critical"),
            tactic(Some("Execution"), "2 - High"),
            tactic(Some("Execution"), "Medium"),
            tactic(Some("Persistence"), "Low"),
            tactic(None, "8 - Info"),
            tactic(Some("Discovery"), "bogus"),
        ];
        for name in ["A", "B", "C"] {
            records.push(tactic(Some(name), "High"));
        }
        let m = mitre_breakdown(&records);
        assert_eq!(
            m.tactics,
            vec!["Execution", "Persistence", "Unknown", "Discovery", "A"]
        );
        assert_eq!(m.high_severity, vec![2, 0, 0, 0, 1]);
        assert_eq!(m.medium_severity, vec![1, 0, 0, 0, 0]);
        assert_eq!(m.low_severity, vec![0, 1, 0, 0, 0]);
        assert_eq!(m.info_severity, vec![0, 0, 1, 0, 0]);
    }

    #[test]
    fn mitre_empty() {
        let m = mitre_breakdown(&[]);
        assert!(m.tactics.is_empty());
        assert!(m.high_severity.is_empty());
    }

    fn flow(vendor: Option<&str>, priority: Option<&str>) -> Incident {
        Incident {
            vendor_severity: vendor.map(str::to_string),
            current_priority: priority.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn severity_flows_skip_unresolvable_pairs() {
        let records = vec![
            flow(Some("medium"), Some("3 - High")),
            flow(Some("HIGH"), Some("Critical")),
            flow(Some("Med"), Some("High")),
            flow(Some("???"), Some("High")),
            flow(Some("Low"), None),
        ];
        assert_eq!(
            severity_flows(&records).severity_flows,
            vec![
                SeverityFlow {
                    from: "Vendor Medium".into(),
                    to: "CS High".into(),
                    flow: 2,
                },
                SeverityFlow {
                    from: "Vendor High".into(),
                    to: "CS Critical".into(),
                    flow: 1,
                },
            ]
        );
    }
}
