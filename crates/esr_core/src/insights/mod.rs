pub mod narrative;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analytics::DetectionSource;
use crate::config::{ClientConfig, InsightThresholds};
use crate::error::AppError;
use crate::metrics::{round0, round1, MetricGroup, MetricsResult};

pub use narrative::{display_decimal, executive_summary_narrative, format_currency};

pub const MAX_IMPROVEMENT_ITEMS: usize = 3;
pub const MAX_ACHIEVEMENTS: usize = 4;
pub const MAX_FOCUS_AREAS: usize = 3;
pub const MAX_GOALS: usize = 3;
pub const MAX_TUNING_RECOMMENDATIONS: usize = 3;

pub const SLA_COMPLIANCE_TARGET: f64 = 95.0;
pub const SLA_COMPLIANCE_WARNING: f64 = 90.0;
pub const LOW_FP_ACHIEVEMENT_MAX: f64 = 10.0;
pub const HIGH_AUTOMATION_ACHIEVEMENT_MIN: f64 = 85.0;
/// Per-source FP rate above which a source is flagged for rule optimization.
pub const SOURCE_OPTIMIZE_FP_RATE: f64 = 5.0;

/// Placeholder after-hours channel split (Email, Phone); Slack/Teams takes the remainder.
/// Not derived from notification data.
pub const NOTIFICATION_SPLIT: [(&str, f64); 2] = [("Email", 0.85), ("Phone", 0.10)];
pub const NOTIFICATION_REMAINDER_CHANNEL: &str = "Slack/Teams";

pub const TITLE_DETECTION_TUNING: &str = "Detection Tuning";
pub const TITLE_AUTOMATION: &str = "Automation Opportunity";
pub const TITLE_THREAT_FOCUS: &str = "Threat Focus";
pub const TITLE_RESPONSE_TIME: &str = "Response Time Optimization";
pub const TITLE_SLA: &str = "SLA Performance";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImprovementItem {
    pub title: String,
    pub priority: ItemPriority,
    pub owner: String,
    pub target: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTrend {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationMethod {
    pub method: String,
    pub count: i64,
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Insights {
    pub improvement_items: Vec<ImprovementItem>,
    pub key_achievements: Vec<String>,
    pub areas_of_focus: Vec<String>,
    pub next_period_goals: Vec<String>,
    pub tuning_recommendations: Vec<String>,
    pub executive_summary_narrative: String,
    pub detection_quality_trend: QualityTrend,
    pub notification_methods: Vec<NotificationMethod>,
    pub compliance_status: String,
    pub vulnerabilities_identified: i64,
    pub risk_reduction_percent: f64,
}

impl MetricGroup for Insights {
    const NAME: &'static str = "insights";
}

/// Typed read of the metric keys the rules consume.
///
/// Missing keys fall back to values that keep their rule quiet, except where a rule
/// reads the key with a different neutral value (noted at the call site).
#[derive(Debug, Clone, PartialEq)]
pub struct InsightInputs {
    pub client_name: String,
    pub false_positive_rate: Option<f64>,
    pub detection_sources: Vec<DetectionSource>,
    pub automation_percent: f64,
    pub manual_count: i64,
    pub manual_percent: i64,
    pub tactics: Vec<String>,
    pub high_severity: Vec<i64>,
    pub mttr_minutes: i64,
    pub p90_minutes: i64,
    pub sla_compliance_rate: f64,
    pub response_advantage_percent: f64,
    pub true_threats_contained: i64,
    pub zero_breaches: bool,
    pub after_hours_escalations: i64,
    pub total_modeled: i64,
    pub fp_trend: Vec<f64>,
    pub alerts_triaged: i64,
    pub client_touch_decisions: i64,
    pub closed_end_to_end: i64,
    pub incidents_escalated: i64,
}

fn array_of<T: for<'de> Deserialize<'de>>(
    metrics: &MetricsResult,
    key: &str,
) -> Result<Vec<T>, AppError> {
    match metrics.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(v) => serde_json::from_value(v.clone()).map_err(|e| {
            AppError::new("INSIGHTS_INPUT_INVALID", "Metric has an unexpected shape")
                .with_details(format!("key={key}; err={e}"))
        }),
    }
}

impl InsightInputs {
    pub fn from_metrics(metrics: &MetricsResult) -> Result<Self, AppError> {
        let manual = metrics.get("analyst_escalation");
        let manual_field = |field: &str| {
            manual
                .and_then(|m| m.get(field))
                .and_then(Value::as_i64)
                .unwrap_or(0)
        };
        let int = |key: &str| metrics.get_i64(key).unwrap_or(0);

        Ok(Self {
            client_name: metrics.get_str("client_name").unwrap_or("Client").to_string(),
            false_positive_rate: metrics.get_f64("false_positive_rate"),
            detection_sources: array_of(metrics, "detection_sources")?,
            automation_percent: metrics.get_f64("automation_percent").unwrap_or(0.0),
            manual_count: manual_field("count"),
            manual_percent: manual_field("percent"),
            tactics: array_of(metrics, "tactics")?,
            high_severity: array_of(metrics, "high_severity")?,
            mttr_minutes: int("mttr_minutes"),
            p90_minutes: int("p90_minutes"),
            sla_compliance_rate: metrics.get_f64("sla_compliance_rate").unwrap_or(100.0),
            response_advantage_percent: metrics
                .get_f64("response_advantage_percent")
                .unwrap_or(0.0),
            true_threats_contained: int("true_threats_contained"),
            zero_breaches: metrics.get_bool("zero_breaches").unwrap_or(true),
            after_hours_escalations: int("after_hours_escalations"),
            total_modeled: int("total_modeled"),
            fp_trend: array_of(metrics, "fp_trend")?,
            alerts_triaged: int("alerts_triaged"),
            client_touch_decisions: int("client_touch_decisions"),
            closed_end_to_end: int("closed_end_to_end"),
            incidents_escalated: int("incidents_escalated"),
        })
    }

    fn fp_rate(&self) -> f64 {
        self.false_positive_rate.unwrap_or(0.0)
    }
}

/// First source with the strictly highest FP rate; `None` when every rate is 0.
pub fn worst_source(sources: &[DetectionSource]) -> Option<&DetectionSource> {
    let mut worst: Option<&DetectionSource> = None;
    let mut worst_fp = 0.0;
    for source in sources {
        if source.fp_rate > worst_fp {
            worst_fp = source.fp_rate;
            worst = Some(source);
        }
    }
    worst
}

/// Share of high-severity incidents held by the top two tactics, when defined.
fn top_two_concentration(inputs: &InsightInputs) -> Option<(i64, i64, f64)> {
    if inputs.tactics.len() < 2 || inputs.high_severity.len() < 2 {
        return None;
    }
    let total: i64 = inputs.high_severity.iter().sum();
    if total <= 0 {
        return None;
    }
    let top_two: i64 = inputs.high_severity[..2].iter().sum();
    Some((top_two, total, top_two as f64 / total as f64 * 100.0))
}

pub fn improvement_items(inputs: &InsightInputs, t: &InsightThresholds) -> Vec<ImprovementItem> {
    let mut items = Vec::new();
    let client = &inputs.client_name;
    let fp_rate = inputs.fp_rate();

    if fp_rate > t.fp_rate_good {
        if let Some(worst) = worst_source(&inputs.detection_sources) {
            if worst.fp_rate > t.fp_rate_good {
                items.push(ImprovementItem {
                    title: TITLE_DETECTION_TUNING.to_string(),
                    priority: if fp_rate > t.fp_rate_warning {
                        ItemPriority::High
                    } else {
                        ItemPriority::Medium
                    },
                    owner: format!("CS SOC + {client} Security Team"),
                    target: "Next 30 days".to_string(),
                    description: format!(
                        "{} false positive rate is {}%, exceeding the {}% threshold and keeping the overall rate at {}%. \
                         Tuning these alerts will reduce client noise and improve SOC efficiency.",
                        worst.source,
                        display_decimal(worst.fp_rate),
                        display_decimal(t.fp_rate_good),
                        display_decimal(fp_rate),
                    ),
                });
            }
        }
    }

    if inputs.automation_percent < t.automation_target {
        items.push(ImprovementItem {
            title: TITLE_AUTOMATION.to_string(),
            priority: if inputs.automation_percent < t.automation_warning {
                ItemPriority::High
            } else {
                ItemPriority::Medium
            },
            owner: "CS SOC Engineering".to_string(),
            target: "Next 60 days".to_string(),
            description: format!(
                "Manual escalations at {}% exceed our {}% target. {} incidents required analyst judgment. \
                 Expanding playbook coverage will improve consistency.",
                inputs.manual_percent,
                display_decimal(t.manual_escalation_max),
                inputs.manual_count,
            ),
        });
    }

    if let Some((top_two, total, concentration)) = top_two_concentration(inputs) {
        if concentration >= t.high_severity_concentration {
            items.push(ImprovementItem {
                title: TITLE_THREAT_FOCUS.to_string(),
                priority: ItemPriority::High,
                owner: format!("Joint - CS Threat Intel + {client}"),
                target: "Ongoing".to_string(),
                description: format!(
                    "{} account for {top_two} of the {total} high-severity incidents ({}%) in the MITRE dataset, \
                     signaling concentrated foothold attempts that should drive proactive hunts and new detections.",
                    inputs.tactics[..2].join(" plus "),
                    round0(concentration),
                ),
            });
        }
    }

    if inputs.mttr_minutes > t.mttr_good {
        items.push(ImprovementItem {
            title: TITLE_RESPONSE_TIME.to_string(),
            priority: if inputs.mttr_minutes > t.mttr_warning {
                ItemPriority::High
            } else {
                ItemPriority::Medium
            },
            owner: "CS SOC Operations".to_string(),
            target: "Next 45 days".to_string(),
            description: format!(
                "Mean time to respond at {} minutes exceeds the {} minute target. \
                 Review triage workflows and automation rules to improve response speed.",
                inputs.mttr_minutes, t.mttr_good,
            ),
        });
    }

    let sla = inputs.sla_compliance_rate;
    if sla < SLA_COMPLIANCE_TARGET {
        items.push(ImprovementItem {
            title: TITLE_SLA.to_string(),
            priority: if sla < SLA_COMPLIANCE_WARNING {
                ItemPriority::High
            } else {
                ItemPriority::Medium
            },
            owner: "CS SOC Operations".to_string(),
            target: "Next 30 days".to_string(),
            description: format!(
                "SLA compliance at {}% is below the 95% target. \
                 Focus on high-priority incident response workflows.",
                display_decimal(sla),
            ),
        });
    }

    // Stable: equal priorities keep rule order.
    items.sort_by_key(|item| item.priority);
    items.truncate(MAX_IMPROVEMENT_ITEMS);
    items
}

pub fn key_achievements(inputs: &InsightInputs) -> Vec<String> {
    let mut out = Vec::new();

    if inputs.response_advantage_percent > 0.0 {
        out.push(format!(
            "{}% faster response than industry peers",
            round0(inputs.response_advantage_percent)
        ));
    }

    let contained = inputs.true_threats_contained;
    if contained > 0 && inputs.zero_breaches {
        out.push("100% threat containment with zero breaches".to_string());
    } else if contained > 0 {
        out.push(format!("{contained} threats successfully contained"));
    }

    if inputs.after_hours_escalations > 0 {
        out.push(format!(
            "{} after-hours escalations handled seamlessly",
            inputs.after_hours_escalations
        ));
    }

    if inputs.total_modeled > 0 {
        out.push(format!(
            "{} modeled cost exposure avoided",
            format_currency(inputs.total_modeled)
        ));
    }

    // A missing FP rate must not read as a perfect one.
    if let Some(fp) = inputs.false_positive_rate {
        if fp <= LOW_FP_ACHIEVEMENT_MAX {
            out.push(format!("False positive rate maintained at {}%", display_decimal(fp)));
        }
    }

    if inputs.automation_percent >= HIGH_AUTOMATION_ACHIEVEMENT_MIN {
        out.push(format!(
            "{}% of escalations handled via automated playbooks",
            round0(inputs.automation_percent)
        ));
    }

    out.truncate(MAX_ACHIEVEMENTS);
    out
}

pub fn areas_of_focus(inputs: &InsightInputs, items: &[ImprovementItem]) -> Vec<String> {
    let mut out = Vec::new();
    for item in items {
        match item.title.as_str() {
            TITLE_DETECTION_TUNING => {
                if let Some(source) = worst_source(&inputs.detection_sources) {
                    out.push(format!("Reduce {} false positive rate", source.source));
                }
            }
            TITLE_AUTOMATION => out.push("Expand playbook automation coverage".to_string()),
            TITLE_THREAT_FOCUS => {
                if let Some(first) = inputs.tactics.first() {
                    out.push(format!("Proactive threat hunting for {first} tactics"));
                }
            }
            TITLE_RESPONSE_TIME => out.push("Improve incident response workflows".to_string()),
            TITLE_SLA => out.push("Focus on high-priority SLA compliance".to_string()),
            _ => {}
        }
    }
    out.truncate(MAX_FOCUS_AREAS);
    out
}

pub fn next_period_goals(inputs: &InsightInputs, t: &InsightThresholds) -> Vec<String> {
    let mut out = Vec::new();
    if inputs.fp_rate() > t.fp_rate_good {
        out.push(format!(
            "Achieve {}% or lower overall false positive rate",
            display_decimal(t.fp_rate_good)
        ));
    }
    if inputs.automation_percent < t.automation_target {
        out.push(format!(
            "Reduce manual escalations to {}% or below",
            display_decimal(t.manual_escalation_max)
        ));
    }
    if let Some(second) = inputs.tactics.get(1) {
        out.push(format!("Implement enhanced detection for {second}"));
    }
    if inputs.mttr_minutes > t.mttr_good {
        out.push(format!("Reduce MTTR to under {} minutes", t.mttr_good));
    }
    if inputs.sla_compliance_rate < SLA_COMPLIANCE_TARGET {
        out.push("Achieve 95%+ SLA compliance across all priorities".to_string());
    }
    out.truncate(MAX_GOALS);
    out
}

pub fn tuning_recommendations(inputs: &InsightInputs, t: &InsightThresholds) -> Vec<String> {
    inputs
        .detection_sources
        .iter()
        .take(MAX_TUNING_RECOMMENDATIONS)
        .map(|source| {
            let name = &source.source;
            if source.fp_rate > t.fp_rate_good {
                format!(
                    "Reduce {name} false positive rate from {}% to target {}%",
                    display_decimal(source.fp_rate),
                    display_decimal(t.fp_rate_good)
                )
            } else if source.fp_rate > SOURCE_OPTIMIZE_FP_RATE {
                format!("Optimize {name} rules for better signal fidelity")
            } else {
                format!("Review {name} detection thresholds")
            }
        })
        .collect()
}

/// Compare the last two FP-rate trend points: a drop to 90% or less is improving, a rise
/// to 110% or more is declining.
pub fn detection_quality_trend(fp_trend: &[f64]) -> QualityTrend {
    let [.., previous, current] = fp_trend else {
        return QualityTrend::Stable;
    };
    if *current <= previous * 0.9 {
        QualityTrend::Improving
    } else if *current >= previous * 1.1 {
        QualityTrend::Declining
    } else {
        QualityTrend::Stable
    }
}

pub fn notification_methods(after_hours: i64) -> Vec<NotificationMethod> {
    let total = after_hours.max(0);
    let mut out = Vec::with_capacity(NOTIFICATION_SPLIT.len() + 1);
    let mut assigned = 0;
    for (method, share) in NOTIFICATION_SPLIT {
        let count = (total as f64 * share) as i64;
        assigned += count;
        out.push(NotificationMethod {
            method: method.to_string(),
            count,
            percent: 0.0,
        });
    }
    out.push(NotificationMethod {
        method: NOTIFICATION_REMAINDER_CHANNEL.to_string(),
        count: total - assigned,
        percent: 0.0,
    });
    if total > 0 {
        for m in &mut out {
            m.percent = round1(m.count as f64 / total as f64 * 100.0);
        }
    }
    out
}

/// Derive every insight field from merged metrics.
pub fn generate_insights(
    metrics: &MetricsResult,
    config: &ClientConfig,
) -> Result<Insights, AppError> {
    let inputs = InsightInputs::from_metrics(metrics)?;
    let t = &config.thresholds;

    let items = improvement_items(&inputs, t);
    let areas = areas_of_focus(&inputs, &items);
    Ok(Insights {
        key_achievements: key_achievements(&inputs),
        areas_of_focus: areas,
        next_period_goals: next_period_goals(&inputs, t),
        tuning_recommendations: tuning_recommendations(&inputs, t),
        executive_summary_narrative: executive_summary_narrative(&inputs),
        detection_quality_trend: detection_quality_trend(&inputs.fp_trend),
        notification_methods: notification_methods(inputs.after_hours_escalations),
        compliance_status: "Fully Compliant".to_string(),
        vulnerabilities_identified: 0,
        risk_reduction_percent: inputs.response_advantage_percent,
        improvement_items: items,
    })
}
