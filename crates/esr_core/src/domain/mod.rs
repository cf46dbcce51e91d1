use serde::{Deserialize, Serialize};
use time::{Duration, PrimitiveDateTime};

/// One escalation record from a spreadsheet export.
///
/// Notes:
/// - Every field is nullable; sparse rows are normal and absence stays `None`.
/// - Timestamps are naive wall-clock values. Offsets present in the source are dropped
///   during parsing, so `*_utc` and `*_local` are only as trustworthy as the export.
/// - Response times are elapsed durations, not timestamps.
/// - Records are never mutated after parsing; metrics fold over slices of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Incident {
    pub incident_id: Option<String>,
    pub incident_url: Option<String>,
    pub vendor_incident_id: Option<String>,
    pub vendor_incident_url: Option<String>,
    pub incident_title: Option<String>,

    pub organization: Option<String>,
    pub product: Option<String>,
    pub deployment_status: Option<String>,

    pub initial_escalation_method: Option<String>,
    pub playbook_url: Option<String>,

    pub current_status: Option<String>,
    pub verdict: Option<String>,
    pub current_priority: Option<String>,
    pub current_category: Option<String>,

    pub created_utc: Option<PrimitiveDateTime>,
    pub created_local: Option<PrimitiveDateTime>,
    pub last_updated_utc: Option<PrimitiveDateTime>,
    pub last_updated_local: Option<PrimitiveDateTime>,
    pub escalated_utc: Option<PrimitiveDateTime>,
    pub escalated_local: Option<PrimitiveDateTime>,
    pub closed_utc: Option<PrimitiveDateTime>,
    pub closed_local: Option<PrimitiveDateTime>,

    pub escalation_paths: Option<String>,
    pub notification_groups: Option<String>,

    pub assigned_users: Option<String>,
    pub touched_by: Option<String>,
    pub closed_by: Option<String>,

    pub soc_last_comment: Option<String>,
    pub customer_last_comment: Option<String>,

    pub response_action: Option<String>,
    pub action_target: Option<String>,
    pub target_type: Option<String>,
    pub action_provider: Option<String>,
    pub executed_date: Option<PrimitiveDateTime>,
    pub executed_by: Option<String>,
    pub response_action_status: Option<String>,

    pub soc_ttr: Option<Duration>,
    pub soc_ttd: Option<Duration>,
    pub customer_ttr: Option<Duration>,
    pub customer_ttd: Option<Duration>,

    pub mitre_tactic_id: Option<String>,
    pub mitre_tactic_name: Option<String>,
    pub mitre_technique_id: Option<String>,
    pub mitre_technique_name: Option<String>,

    pub vendor_severity: Option<String>,
}

impl Incident {
    /// Created time, preferring the UTC column.
    pub fn created(&self) -> Option<PrimitiveDateTime> {
        self.created_utc.or(self.created_local)
    }

    /// Timestamp used for business-hours classification: escalation time if known,
    /// otherwise creation time. Local columns win over UTC within each event.
    pub fn operative_local_time(&self) -> Option<PrimitiveDateTime> {
        self.escalated_local
            .or(self.escalated_utc)
            .or(self.created_local)
            .or(self.created_utc)
    }

    pub fn is_closed(&self) -> bool {
        contains_upper(&self.current_status, "CLOSED")
    }

    pub fn is_true_positive(&self) -> bool {
        contains_upper(&self.verdict, "TRUE POSITIVE")
    }

    pub fn is_false_positive(&self) -> bool {
        contains_upper(&self.verdict, "FALSE")
    }

    /// A response action was recorded and its status reports success.
    pub fn is_contained(&self) -> bool {
        self.response_action.is_some() && contains_upper(&self.response_action_status, "SUCCESS")
    }
}

fn contains_upper(value: &Option<String>, needle: &str) -> bool {
    value
        .as_deref()
        .map(|v| v.to_uppercase().contains(needle))
        .unwrap_or(false)
}

/// Normalized priority/severity level shared by CS priorities and vendor severities.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
    Informational,
}

impl Priority {
    pub const ALL: [Priority; 5] = [
        Priority::Critical,
        Priority::High,
        Priority::Medium,
        Priority::Low,
        Priority::Informational,
    ];

    /// Levels that carry an SLA target, in report order.
    pub const SLA_LEVELS: [Priority; 4] = [
        Priority::Critical,
        Priority::High,
        Priority::Medium,
        Priority::Low,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Priority::Critical => "Critical",
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
            Priority::Informational => "Informational",
        }
    }

    pub fn is_critical_or_high(self) -> bool {
        matches!(self, Priority::Critical | Priority::High)
    }

    pub fn is_medium_or_low(self) -> bool {
        matches!(self, Priority::Medium | Priority::Low)
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationWarning {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl ValidationWarning {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn verdict_and_status_checks_are_case_insensitive() {
        let inc = Incident {
            current_status: Some("Closed - Resolved".to_string()),
            verdict: Some("true positive".to_string()),
            ..Default::default()
        };
        assert!(inc.is_closed());
        assert!(inc.is_true_positive());
        assert!(!inc.is_false_positive());
    }

    #[test]
    fn operative_time_prefers_escalation_then_local() {
        let inc = Incident {
            created_local: Some(datetime!(2025-06-16 09:00)),
            escalated_utc: Some(datetime!(2025-06-16 22:00)),
            ..Default::default()
        };
        assert_eq!(inc.operative_local_time(), Some(datetime!(2025-06-16 22:00)));

        let created_only = Incident {
            created_utc: Some(datetime!(2025-06-16 14:00)),
            ..Default::default()
        };
        assert_eq!(
            created_only.operative_local_time(),
            Some(datetime!(2025-06-16 14:00))
        );
        assert_eq!(Incident::default().operative_local_time(), None);
    }

    #[test]
    fn containment_requires_action_and_success_status() {
        let mut inc = Incident {
            response_action_status: Some("Success".to_string()),
            ..Default::default()
        };
        assert!(!inc.is_contained());
        inc.response_action = Some("Isolate Host".to_string());
        assert!(inc.is_contained());
    }
}
