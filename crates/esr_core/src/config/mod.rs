use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::Priority;
use crate::error::AppError;

/// Average analyst handling time per escalated incident, in hours.
pub const DEFAULT_HANDLING_HOURS_PER_INCIDENT: f64 = 1.5;
/// Share of the average breach cost credited per contained true positive.
pub const DEFAULT_CONTAINMENT_VALUE_FRACTION: f64 = 0.15;
/// Share of the 24x7 coverage cost attributed to this client.
pub const DEFAULT_COVERAGE_ALLOCATION_DIVISOR: f64 = 10.0;
/// SLA target used for a priority with no configured target.
pub const DEFAULT_SLA_TARGET_MINUTES: i64 = 180;
/// Closer / toucher names containing this marker belong to the SOC operator.
pub const DEFAULT_SOC_MARKER: &str = "CRITICALSTART";
/// Escalation method value that marks an analyst-initiated escalation.
pub const DEFAULT_ANALYST_ESCALATION_LABEL: &str = "CS SOC";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndustryBenchmarks {
    pub mttr_minutes: i64,
    pub mttd_minutes: i64,
    pub incidents_per_day: f64,
}

impl Default for IndustryBenchmarks {
    fn default() -> Self {
        Self {
            mttr_minutes: 192,
            mttd_minutes: 66,
            incidents_per_day: 11.4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostModel {
    pub analyst_hourly_rate: i64,
    pub coverage_hourly_rate: i64,
    pub breach_cost_estimate: i64,
    pub handling_hours_per_incident: f64,
    pub containment_value_fraction: f64,
    pub coverage_allocation_divisor: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            analyst_hourly_rate: 85,
            coverage_hourly_rate: 220,
            breach_cost_estimate: 4_200_000,
            handling_hours_per_incident: DEFAULT_HANDLING_HOURS_PER_INCIDENT,
            containment_value_fraction: DEFAULT_CONTAINMENT_VALUE_FRACTION,
            coverage_allocation_divisor: DEFAULT_COVERAGE_ALLOCATION_DIVISOR,
        }
    }
}

/// Business-hour window on a 24h clock: `start <= hour < end` is business time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BusinessHours {
    pub start: u8,
    pub end: u8,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self { start: 8, end: 18 }
    }
}

impl BusinessHours {
    pub fn contains_hour(&self, hour: u8) -> bool {
        hour >= self.start && hour < self.end
    }

    /// Human-readable window, e.g. `08:00-18:00, Mon-Fri`.
    pub fn definition(&self) -> String {
        format!("{:02}:00-{:02}:00, Mon-Fri", self.start, self.end)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsightThresholds {
    pub fp_rate_good: f64,
    pub fp_rate_warning: f64,
    pub automation_target: f64,
    pub automation_warning: f64,
    pub manual_escalation_max: f64,
    pub mttr_good: i64,
    pub mttr_warning: i64,
    pub high_severity_concentration: f64,
}

impl Default for InsightThresholds {
    fn default() -> Self {
        Self {
            fp_rate_good: 10.0,
            fp_rate_warning: 15.0,
            automation_target: 88.0,
            automation_warning: 80.0,
            manual_escalation_max: 12.0,
            mttr_good: 150,
            mttr_warning: 200,
            high_severity_concentration: 50.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperatorMarkers {
    pub soc_marker: String,
    pub analyst_escalation_label: String,
}

impl Default for OperatorMarkers {
    fn default() -> Self {
        Self {
            soc_marker: DEFAULT_SOC_MARKER.to_string(),
            analyst_escalation_label: DEFAULT_ANALYST_ESCALATION_LABEL.to_string(),
        }
    }
}

impl OperatorMarkers {
    /// True when the name belongs to the SOC operator rather than the client.
    pub fn is_operator(&self, name: &str) -> bool {
        name.to_uppercase().contains(&self.soc_marker.to_uppercase())
    }

    pub fn is_analyst_escalation(&self, method: &str) -> bool {
        method.to_uppercase() == self.analyst_escalation_label.to_uppercase()
    }
}

/// Client tunables for one report run. Read-only once loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    pub tier: String,
    pub client_name_override: Option<String>,
    pub industry_benchmarks_available: bool,
    pub industry_benchmarks: IndustryBenchmarks,
    pub period_start: Option<String>,
    pub period_end: Option<String>,
    pub cost_modeling: CostModel,
    /// Minutes keyed by priority label (`Critical`, `High`, ...).
    pub sla_targets: BTreeMap<String, i64>,
    pub after_hours_available: bool,
    pub business_hours: BusinessHours,
    pub thresholds: InsightThresholds,
    pub operator: OperatorMarkers,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let sla_targets = [
            (Priority::Critical, 30),
            (Priority::High, 60),
            (Priority::Medium, 180),
            (Priority::Low, 240),
        ]
        .into_iter()
        .map(|(p, m)| (p.label().to_string(), m))
        .collect();

        Self {
            tier: "Standard Tier".to_string(),
            client_name_override: None,
            industry_benchmarks_available: true,
            industry_benchmarks: IndustryBenchmarks::default(),
            period_start: None,
            period_end: None,
            cost_modeling: CostModel::default(),
            sla_targets,
            after_hours_available: true,
            business_hours: BusinessHours::default(),
            thresholds: InsightThresholds::default(),
            operator: OperatorMarkers::default(),
        }
    }
}

impl ClientConfig {
    pub fn sla_target(&self, priority: Priority) -> i64 {
        self.sla_targets
            .get(priority.label())
            .copied()
            .unwrap_or(DEFAULT_SLA_TARGET_MINUTES)
    }

    /// Apply a configuration document on top of `self`. Only present fields change;
    /// `sla_targets` is replaced wholesale when given.
    pub fn overlay(mut self, doc: ConfigDocument) -> Self {
        if let Some(v) = doc.tier {
            self.tier = v;
        }
        if let Some(v) = doc.client_name_override.filter(|s| !s.trim().is_empty()) {
            self.client_name_override = Some(v);
        }
        if let Some(v) = doc.industry_benchmarks_available {
            self.industry_benchmarks_available = v;
        }
        if let Some(b) = doc.industry_benchmarks {
            let target = &mut self.industry_benchmarks;
            if let Some(v) = b.mttr_minutes {
                target.mttr_minutes = v;
            }
            if let Some(v) = b.mttd_minutes {
                target.mttd_minutes = v;
            }
            if let Some(v) = b.incidents_per_day {
                target.incidents_per_day = v;
            }
        }
        if let Some(p) = doc.report_period {
            if let Some(v) = p.start {
                self.period_start = Some(v);
            }
            if let Some(v) = p.end {
                self.period_end = Some(v);
            }
        }
        if let Some(c) = doc.cost_modeling {
            let target = &mut self.cost_modeling;
            if let Some(v) = c.analyst_hourly_rate {
                target.analyst_hourly_rate = v;
            }
            if let Some(v) = c.coverage_hourly_rate {
                target.coverage_hourly_rate = v;
            }
            if let Some(v) = c.breach_cost_estimate {
                target.breach_cost_estimate = v;
            }
            if let Some(v) = c.handling_hours_per_incident {
                target.handling_hours_per_incident = v;
            }
            if let Some(v) = c.containment_value_fraction {
                target.containment_value_fraction = v;
            }
            if let Some(v) = c.coverage_allocation_divisor {
                target.coverage_allocation_divisor = v;
            }
        }
        if let Some(sla) = doc.sla_targets.filter(|m| !m.is_empty()) {
            self.sla_targets = sla;
        }
        if let Some(v) = doc.after_hours_available {
            self.after_hours_available = v;
        }
        if let Some(h) = doc.business_hours {
            if let Some(v) = h.start {
                self.business_hours.start = v;
            }
            if let Some(v) = h.end {
                self.business_hours.end = v;
            }
        }
        if let Some(t) = doc.thresholds {
            let target = &mut self.thresholds;
            if let Some(v) = t.fp_rate_good {
                target.fp_rate_good = v;
            }
            if let Some(v) = t.fp_rate_warning {
                target.fp_rate_warning = v;
            }
            if let Some(v) = t.automation_target {
                target.automation_target = v;
            }
            if let Some(v) = t.automation_warning {
                target.automation_warning = v;
            }
            if let Some(v) = t.manual_escalation_max {
                target.manual_escalation_max = v;
            }
            if let Some(v) = t.mttr_good {
                target.mttr_good = v;
            }
            if let Some(v) = t.mttr_warning {
                target.mttr_warning = v;
            }
            if let Some(v) = t.high_severity_concentration {
                target.high_severity_concentration = v;
            }
        }
        if let Some(o) = doc.operator {
            if let Some(v) = o.soc_marker {
                self.operator.soc_marker = v;
            }
            if let Some(v) = o.analyst_escalation_label {
                self.operator.analyst_escalation_label = v;
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let invalid = |msg: &str, details: String| {
            Err(AppError::new("CONFIG_INVALID", msg.to_string()).with_details(details))
        };

        let hours = self.business_hours;
        if hours.end > 24 || hours.start >= hours.end {
            return invalid(
                "Business hours must satisfy 0 <= start < end <= 24",
                format!("start={}; end={}", hours.start, hours.end),
            );
        }
        let b = &self.industry_benchmarks;
        if b.mttr_minutes <= 0 || b.mttd_minutes <= 0 || b.incidents_per_day.is_nan() || b.incidents_per_day <= 0.0 {
            return invalid(
                "Industry benchmarks must be positive",
                format!(
                    "mttr_minutes={}; mttd_minutes={}; incidents_per_day={}",
                    b.mttr_minutes, b.mttd_minutes, b.incidents_per_day
                ),
            );
        }
        let c = &self.cost_modeling;
        if c.analyst_hourly_rate < 0 || c.coverage_hourly_rate < 0 || c.breach_cost_estimate < 0 {
            return invalid(
                "Cost modeling rates must not be negative",
                format!(
                    "analyst_hourly_rate={}; coverage_hourly_rate={}; breach_cost_estimate={}",
                    c.analyst_hourly_rate, c.coverage_hourly_rate, c.breach_cost_estimate
                ),
            );
        }
        if c.coverage_allocation_divisor.is_nan() || c.coverage_allocation_divisor <= 0.0 {
            return invalid(
                "coverage_allocation_divisor must be positive",
                format!("value={}", c.coverage_allocation_divisor),
            );
        }
        if let Some((label, minutes)) = self.sla_targets.iter().find(|(_, m)| **m < 0) {
            return invalid(
                "SLA targets must not be negative",
                format!("{label}={minutes}"),
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BenchmarksDocument {
    pub mttr_minutes: Option<i64>,
    pub mttd_minutes: Option<i64>,
    pub incidents_per_day: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReportPeriodDocument {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CostModelDocument {
    pub analyst_hourly_rate: Option<i64>,
    pub coverage_hourly_rate: Option<i64>,
    pub breach_cost_estimate: Option<i64>,
    pub handling_hours_per_incident: Option<f64>,
    pub containment_value_fraction: Option<f64>,
    pub coverage_allocation_divisor: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BusinessHoursDocument {
    pub start: Option<u8>,
    pub end: Option<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ThresholdsDocument {
    pub fp_rate_good: Option<f64>,
    pub fp_rate_warning: Option<f64>,
    pub automation_target: Option<f64>,
    pub automation_warning: Option<f64>,
    pub manual_escalation_max: Option<f64>,
    pub mttr_good: Option<i64>,
    pub mttr_warning: Option<i64>,
    pub high_severity_concentration: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperatorDocument {
    pub soc_marker: Option<String>,
    pub analyst_escalation_label: Option<String>,
}

/// On-disk YAML shape. Every field is optional; absent fields keep their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigDocument {
    pub tier: Option<String>,
    pub client_name_override: Option<String>,
    pub industry_benchmarks_available: Option<bool>,
    pub industry_benchmarks: Option<BenchmarksDocument>,
    pub report_period: Option<ReportPeriodDocument>,
    pub cost_modeling: Option<CostModelDocument>,
    pub sla_targets: Option<BTreeMap<String, i64>>,
    pub after_hours_available: Option<bool>,
    pub business_hours: Option<BusinessHoursDocument>,
    pub thresholds: Option<ThresholdsDocument>,
    pub operator: Option<OperatorDocument>,
}

pub fn parse_config_text(text: &str) -> Result<ClientConfig, AppError> {
    if text.trim().is_empty() {
        return Ok(ClientConfig::default());
    }
    let doc: Option<ConfigDocument> = serde_yaml::from_str(text).map_err(|e| {
        AppError::new("CONFIG_PARSE_FAILED", "Failed to parse configuration YAML")
            .with_details(e.to_string())
    })?;
    let config = ClientConfig::default().overlay(doc.unwrap_or_default());
    config.validate()?;
    Ok(config)
}

/// Load a client configuration. `None` yields defaults.
pub fn load_config(path: Option<&Path>) -> Result<ClientConfig, AppError> {
    let Some(path) = path else {
        return Ok(ClientConfig::default());
    };
    if !path.exists() {
        return Err(
            AppError::new("CONFIG_NOT_FOUND", "Configuration file not found")
                .with_details(format!("path={}", path.display())),
        );
    }
    let text = std::fs::read_to_string(path).map_err(|e| {
        AppError::new("CONFIG_READ_FAILED", "Failed to read configuration file")
            .with_details(format!("path={}; err={e}", path.display()))
    })?;
    let config = parse_config_text(&text)?;
    info!(path = %path.display(), tier = %config.tier, "loaded client configuration");
    Ok(config)
}

pub const DEFAULT_CONFIG_YAML: &str = r#"# Client configuration for the escalation summary report.
# Copy this file and customize it for each client.

tier: "Standard Tier"
client_name_override: null
industry_benchmarks_available: true

industry_benchmarks:
  mttr_minutes: 192
  mttd_minutes: 66
  incidents_per_day: 11.4

# report_period:
#   start: "2025-08-01"
#   end: "2025-08-31"

cost_modeling:
  analyst_hourly_rate: 85
  coverage_hourly_rate: 220
  breach_cost_estimate: 4200000
  handling_hours_per_incident: 1.5
  containment_value_fraction: 0.15
  coverage_allocation_divisor: 10.0

sla_targets:
  Critical: 30
  High: 60
  Medium: 180
  Low: 240

after_hours_available: true

business_hours:
  start: 8
  end: 18

thresholds:
  fp_rate_good: 10.0
  fp_rate_warning: 15.0
  automation_target: 88.0
  automation_warning: 80.0
  manual_escalation_max: 12.0
  mttr_good: 150
  mttr_warning: 200
  high_severity_concentration: 50.0

operator:
  soc_marker: "CRITICALSTART"
  analyst_escalation_label: "CS SOC"
"#;

/// Write the default configuration document. Never overwrites an existing file.
pub fn write_default_config(path: &Path) -> Result<(), AppError> {
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| {
            let code = if e.kind() == std::io::ErrorKind::AlreadyExists {
                "CONFIG_ALREADY_EXISTS"
            } else {
                "CONFIG_WRITE_FAILED"
            };
            AppError::new(code, "Failed to create configuration file")
                .with_details(format!("path={}; err={e}", path.display()))
        })?;
    file.write_all(DEFAULT_CONFIG_YAML.as_bytes()).map_err(|e| {
        AppError::new("CONFIG_WRITE_FAILED", "Failed to write configuration file")
            .with_details(format!("path={}; err={e}", path.display()))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_document_matches_builtin_defaults() {
        let parsed = parse_config_text(DEFAULT_CONFIG_YAML).unwrap();
        assert_eq!(parsed, ClientConfig::default());
    }

    #[test]
    fn overlay_replaces_only_present_fields() {
        let cfg = parse_config_text(
            r#"
tier: "Signature Tier"
industry_benchmarks:
  mttr_minutes: 120
sla_targets:
  Critical: 15
thresholds:
  fp_rate_good: 8.0
"#,
        )
        .unwrap();
        assert_eq!(cfg.tier, "Signature Tier");
        assert_eq!(cfg.industry_benchmarks.mttr_minutes, 120);
        assert_eq!(cfg.industry_benchmarks.mttd_minutes, 66);
        assert_eq!(cfg.thresholds.fp_rate_good, 8.0);
        assert_eq!(cfg.thresholds.fp_rate_warning, 15.0);
        // Whole map replaced: High falls back to the default target.
        assert_eq!(cfg.sla_target(Priority::Critical), 15);
        assert_eq!(cfg.sla_target(Priority::High), DEFAULT_SLA_TARGET_MINUTES);
    }

    #[test]
    fn empty_and_null_documents_yield_defaults() {
        assert_eq!(parse_config_text("").unwrap(), ClientConfig::default());
        assert_eq!(parse_config_text("~\n").unwrap(), ClientConfig::default());
        assert_eq!(
            parse_config_text("client_name_override: null\n").unwrap(),
            ClientConfig::default()
        );
    }

    #[test]
    fn malformed_and_invalid_documents() {
        let err = parse_config_text("tier: [unclosed").unwrap_err();
        assert_eq!(err.code, "CONFIG_PARSE_FAILED");

        let err = parse_config_text("business_hours:\n  start: 18\n  end: 8\n").unwrap_err();
        assert_eq!(err.code, "CONFIG_INVALID");

        let err = parse_config_text("industry_benchmarks:\n  mttr_minutes: 0\n").unwrap_err();
        assert_eq!(err.code, "CONFIG_INVALID");
    }

    #[test]
    fn load_config_distinguishes_missing_files() {
        assert_eq!(load_config(None).unwrap(), ClientConfig::default());
        let err = load_config(Some(Path::new("/no/such/client.yaml"))).unwrap_err();
        assert_eq!(err.code, "CONFIG_NOT_FOUND");
        assert!(err.is_not_found());
    }

    #[test]
    fn init_config_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.yaml");
        write_default_config(&path).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), ClientConfig::default());

        let err = write_default_config(&path).unwrap_err();
        assert_eq!(err.code, "CONFIG_ALREADY_EXISTS");
    }

    #[test]
    fn operator_markers_are_case_insensitive() {
        let ops = OperatorMarkers::default();
        assert!(ops.is_operator("Jane Doe (CriticalStart)"));
        assert!(!ops.is_operator("Client Analyst"));
        assert!(ops.is_analyst_escalation("cs soc"));
        assert!(!ops.is_analyst_escalation("Playbook: Isolate"));
        assert_eq!(BusinessHours::default().definition(), "08:00-18:00, Mon-Fri");
    }
}
