use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::AppError;

/// Logical incident field a spreadsheet column resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    IncidentId,
    IncidentUrl,
    VendorIncidentId,
    VendorIncidentUrl,
    IncidentTitle,
    Organization,
    Product,
    DeploymentStatus,
    InitialEscalationMethod,
    PlaybookUrl,
    CurrentStatus,
    Verdict,
    CurrentPriority,
    CurrentCategory,
    CreatedUtc,
    CreatedLocal,
    LastUpdatedUtc,
    LastUpdatedLocal,
    EscalatedUtc,
    EscalatedLocal,
    ClosedUtc,
    ClosedLocal,
    EscalationPaths,
    NotificationGroups,
    AssignedUsers,
    TouchedBy,
    ClosedBy,
    SocLastComment,
    CustomerLastComment,
    ResponseAction,
    ActionTarget,
    TargetType,
    ActionProvider,
    ExecutedDate,
    ExecutedBy,
    ResponseActionStatus,
    SocTtr,
    SocTtd,
    CustomerTtr,
    CustomerTtd,
    MitreTacticId,
    MitreTacticName,
    MitreTechniqueId,
    MitreTechniqueName,
    VendorSeverity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Timestamp,
    Duration,
}

/// Timestamp slot counted in per-file parse statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampSlot {
    Created,
    Escalated,
    Closed,
}

impl Field {
    /// Fields that must resolve for a spreadsheet to load.
    pub const REQUIRED: [Field; 3] = [
        Field::Organization,
        Field::CurrentStatus,
        Field::CurrentPriority,
    ];

    pub fn kind(self) -> FieldKind {
        match self {
            Field::CreatedUtc
            | Field::CreatedLocal
            | Field::LastUpdatedUtc
            | Field::LastUpdatedLocal
            | Field::EscalatedUtc
            | Field::EscalatedLocal
            | Field::ClosedUtc
            | Field::ClosedLocal
            | Field::ExecutedDate => FieldKind::Timestamp,
            Field::SocTtr | Field::SocTtd | Field::CustomerTtr | Field::CustomerTtd => {
                FieldKind::Duration
            }
            _ => FieldKind::Text,
        }
    }

    pub fn timestamp_slot(self) -> Option<TimestampSlot> {
        match self {
            Field::CreatedUtc | Field::CreatedLocal => Some(TimestampSlot::Created),
            Field::EscalatedUtc | Field::EscalatedLocal => Some(TimestampSlot::Escalated),
            Field::ClosedUtc | Field::ClosedLocal => Some(TimestampSlot::Closed),
            _ => None,
        }
    }

    /// Stable snake_case name used in error details.
    pub fn name(self) -> &'static str {
        match self {
            Field::IncidentId => "incident_id",
            Field::IncidentUrl => "incident_url",
            Field::VendorIncidentId => "vendor_incident_id",
            Field::VendorIncidentUrl => "vendor_incident_url",
            Field::IncidentTitle => "incident_title",
            Field::Organization => "organization",
            Field::Product => "product",
            Field::DeploymentStatus => "deployment_status",
            Field::InitialEscalationMethod => "initial_escalation_method",
            Field::PlaybookUrl => "playbook_url",
            Field::CurrentStatus => "current_status",
            Field::Verdict => "verdict",
            Field::CurrentPriority => "current_priority",
            Field::CurrentCategory => "current_category",
            Field::CreatedUtc => "created_utc",
            Field::CreatedLocal => "created_local",
            Field::LastUpdatedUtc => "last_updated_utc",
            Field::LastUpdatedLocal => "last_updated_local",
            Field::EscalatedUtc => "escalated_utc",
            Field::EscalatedLocal => "escalated_local",
            Field::ClosedUtc => "closed_utc",
            Field::ClosedLocal => "closed_local",
            Field::EscalationPaths => "escalation_paths",
            Field::NotificationGroups => "notification_groups",
            Field::AssignedUsers => "assigned_users",
            Field::TouchedBy => "touched_by",
            Field::ClosedBy => "closed_by",
            Field::SocLastComment => "soc_last_comment",
            Field::CustomerLastComment => "customer_last_comment",
            Field::ResponseAction => "response_action",
            Field::ActionTarget => "action_target",
            Field::TargetType => "target_type",
            Field::ActionProvider => "action_provider",
            Field::ExecutedDate => "executed_date",
            Field::ExecutedBy => "executed_by",
            Field::ResponseActionStatus => "response_action_status",
            Field::SocTtr => "soc_ttr",
            Field::SocTtd => "soc_ttd",
            Field::CustomerTtr => "customer_ttr",
            Field::CustomerTtd => "customer_ttd",
            Field::MitreTacticId => "mitre_tactic_id",
            Field::MitreTacticName => "mitre_tactic_name",
            Field::MitreTechniqueId => "mitre_technique_id",
            Field::MitreTechniqueName => "mitre_technique_name",
            Field::VendorSeverity => "vendor_severity",
        }
    }

    /// Header spelling of the standard export profile (first alias in the table).
    pub fn primary_header(self) -> &'static str {
        COLUMN_ALIASES
            .iter()
            .find(|(_, f)| *f == self)
            .map(|(h, _)| *h)
            .unwrap_or(self.name())
    }

    /// Every field, in export column order.
    pub fn all() -> Vec<Field> {
        let mut out: Vec<Field> = Vec::new();
        for (_, f) in COLUMN_ALIASES {
            if !out.contains(f) {
                out.push(*f);
            }
        }
        out
    }
}

/// Header spelling -> logical field, covering the standard and Burlington export profiles.
/// The first entry per field is its standard spelling.
pub const COLUMN_ALIASES: &[(&str, Field)] = &[
    ("Incident Id", Field::IncidentId),
    ("Incident ID", Field::IncidentId),
    ("Incident URL", Field::IncidentUrl),
    ("Vendor Incident Id", Field::VendorIncidentId),
    ("Vendor Incident ID", Field::VendorIncidentId),
    ("Vendor Incident URL", Field::VendorIncidentUrl),
    ("Incident Title", Field::IncidentTitle),
    ("Organization", Field::Organization),
    ("Product", Field::Product),
    ("Deployment Status", Field::DeploymentStatus),
    ("Initial Escalation Method", Field::InitialEscalationMethod),
    ("Playbook URL", Field::PlaybookUrl),
    ("Current Status", Field::CurrentStatus),
    ("CS SOC Verdict", Field::Verdict),
    ("Current Priority", Field::CurrentPriority),
    ("Current Category", Field::CurrentCategory),
    ("Created Datetime UTC", Field::CreatedUtc),
    ("Created Datetime (UTC)", Field::CreatedUtc),
    ("Created Datetime (US/Central)", Field::CreatedLocal),
    ("Created Datetime (User TZ - US/Eastern)", Field::CreatedLocal),
    ("Last Updated Datetime UTC", Field::LastUpdatedUtc),
    ("Last Updated Datetime (UTC)", Field::LastUpdatedUtc),
    ("Last Updated Datetime (US/Central)", Field::LastUpdatedLocal),
    ("Last Updated Datetime (User TZ - US/Eastern)", Field::LastUpdatedLocal),
    ("Escalated Datetime UTC", Field::EscalatedUtc),
    ("Escalated Datetime (UTC)", Field::EscalatedUtc),
    ("Escalated Datetime (US/Central)", Field::EscalatedLocal),
    ("Escalated Datetime (User TZ - US/Eastern)", Field::EscalatedLocal),
    ("Closed Datetime UTC", Field::ClosedUtc),
    ("Closed Datetime (UTC)", Field::ClosedUtc),
    ("Closed Datetime (US/Central)", Field::ClosedLocal),
    ("Closed Datetime (User TZ - US/Eastern)", Field::ClosedLocal),
    ("Escalation Paths", Field::EscalationPaths),
    ("Escalation Path", Field::EscalationPaths),
    ("Notification Groups", Field::NotificationGroups),
    ("Assigned Users", Field::AssignedUsers),
    ("Touched By", Field::TouchedBy),
    ("Closed By", Field::ClosedBy),
    ("CS SOC Last Comment", Field::SocLastComment),
    ("Customer Last Comment", Field::CustomerLastComment),
    ("Response Action", Field::ResponseAction),
    ("Action Target", Field::ActionTarget),
    ("Target Type", Field::TargetType),
    ("Action Provider", Field::ActionProvider),
    ("Executed Date", Field::ExecutedDate),
    ("Executed By", Field::ExecutedBy),
    ("Response Action Status", Field::ResponseActionStatus),
    ("CS SOC TTR (hh:mm)", Field::SocTtr),
    ("CS SOC TTD (hh:mm)", Field::SocTtd),
    ("Customer TTR (hh:mm)", Field::CustomerTtr),
    ("Customer TTD (hh:mm)", Field::CustomerTtd),
    ("MITRE Tactic Id", Field::MitreTacticId),
    ("MITRE Tactic ID", Field::MitreTacticId),
    ("MITRE Tactic Name", Field::MitreTacticName),
    ("MITRE Technique Id", Field::MitreTechniqueId),
    ("MITRE Technique ID", Field::MitreTechniqueId),
    ("MITRE Technique Name", Field::MitreTechniqueName),
    ("Vendor Severity", Field::VendorSeverity),
];

/// Build the header lookup, rejecting a spelling that maps to two different fields.
pub fn build_alias_index(
    entries: &[(&'static str, Field)],
) -> Result<HashMap<&'static str, Field>, AppError> {
    let mut index = HashMap::with_capacity(entries.len());
    for (header, field) in entries {
        if let Some(existing) = index.insert(*header, *field) {
            if existing != *field {
                return Err(AppError::new(
                    "INGEST_ALIAS_CONFLICT",
                    "Column alias maps to more than one field",
                )
                .with_details(format!(
                    "header={header}; fields={},{}",
                    existing.name(),
                    field.name()
                )));
            }
        }
    }
    Ok(index)
}

static ALIAS_INDEX: OnceLock<Result<HashMap<&'static str, Field>, AppError>> = OnceLock::new();

pub fn alias_index() -> Result<&'static HashMap<&'static str, Field>, AppError> {
    ALIAS_INDEX
        .get_or_init(|| build_alias_index(COLUMN_ALIASES))
        .as_ref()
        .map_err(Clone::clone)
}

/// Resolve one header cell. Surrounding whitespace is ignored; matching is otherwise exact.
pub fn resolve_header(header: &str) -> Result<Option<Field>, AppError> {
    Ok(alias_index()?.get(header.trim()).copied())
}
