use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;
use tracing::{debug, info, warn};

use crate::domain::Incident;
use crate::error::AppError;
use crate::ingest::cells::{read_sheet, CellValue, SheetRows};
use crate::ingest::columns::{resolve_header, Field, FieldKind, TimestampSlot};

/// Header resolution for one spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnResolution {
    /// (column index, field) in left-to-right order.
    pub columns: Vec<(usize, Field)>,
    pub recognized_headers: Vec<String>,
    pub unrecognized_headers: Vec<String>,
}

impl ColumnResolution {
    pub fn has(&self, field: Field) -> bool {
        self.columns.iter().any(|(_, f)| *f == field)
    }

    pub fn missing_required(&self) -> Vec<Field> {
        Field::REQUIRED
            .iter()
            .copied()
            .filter(|f| !self.has(*f))
            .collect()
    }
}

pub fn resolve_columns(headers: &[String]) -> Result<ColumnResolution, AppError> {
    let mut columns = Vec::new();
    let mut recognized_headers = Vec::new();
    let mut unrecognized_headers = Vec::new();
    for (idx, header) in headers.iter().enumerate() {
        match resolve_header(header)? {
            Some(field) => {
                columns.push((idx, field));
                recognized_headers.push(header.trim().to_string());
            }
            None => {
                let trimmed = header.trim();
                if !trimmed.is_empty() {
                    unrecognized_headers.push(trimmed.to_string());
                }
            }
        }
    }
    Ok(ColumnResolution {
        columns,
        recognized_headers,
        unrecognized_headers,
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimestampParseCounts {
    pub created: usize,
    pub escalated: usize,
    pub closed: usize,
}

/// Parsed spreadsheet plus the load statistics operators use to sanity-check an export.
#[derive(Debug, Clone, PartialEq)]
pub struct SpreadsheetLoad {
    pub source: String,
    pub incidents: Vec<Incident>,
    pub resolved_columns: Vec<String>,
    pub datetime_columns: Vec<String>,
    pub timestamps_parsed: TimestampParseCounts,
    pub skipped_empty_rows: usize,
}

fn set_text(slot: &mut Option<String>, cell: &CellValue) {
    if slot.is_none() {
        *slot = cell.as_text();
    }
}

fn set_ts(slot: &mut Option<PrimitiveDateTime>, cell: &CellValue) -> bool {
    if slot.is_some() {
        return false;
    }
    *slot = cell.as_timestamp();
    slot.is_some()
}

fn set_duration(slot: &mut Option<time::Duration>, cell: &CellValue) {
    if slot.is_none() {
        *slot = cell.as_duration();
    }
}

fn text_slot(inc: &mut Incident, field: Field) -> Option<&mut Option<String>> {
    let slot = match field {
        Field::IncidentId => &mut inc.incident_id,
        Field::IncidentUrl => &mut inc.incident_url,
        Field::VendorIncidentId => &mut inc.vendor_incident_id,
        Field::VendorIncidentUrl => &mut inc.vendor_incident_url,
        Field::IncidentTitle => &mut inc.incident_title,
        Field::Organization => &mut inc.organization,
        Field::Product => &mut inc.product,
        Field::DeploymentStatus => &mut inc.deployment_status,
        Field::InitialEscalationMethod => &mut inc.initial_escalation_method,
        Field::PlaybookUrl => &mut inc.playbook_url,
        Field::CurrentStatus => &mut inc.current_status,
        Field::Verdict => &mut inc.verdict,
        Field::CurrentPriority => &mut inc.current_priority,
        Field::CurrentCategory => &mut inc.current_category,
        Field::EscalationPaths => &mut inc.escalation_paths,
        Field::NotificationGroups => &mut inc.notification_groups,
        Field::AssignedUsers => &mut inc.assigned_users,
        Field::TouchedBy => &mut inc.touched_by,
        Field::ClosedBy => &mut inc.closed_by,
        Field::SocLastComment => &mut inc.soc_last_comment,
        Field::CustomerLastComment => &mut inc.customer_last_comment,
        Field::ResponseAction => &mut inc.response_action,
        Field::ActionTarget => &mut inc.action_target,
        Field::TargetType => &mut inc.target_type,
        Field::ActionProvider => &mut inc.action_provider,
        Field::ExecutedBy => &mut inc.executed_by,
        Field::ResponseActionStatus => &mut inc.response_action_status,
        Field::MitreTacticId => &mut inc.mitre_tactic_id,
        Field::MitreTacticName => &mut inc.mitre_tactic_name,
        Field::MitreTechniqueId => &mut inc.mitre_technique_id,
        Field::MitreTechniqueName => &mut inc.mitre_technique_name,
        Field::VendorSeverity => &mut inc.vendor_severity,
        _ => return None,
    };
    Some(slot)
}

fn timestamp_slot(inc: &mut Incident, field: Field) -> Option<&mut Option<PrimitiveDateTime>> {
    let slot = match field {
        Field::CreatedUtc => &mut inc.created_utc,
        Field::CreatedLocal => &mut inc.created_local,
        Field::LastUpdatedUtc => &mut inc.last_updated_utc,
        Field::LastUpdatedLocal => &mut inc.last_updated_local,
        Field::EscalatedUtc => &mut inc.escalated_utc,
        Field::EscalatedLocal => &mut inc.escalated_local,
        Field::ClosedUtc => &mut inc.closed_utc,
        Field::ClosedLocal => &mut inc.closed_local,
        Field::ExecutedDate => &mut inc.executed_date,
        _ => return None,
    };
    Some(slot)
}

fn duration_slot(inc: &mut Incident, field: Field) -> Option<&mut Option<time::Duration>> {
    let slot = match field {
        Field::SocTtr => &mut inc.soc_ttr,
        Field::SocTtd => &mut inc.soc_ttd,
        Field::CustomerTtr => &mut inc.customer_ttr,
        Field::CustomerTtd => &mut inc.customer_ttd,
        _ => return None,
    };
    Some(slot)
}

/// Convert one body row. Returns `None` when every cell is empty.
///
/// When several columns feed the same field, the leftmost usable value wins.
pub fn incident_from_row(
    row: &[CellValue],
    resolution: &ColumnResolution,
    counts: &mut TimestampParseCounts,
) -> Option<Incident> {
    if row.iter().all(CellValue::is_empty) {
        return None;
    }

    let mut inc = Incident::default();
    for (idx, field) in &resolution.columns {
        let Some(cell) = row.get(*idx) else { continue };
        match field.kind() {
            FieldKind::Text => {
                if let Some(slot) = text_slot(&mut inc, *field) {
                    set_text(slot, cell);
                }
            }
            FieldKind::Timestamp => {
                let parsed = timestamp_slot(&mut inc, *field)
                    .map(|slot| set_ts(slot, cell))
                    .unwrap_or(false);
                if parsed {
                    match field.timestamp_slot() {
                        Some(TimestampSlot::Created) => counts.created += 1,
                        Some(TimestampSlot::Escalated) => counts.escalated += 1,
                        Some(TimestampSlot::Closed) => counts.closed += 1,
                        None => {}
                    }
                }
            }
            FieldKind::Duration => {
                if let Some(slot) = duration_slot(&mut inc, *field) {
                    set_duration(slot, cell);
                }
            }
        }
    }
    Some(inc)
}

/// Parse an already-read sheet into incidents.
pub fn parse_sheet(source: &str, sheet: &SheetRows) -> Result<SpreadsheetLoad, AppError> {
    let resolution = resolve_columns(&sheet.headers)?;

    let missing = resolution.missing_required();
    if !missing.is_empty() {
        let names = missing.iter().map(|f| f.name()).collect::<Vec<_>>();
        return Err(AppError::new(
            "INGEST_SCHEMA_MISSING_COLUMNS",
            "Spreadsheet is missing required columns",
        )
        .with_details(format!("source={source}; missing={}", names.join(", "))));
    }

    let datetime_columns = resolution
        .columns
        .iter()
        .filter(|(_, f)| f.kind() == FieldKind::Timestamp)
        .filter_map(|(idx, _)| sheet.headers.get(*idx))
        .map(|h| h.trim().to_string())
        .collect::<Vec<_>>();
    info!(source, columns = ?datetime_columns, "datetime columns found");

    let mut counts = TimestampParseCounts::default();
    let mut incidents = Vec::new();
    let mut skipped_empty_rows = 0;
    for row in &sheet.rows {
        match incident_from_row(row, &resolution, &mut counts) {
            Some(inc) => incidents.push(inc),
            None => skipped_empty_rows += 1,
        }
    }

    info!(
        source,
        incidents = incidents.len(),
        created = counts.created,
        escalated = counts.escalated,
        closed = counts.closed,
        "parsed spreadsheet"
    );

    let sample_dates = incidents
        .iter()
        .take(5)
        .filter_map(|inc| inc.escalated_utc.or(inc.created_utc).or(inc.closed_utc))
        .map(|dt| dt.date().to_string())
        .collect::<Vec<_>>();
    if !sample_dates.is_empty() {
        debug!(source, samples = ?sample_dates, "sample dates");
    }

    Ok(SpreadsheetLoad {
        source: source.to_string(),
        incidents,
        resolved_columns: resolution.recognized_headers,
        datetime_columns,
        timestamps_parsed: counts,
        skipped_empty_rows,
    })
}

pub fn load_spreadsheet(path: &Path) -> Result<SpreadsheetLoad, AppError> {
    let sheet = read_sheet(path)?;
    parse_sheet(&path.display().to_string(), &sheet)
}

/// Incident sets for one client, oldest period first. The last period is current.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodBatch {
    pub periods: Vec<Vec<Incident>>,
    pub client_name: String,
}

impl PeriodBatch {
    pub fn current(&self) -> &[Incident] {
        self.periods.last().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Assemble a batch and choose the organization name.
///
/// The first current-period record with an organization wins; failing that the most
/// recent earlier period supplies it. Several distinct names are tolerated with a warning.
pub fn batch_from_periods(periods: Vec<Vec<Incident>>) -> Result<PeriodBatch, AppError> {
    if periods.is_empty() {
        return Err(AppError::new(
            "INGEST_NO_FILES",
            "At least one spreadsheet is required",
        ));
    }

    let mut distinct: Vec<&str> = Vec::new();
    for inc in periods.iter().flatten() {
        if let Some(org) = inc.organization.as_deref() {
            if !distinct.contains(&org) {
                distinct.push(org);
            }
        }
    }
    if distinct.is_empty() {
        return Err(AppError::new(
            "INGEST_NO_ORGANIZATION",
            "No organization names found in the data",
        ));
    }
    if distinct.len() > 1 {
        warn!(organizations = ?distinct, "multiple organizations found in data");
    }

    let client_name = periods
        .iter()
        .rev()
        .flat_map(|p| p.iter())
        .find_map(|inc| inc.organization.clone())
        .ok_or_else(|| {
            AppError::new(
                "INGEST_NO_ORGANIZATION",
                "No organization names found in the data",
            )
        })?;

    Ok(PeriodBatch {
        periods,
        client_name,
    })
}

/// Load spreadsheets in chronological order (oldest first).
pub fn load_periods(paths: &[PathBuf]) -> Result<PeriodBatch, AppError> {
    if paths.is_empty() {
        return Err(AppError::new(
            "INGEST_NO_FILES",
            "At least one spreadsheet is required",
        ));
    }
    let mut periods = Vec::with_capacity(paths.len());
    for path in paths {
        periods.push(load_spreadsheet(path)?.incidents);
    }
    batch_from_periods(periods)
}

/// Earliest and latest created/escalated timestamp across the records.
pub fn period_date_range(records: &[Incident]) -> Option<(PrimitiveDateTime, PrimitiveDateTime)> {
    let mut dates = records
        .iter()
        .flat_map(|inc| [inc.created(), inc.escalated_utc.or(inc.escalated_local)])
        .flatten();
    let first = dates.next()?;
    Some(dates.fold((first, first), |(lo, hi), dt| (lo.min(dt), hi.max(dt))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::cells::read_csv_text;
    use time::macros::datetime;

    fn org(name: &str) -> Incident {
        Incident {
            organization: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn missing_required_columns_are_named() {
        let sheet = read_csv_text("Organization,Product\nAcme,EDR\n").unwrap();
        let err = parse_sheet("t.csv", &sheet).unwrap_err();
        assert_eq!(err.code, "INGEST_SCHEMA_MISSING_COLUMNS");
        let details = err.details.unwrap();
        assert!(details.contains("current_status"));
        assert!(details.contains("current_priority"));
        assert!(!details.contains("organization,"));
    }

    #[test]
    fn blank_rows_skipped_and_bad_cells_absent() {
        let csv = "\
Organization,Current Status,Current Priority,Created Datetime UTC,CS SOC TTR (hh:mm),Extra
Acme,Closed,2 - HIGH,not a date,1:07,x
,,,,,
Acme,Open,Low,2025-08-04T10:00:00Z,bogus,
";
        let load = parse_sheet("t.csv", &read_csv_text(csv).unwrap()).unwrap();
        assert_eq!(load.incidents.len(), 2);
        assert_eq!(load.skipped_empty_rows, 1);
        assert_eq!(load.incidents[0].created_utc, None);
        assert_eq!(load.incidents[0].soc_ttr, Some(time::Duration::minutes(67)));
        assert_eq!(load.incidents[1].created_utc, Some(datetime!(2025-08-04 10:00)));
        assert_eq!(load.incidents[1].soc_ttr, None);
        assert_eq!(load.timestamps_parsed.created, 1);
        assert_eq!(load.datetime_columns, vec!["Created Datetime UTC"]);
        assert!(!load.resolved_columns.contains(&"Extra".to_string()));
    }

    #[test]
    fn leftmost_usable_column_wins() {
        let csv = "\
Organization,Current Status,Current Priority,Incident Id,Incident ID
Acme,Closed,High,,77
Acme,Closed,High,12,77
";
        let load = parse_sheet("t.csv", &read_csv_text(csv).unwrap()).unwrap();
        assert_eq!(load.incidents[0].incident_id.as_deref(), Some("77"));
        assert_eq!(load.incidents[1].incident_id.as_deref(), Some("12"));
    }

    #[test]
    fn organization_prefers_current_period() {
        let batch = batch_from_periods(vec![
            vec![org("Old Name")],
            vec![Incident::default(), org("New Name")],
        ])
        .unwrap();
        assert_eq!(batch.client_name, "New Name");
        assert_eq!(batch.current().len(), 2);

        let fallback =
            batch_from_periods(vec![vec![org("Older")], vec![org("Prior")], vec![Incident::default()]])
                .unwrap();
        assert_eq!(fallback.client_name, "Prior");
    }

    #[test]
    fn batch_without_organization_fails() {
        let err = batch_from_periods(vec![vec![Incident::default()]]).unwrap_err();
        assert_eq!(err.code, "INGEST_NO_ORGANIZATION");
        let err = batch_from_periods(Vec::new()).unwrap_err();
        assert_eq!(err.code, "INGEST_NO_FILES");
    }

    #[test]
    fn date_range_spans_created_and_escalated() {
        let records = vec![
            Incident {
                created_utc: Some(datetime!(2025-08-03 12:00)),
                escalated_utc: Some(datetime!(2025-08-20 09:00)),
                ..Default::default()
            },
            Incident {
                created_local: Some(datetime!(2025-08-01 08:00)),
                ..Default::default()
            },
        ];
        assert_eq!(
            period_date_range(&records),
            Some((datetime!(2025-08-01 08:00), datetime!(2025-08-20 09:00)))
        );
        assert_eq!(period_date_range(&[Incident::default()]), None);
    }
}
