use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::ValidationWarning;
use crate::error::AppError;
use crate::ingest::cells::{read_sheet, SheetRows};
use crate::ingest::columns::Field;
use crate::ingest::incidents::resolve_columns;
use crate::metrics::MetricsResult;

/// Outcome of a dry-run spreadsheet check. Never an error; failures land in `error`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpreadsheetCheck {
    pub source: String,
    /// Logical fields with no matching column, by their primary header.
    pub missing_columns: Vec<String>,
    /// Subset of `missing_columns` that would make the load fail.
    pub missing_required: Vec<String>,
    /// Columns that will be ignored.
    pub unexpected_columns: Vec<String>,
    pub data_rows: usize,
    pub error: Option<AppError>,
    pub messages: Vec<String>,
}

impl SpreadsheetCheck {
    fn failed(source: &str, err: AppError) -> Self {
        Self {
            source: source.to_string(),
            missing_columns: Vec::new(),
            missing_required: Vec::new(),
            unexpected_columns: Vec::new(),
            data_rows: 0,
            messages: vec![format!("Error reading file: {err}")],
            error: Some(err),
        }
    }

    /// True when a real load of this file would succeed with at least one record.
    pub fn is_loadable(&self) -> bool {
        self.error.is_none() && self.missing_required.is_empty() && self.data_rows > 0
    }
}

pub fn check_sheet(source: &str, sheet: &SheetRows) -> SpreadsheetCheck {
    let resolution = match resolve_columns(&sheet.headers) {
        Ok(r) => r,
        Err(e) => return SpreadsheetCheck::failed(source, e),
    };

    let mut missing_columns = Field::all()
        .into_iter()
        .filter(|f| !resolution.has(*f))
        .map(|f| f.primary_header().to_string())
        .collect::<Vec<_>>();
    missing_columns.sort();
    let missing_required = resolution
        .missing_required()
        .into_iter()
        .map(|f| f.primary_header().to_string())
        .collect::<Vec<_>>();
    let mut unexpected_columns = resolution.unrecognized_headers.clone();
    unexpected_columns.sort();
    unexpected_columns.dedup();

    let data_rows = sheet
        .rows
        .iter()
        .filter(|row| row.iter().any(|c| !c.is_empty()))
        .count();

    let mut messages = Vec::new();
    if !missing_columns.is_empty() {
        messages.push(format!("Missing columns: {}", missing_columns.join(", ")));
    }
    if !missing_required.is_empty() {
        messages.push(format!("Missing required columns: {}", missing_required.join(", ")));
    }
    if !unexpected_columns.is_empty() {
        messages.push(format!(
            "Unexpected columns (ignored): {}",
            unexpected_columns.join(", ")
        ));
    }
    if data_rows == 0 {
        messages.push("No data rows found in file".to_string());
    } else {
        messages.push(format!("Found {data_rows} data rows"));
    }

    SpreadsheetCheck {
        source: source.to_string(),
        missing_columns,
        missing_required,
        unexpected_columns,
        data_rows,
        error: None,
        messages,
    }
}

/// Check that a spreadsheet will parse, without loading records.
pub fn check_spreadsheet(path: &Path) -> SpreadsheetCheck {
    let source = path.display().to_string();
    match read_sheet(path) {
        Ok(sheet) => check_sheet(&source, &sheet),
        Err(e) => SpreadsheetCheck::failed(&source, e),
    }
}

/// Completeness warnings for a finished metrics/report mapping.
pub fn validate_report(report: &MetricsResult) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if report.get_str("client_name").map_or(true, str::is_empty) {
        warnings.push(ValidationWarning::new(
            "REPORT_CLIENT_NAME_EMPTY",
            "Client name is empty",
        ));
    }
    if report.get_i64("incidents_escalated").unwrap_or(0) == 0 {
        warnings.push(ValidationWarning::new(
            "REPORT_NO_INCIDENTS",
            "No incidents found in data",
        ));
    }
    if report.get_i64("mttr_minutes").unwrap_or(0) == 0 {
        warnings.push(ValidationWarning::new(
            "REPORT_NO_RESPONSE_DATA",
            "MTTR is zero - no response time data",
        ));
    }

    let fp = report.get_f64("false_positive_rate").unwrap_or(0.0);
    if fp > 50.0 {
        warnings.push(
            ValidationWarning::new(
                "REPORT_FP_RATE_HIGH",
                format!("False positive rate ({fp}%) seems unusually high"),
            )
            .with_details(format!("false_positive_rate={fp}")),
        );
    }
    let advantage = report.get_f64("response_advantage_percent").unwrap_or(0.0);
    if advantage < -50.0 {
        warnings.push(
            ValidationWarning::new(
                "REPORT_RESPONSE_SLOW",
                format!("Response advantage ({advantage}%) indicates much slower than industry"),
            )
            .with_details(format!("response_advantage_percent={advantage}")),
        );
    }

    if report.get_array("detection_sources").is_empty() {
        warnings.push(ValidationWarning::new(
            "REPORT_NO_DETECTION_SOURCES",
            "No detection sources found",
        ));
    }
    if report.get_array("tactics").is_empty() {
        warnings.push(ValidationWarning::new(
            "REPORT_NO_MITRE_TACTICS",
            "No MITRE tactics data found",
        ));
    }
    warnings
}
