use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::Date;
use tracing::info;

use crate::config::{load_config, ClientConfig};
use crate::domain::ValidationWarning;
use crate::error::AppError;
use crate::ingest::load_periods;
use crate::insights::generate_insights;
use crate::metrics::{compute_all_metrics, MetricGroup, MetricsResult};
use crate::registry::{client_config_path, get_client, load_registry, ClientEntry};
use crate::validate::validate_report;

/// Inputs for one report run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    /// Oldest period first; the last file is the current period.
    pub spreadsheets: Vec<PathBuf>,
    pub config_path: Option<PathBuf>,
    pub client_name_override: Option<String>,
    pub report_date: Date,
    pub client: Option<ClientEntry>,
}

impl ReportRequest {
    pub fn new(spreadsheets: Vec<PathBuf>, report_date: Date) -> Self {
        Self {
            spreadsheets,
            config_path: None,
            client_name_override: None,
            report_date,
            client: None,
        }
    }
}

/// Final structure handed to the renderer, plus completeness warnings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub data: MetricsResult,
    pub warnings: Vec<ValidationWarning>,
}

/// Registry entry and config path for a client id.
///
/// A client without a config path runs on defaults; a configured path that does not
/// exist is an error.
pub fn resolve_client(
    registry_path: &Path,
    client_id: &str,
) -> Result<(ClientEntry, Option<PathBuf>), AppError> {
    let registry = load_registry(registry_path)?;
    let entry = get_client(&registry, client_id)?.clone();
    let config_path = match client_config_path(registry_path, &registry, client_id) {
        Ok(p) => Some(p),
        Err(e) if e.code == "REGISTRY_CONFIG_MISSING" => None,
        Err(e) => return Err(e),
    };
    Ok((entry, config_path))
}

/// Apply request-level overrides: explicit name, then registry display name and tier.
pub fn effective_config(mut config: ClientConfig, req: &ReportRequest) -> ClientConfig {
    if let Some(entry) = &req.client {
        if config.client_name_override.is_none() {
            config.client_name_override = Some(entry.name.clone());
        }
        if let Some(tier) = &entry.tier {
            config.tier = tier.clone();
        }
    }
    if let Some(name) = &req.client_name_override {
        config.client_name_override = Some(name.clone());
    }
    config
}

fn contact_fields(client: Option<&ClientEntry>) -> MetricsResult {
    let field = |v: Option<&String>| Value::String(v.cloned().unwrap_or_default());
    let mut out = MetricsResult::new();
    out.insert("csm_name", field(client.and_then(|c| c.csm_name.as_ref())));
    out.insert("csm_email", field(client.and_then(|c| c.csm_email.as_ref())));
    out
}

/// Run the whole pipeline: config, spreadsheets, metrics, insights.
pub fn build_report(req: &ReportRequest) -> Result<Report, AppError> {
    let config = effective_config(load_config(req.config_path.as_deref())?, req);
    let batch = load_periods(&req.spreadsheets)?;

    let mut data = compute_all_metrics(&batch.periods, &batch.client_name, &config, req.report_date)?;
    let insights = generate_insights(&data, &config)?;
    data.merge_group(&insights)?;
    data.merge_entries("contact", contact_fields(req.client.as_ref()).into_map())?;

    let warnings = validate_report(&data);
    info!(
        client = %batch.client_name,
        periods = batch.periods.len(),
        incidents = batch.current().len(),
        warnings = warnings.len(),
        "report assembled"
    );
    Ok(Report { data, warnings })
}
