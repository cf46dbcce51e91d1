//! `esr`: command shell over the escalation report pipeline.
//!
//! Every command prints JSON on stdout for the slide renderer (or a human with `jq`).

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::{debug, warn};

use esr_core::config::write_default_config;
use esr_core::error::AppError;
use esr_core::registry::{list_clients, load_registry};
use esr_core::report::{build_report, resolve_client, ReportRequest};
use esr_core::validate::check_spreadsheet;

mod logging;

use logging::{init_logging_with_config, LoggingConfig};

#[derive(Parser, Debug)]
#[command(name = "esr")]
#[command(version)]
#[command(about = "Escalation report metrics from incident spreadsheet exports", long_about = None)]
struct Cli {
    /// Debug-level logs on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute the full report structure from one or more period exports
    Report {
        /// Spreadsheet exports, oldest first; the last one is the current period
        #[arg(required = true, value_name = "FILES")]
        files: Vec<PathBuf>,

        /// Client configuration YAML
        #[arg(short, long, value_name = "FILE", conflicts_with = "client")]
        config: Option<PathBuf>,

        /// Client registry YAML
        #[arg(long, value_name = "FILE", requires = "client")]
        registry: Option<PathBuf>,

        /// Client id in the registry
        #[arg(long, value_name = "ID", requires = "registry")]
        client: Option<String>,

        /// Display name overriding the spreadsheet organization
        #[arg(long, value_name = "NAME")]
        client_name: Option<String>,

        /// Report date (YYYY-MM-DD); defaults to today (UTC)
        #[arg(long, value_name = "DATE", value_parser = parse_report_date)]
        report_date: Option<Date>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Check a spreadsheet's columns and rows without computing metrics
    Check {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// List client ids in a registry
    Clients {
        #[arg(long, value_name = "FILE")]
        registry: PathBuf,

        #[arg(long)]
        tier: Option<String>,

        #[arg(long)]
        data_format: Option<String>,
    },

    /// Write the default client configuration document
    InitConfig {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}

fn parse_report_date(s: &str) -> Result<Date, String> {
    Date::parse(s.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), AppError> {
    let text = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        AppError::new("OUTPUT_SERIALIZE_FAILED", "Failed to serialize output")
            .with_details(e.to_string())
    })?;
    println!("{text}");
    Ok(())
}

#[derive(Debug, Serialize)]
struct InitConfigResponse {
    path: String,
}

fn report_request(
    files: Vec<PathBuf>,
    config: Option<PathBuf>,
    registry: Option<&Path>,
    client: Option<&str>,
    client_name: Option<String>,
    report_date: Date,
) -> Result<ReportRequest, AppError> {
    let mut req = ReportRequest::new(files, report_date);
    req.config_path = config;
    req.client_name_override = client_name;
    if let (Some(registry), Some(id)) = (registry, client) {
        let (entry, config_path) = resolve_client(registry, id)?;
        req.config_path = config_path;
        req.client = Some(entry);
    }
    Ok(req)
}

fn run(command: Commands) -> Result<(), AppError> {
    match command {
        Commands::Report {
            files,
            config,
            registry,
            client,
            client_name,
            report_date,
            pretty,
        } => {
            let date = report_date.unwrap_or_else(|| OffsetDateTime::now_utc().date());
            let req = report_request(
                files,
                config,
                registry.as_deref(),
                client.as_deref(),
                client_name,
                date,
            )?;
            debug!(files = req.spreadsheets.len(), report_date = %date, "building report");
            let report = build_report(&req)?;
            for w in &report.warnings {
                warn!(code = %w.code, "{}", w.message);
            }
            print_json(&report, pretty)
        }
        Commands::Check { file } => {
            let check = check_spreadsheet(&file);
            print_json(&check, true)?;
            match check.error {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
        Commands::Clients {
            registry,
            tier,
            data_format,
        } => {
            let reg = load_registry(&registry)?;
            let ids = list_clients(&reg, tier.as_deref(), data_format.as_deref());
            print_json(&ids, false)
        }
        Commands::InitConfig { path } => {
            write_default_config(&path)?;
            print_json(
                &InitConfigResponse {
                    path: path.display().to_string(),
                },
                false,
            )
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging_with_config(LoggingConfig::from_flags(cli.verbose, cli.json_logs));

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let text = serde_json::to_string(&err).unwrap_or_else(|_| err.to_string());
            eprintln!("{text}");
            ExitCode::FAILURE
        }
    }
}
