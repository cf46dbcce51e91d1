use std::path::PathBuf;

use esr_core::ingest::{load_periods, load_spreadsheet, period_date_range};
use time::macros::datetime;
use time::Duration;

fn fixture(rel: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures")
        .join(rel)
}

#[test]
fn loads_standard_export() {
    let load = load_spreadsheet(&fixture("exports/acme_2025_08.csv")).expect("load");
    assert_eq!(load.incidents.len(), 5);
    assert_eq!(load.skipped_empty_rows, 1);
    assert_eq!(
        load.datetime_columns,
        vec!["Created Datetime UTC", "Escalated Datetime (US/Central)"]
    );
    assert_eq!(load.timestamps_parsed.created, 5);
    assert_eq!(load.timestamps_parsed.escalated, 4);
    assert_eq!(load.timestamps_parsed.closed, 0);
    assert!(!load.resolved_columns.contains(&"Ticket Notes".to_string()));

    let first = &load.incidents[0];
    assert_eq!(first.incident_id.as_deref(), Some("INC-1001"));
    assert_eq!(first.created_utc, Some(datetime!(2025-08-01 09:00)));
    assert_eq!(first.escalated_local, Some(datetime!(2025-08-01 09:15)));
    assert_eq!(first.soc_ttr, Some(Duration::minutes(20)));
    assert_eq!(
        first.touched_by.as_deref(),
        Some("Alice (CRITICALSTART), Bob")
    );

    let second = &load.incidents[1];
    assert_eq!(second.escalated_local, Some(datetime!(2025-08-02 13:10)));

    // Unparseable and empty cells stay absent without failing the row.
    let last = &load.incidents[4];
    assert_eq!(last.soc_ttd, None);
    assert_eq!(last.product, None);
    assert_eq!(last.escalated_local, None);
    assert_eq!(last.soc_ttr, Some(Duration::minutes(45)));
}

#[test]
fn loads_burlington_export_into_the_same_fields() {
    let load = load_spreadsheet(&fixture("exports/burlington_2025_08.csv")).expect("load");
    assert_eq!(load.incidents.len(), 2);
    let b1 = &load.incidents[0];
    assert_eq!(b1.incident_id.as_deref(), Some("B-1"));
    // Offset stripped, wall clock kept.
    assert_eq!(b1.created_utc, Some(datetime!(2025-08-06 14:00)));
    assert_eq!(b1.created_local, Some(datetime!(2025-08-06 10:00)));
    assert_eq!(b1.escalated_local, Some(datetime!(2025-08-06 10:05)));
    assert_eq!(b1.escalation_paths.as_deref(), Some("Tier 1"));
    assert_eq!(b1.mitre_tactic_id.as_deref(), Some("TA0002"));
    assert_eq!(load.timestamps_parsed.created, 4);
    assert_eq!(load.timestamps_parsed.escalated, 2);
}

#[test]
fn missing_required_columns_fail_with_schema_error() {
    let err = load_spreadsheet(&fixture("exports/missing_priority.csv")).unwrap_err();
    assert_eq!(err.code, "INGEST_SCHEMA_MISSING_COLUMNS");
    assert!(err
        .details
        .as_deref()
        .unwrap_or_default()
        .contains("missing=current_priority"));
}

#[test]
fn missing_file_is_not_found() {
    let err = load_spreadsheet(&fixture("exports/nope.csv")).unwrap_err();
    assert_eq!(err.code, "INGEST_FILE_NOT_FOUND");
    assert!(err.is_not_found());
}

#[test]
fn unsupported_extension_is_rejected() {
    let err = load_spreadsheet(&fixture("config/acme.yaml")).unwrap_err();
    assert_eq!(err.code, "INGEST_UNSUPPORTED_FORMAT");
    assert!(!err.is_not_found());
}

#[test]
fn multi_period_batch_takes_current_organization() {
    let batch = load_periods(&[
        fixture("exports/acme_2025_07.csv"),
        fixture("exports/acme_2025_08.csv"),
    ])
    .expect("batch");
    assert_eq!(batch.periods.len(), 2);
    assert_eq!(batch.periods[0].len(), 4);
    assert_eq!(batch.current().len(), 5);
    // "Acme Corporation" appears only in the prior period.
    assert_eq!(batch.client_name, "Acme Corp");

    let (lo, hi) = period_date_range(batch.current()).expect("range");
    assert_eq!(lo, datetime!(2025-08-01 09:00));
    assert_eq!(hi, datetime!(2025-08-10 03:00));
}
