use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use time::macros::format_description;
use time::{Duration, PrimitiveDateTime};

use crate::error::AppError;
use crate::normalize::timestamps::{
    parse_duration_text, parse_timestamp_text, serial_to_datetime, serial_to_duration,
};

/// A raw spreadsheet cell before field-level interpretation.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    DateTime(PrimitiveDateTime),
    Duration(Duration),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text rendering for string fields. Whole numbers drop the trailing `.0`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => {
                let t = s.trim();
                if t.is_empty() {
                    None
                } else {
                    Some(t.to_string())
                }
            }
            CellValue::Number(n) => Some(render_number(*n)),
            CellValue::DateTime(dt) => dt
                .format(format_description!(
                    "[year]-[month]-[day] [hour]:[minute]:[second]"
                ))
                .ok(),
            CellValue::Duration(d) => {
                let minutes = d.whole_minutes();
                Some(format!("{}:{:02}", minutes / 60, minutes % 60))
            }
        }
    }

    pub fn as_timestamp(&self) -> Option<PrimitiveDateTime> {
        match self {
            CellValue::DateTime(dt) => Some(*dt),
            CellValue::Text(s) => parse_timestamp_text(s),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            CellValue::Duration(d) => Some(*d),
            CellValue::Text(s) => parse_duration_text(s),
            _ => None,
        }
    }
}

fn render_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Header row plus body rows of the first worksheet (or the CSV file).
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRows {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    Workbook,
}

pub fn detect_format(path: &Path) -> Result<SheetFormat, AppError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => Ok(SheetFormat::Csv),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(SheetFormat::Workbook),
        _ => Err(AppError::new(
            "INGEST_UNSUPPORTED_FORMAT",
            "Unsupported spreadsheet format",
        )
        .with_details(format!("path={}", path.display()))),
    }
}

/// Read a spreadsheet from disk. The path must exist and carry a supported extension.
pub fn read_sheet(path: &Path) -> Result<SheetRows, AppError> {
    if !path.exists() {
        return Err(
            AppError::new("INGEST_FILE_NOT_FOUND", "Spreadsheet file not found")
                .with_details(format!("path={}", path.display())),
        );
    }
    match detect_format(path)? {
        SheetFormat::Csv => {
            let text = std::fs::read_to_string(path).map_err(|e| {
                AppError::new("INGEST_READ_FAILED", "Failed to read CSV file")
                    .with_details(format!("path={}; err={e}", path.display()))
            })?;
            read_csv_text(&text)
        }
        SheetFormat::Workbook => read_workbook(path),
    }
}

pub fn read_csv_text(csv_text: &str) -> Result<SheetRows, AppError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_text.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| {
            AppError::new("INGEST_READ_FAILED", "Failed to read CSV headers")
                .with_details(e.to_string())
        })?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| {
            AppError::new("INGEST_READ_FAILED", "Failed to parse CSV row")
                .with_details(format!("row={}; err={e}", idx + 1))
        })?;
        rows.push(
            record
                .iter()
                .map(|v| {
                    if v.trim().is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(v.to_string())
                    }
                })
                .collect(),
        );
    }

    Ok(SheetRows { headers, rows })
}

fn read_workbook(path: &Path) -> Result<SheetRows, AppError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| {
        AppError::new("INGEST_READ_FAILED", "Failed to open workbook")
            .with_details(format!("path={}; err={e}", path.display()))
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| {
            AppError::new("INGEST_READ_FAILED", "Workbook has no worksheets")
                .with_details(format!("path={}", path.display()))
        })?
        .map_err(|e| {
            AppError::new("INGEST_READ_FAILED", "Failed to read first worksheet")
                .with_details(format!("path={}; err={e}", path.display()))
        })?;

    let mut rows_iter = range.rows();
    let headers = match rows_iter.next() {
        Some(row) => row
            .iter()
            .map(|c| cell_from_data(c).as_text().unwrap_or_default())
            .collect(),
        None => Vec::new(),
    };
    let rows = rows_iter
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();

    Ok(SheetRows { headers, rows })
}

/// Map a workbook cell onto the cell model.
///
/// Date-formatted cells become datetimes. Duration-formatted cells and time-only
/// values (serial below one day) become elapsed times.
pub fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) => {
            if s.trim().is_empty() {
                CellValue::Empty
            } else {
                CellValue::Text(s.clone())
            }
        }
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            let converted = if dt.is_duration() || serial < 1.0 {
                serial_to_duration(serial).map(CellValue::Duration)
            } else {
                serial_to_datetime(serial).map(CellValue::DateTime)
            };
            converted.unwrap_or(CellValue::Empty)
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}
