pub mod cells;
pub mod columns;
pub mod incidents;

pub use incidents::{
    load_periods, load_spreadsheet, parse_sheet, period_date_range, PeriodBatch, SpreadsheetLoad,
};
