//! Reading roster spreadsheets and writing attendance spreadsheets.

mod export;
mod import;

pub use export::{
    CONTENT_TYPE, EXPORT_HEADERS, ExportMode, SpreadsheetFile, course_report_csv,
    session_attendance_workbook,
};
pub use import::{ImportSummary, RosterFormat, import_roster, parse_roster, validate_rows};
