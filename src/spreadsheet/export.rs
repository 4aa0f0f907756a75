use crate::aggregate::StudentAttendanceStats;
use crate::error::PortalError;
use crate::manager::SessionAttendanceRow;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde::Serialize;

/// The content type attendance spreadsheets are served with.
pub const CONTENT_TYPE: &str = "application/x-excel";

pub const EXPORT_HEADERS: [&str; 3] = ["Student Name", "Roll No", "Present"];

const SHEET_NAME: &str = "Attendance";

/// Which students appear in a session export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportMode {
    /// Only students with a stored attendance record.
    #[default]
    RecordedOnly,
    /// Every enrolled student; students without a record are exported as absent.
    AllEnrolled,
}

/// A generated file ready to be downloaded.
#[derive(Debug, Clone)]
pub struct SpreadsheetFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl SpreadsheetFile {
    pub fn content_type(&self) -> &'static str {
        CONTENT_TYPE
    }

    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }
}

fn present_label(present: bool) -> &'static str {
    if present { "Yes" } else { "No" }
}

fn write_workbook(rows: &[SessionAttendanceRow]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, title) in EXPORT_HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *title, &header)?;
    }

    for (index, row) in rows.iter().enumerate() {
        let line = index as u32 + 1;
        worksheet.write_string(line, 0, &row.student_name)?;
        worksheet.write_string(line, 1, &row.rollno)?;
        worksheet.write_string(line, 2, present_label(row.present))?;
    }

    worksheet.autofit();
    workbook.save_to_buffer()
}

/// Renders the attendance of a session as an xlsx workbook named `attendance-<sessionId>.xlsx`:
/// one header row, then one row per given record.
pub fn session_attendance_workbook(
    session_id: &str,
    rows: &[SessionAttendanceRow],
) -> Result<SpreadsheetFile, PortalError> {
    let bytes = write_workbook(rows).map_err(|e| PortalError::Report {
        operation: "export attendance",
        source: Box::new(e),
    })?;

    Ok(SpreadsheetFile {
        filename: format!("attendance-{session_id}.xlsx"),
        bytes,
    })
}

#[derive(Serialize)]
struct CourseReportLine<'a> {
    #[serde(rename = "Student Name")]
    student_name: &'a str,
    #[serde(rename = "Attended")]
    attended: usize,
    #[serde(rename = "Total")]
    total: usize,
    #[serde(rename = "Percentage")]
    percentage: u32,
}

/// Renders per-student course statistics as CSV.
pub fn course_report_csv(stats: &[StudentAttendanceStats]) -> Result<Vec<u8>, PortalError> {
    let report_error = |source: Box<dyn std::error::Error + Send + Sync>| PortalError::Report {
        operation: "export course report",
        source,
    };

    let mut writer = csv::Writer::from_writer(Vec::new());
    if stats.is_empty() {
        writer
            .write_record(["Student Name", "Attended", "Total", "Percentage"])
            .map_err(|e| report_error(Box::new(e)))?;
    }
    for stat in stats {
        writer
            .serialize(CourseReportLine {
                student_name: &stat.student_name,
                attended: stat.attended_sessions,
                total: stat.total_sessions,
                percentage: stat.percentage,
            })
            .map_err(|e| report_error(Box::new(e)))?;
    }

    writer.into_inner().map_err(|e| report_error(Box::new(e.into_error())))
}
