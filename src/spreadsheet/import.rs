use crate::error::{ImportError, PortalError, REQUIRED_COLUMNS, StoreResultExt};
use crate::manager::AttendanceManager;
use crate::models::{Student, StudentRecord};
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

/// The encoding of an uploaded roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterFormat {
    /// Any workbook `calamine` understands: xlsx, xlsm, xlsb, xls or ods.
    Workbook,
    Csv,
}

impl RosterFormat {
    /// Picks the format from a file extension; anything other than `.csv` is read as a workbook.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => RosterFormat::Csv,
            _ => RosterFormat::Workbook,
        }
    }
}

/// The outcome of an import that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportSummary {
    Inserted(usize),
    /// The file had a valid header row but no student rows.
    NoData,
}


fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.trim().to_string(),
        // Phone and roll numbers are often typed as numbers.
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string().trim().to_string(),
    }
}

/// Reads the first sheet of a workbook as trimmed cell text. Index `i` of the result is sheet row
/// `i + 1`.
fn read_workbook(bytes: &[u8]) -> Result<Vec<Vec<String>>, ImportError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| ImportError::UnreadableFile(e.to_string()))?;

    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.map_err(|e| ImportError::UnreadableFile(e.to_string()))?,
        None => return Err(ImportError::UnreadableFile("the workbook has no sheets".to_string())),
    };

    // The range starts at the first populated cell; blank leading rows are put back so that the
    // header stays row 1.
    let leading = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let mut rows = vec![Vec::new(); leading];
    rows.extend(range.rows().map(|row| row.iter().map(cell_text).collect()));

    Ok(rows)
}

/// Reads a CSV file as trimmed cell text. Index `i` of the result is line `i + 1`; blank lines
/// become empty rows.
fn read_csv(bytes: &[u8]) -> Result<Vec<Vec<String>>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ImportError::UnreadableFile(e.to_string()))?;
        if let Some(line) = record.position().map(|p| p.line() as usize) {
            rows.resize(rows.len().max(line.saturating_sub(1)), Vec::new());
        }
        rows.push(record.iter().map(|cell| cell.trim().to_string()).collect());
    }

    Ok(rows)
}

/// Resolves each required column to its index in the header row.
fn resolve_columns(header: &[String]) -> Result<[usize; REQUIRED_COLUMNS.len()], ImportError> {
    let mut indices = [0; REQUIRED_COLUMNS.len()];
    let mut missing = Vec::new();

    for (slot, column) in indices.iter_mut().zip(REQUIRED_COLUMNS) {
        match header
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(column))
        {
            Some(index) => *slot = index,
            None => missing.push(column),
        }
    }

    if missing.is_empty() {
        Ok(indices)
    } else {
        Err(ImportError::MissingColumns(missing))
    }
}

/// Validates the rows of a roster sheet. The first row is the header; errors name rows by their
/// 1-indexed position.
///
/// Rows without any populated cell, and rows without an email, are skipped. Emails must be unique
/// within the file, ignoring ASCII case; the first repeat aborts validation.
pub fn validate_rows(rows: &[Vec<String>]) -> Result<Vec<StudentRecord>, ImportError> {
    let Some((header, data)) = rows.split_first() else {
        return Err(ImportError::MissingColumns(REQUIRED_COLUMNS.to_vec()));
    };
    let [name, email, branch, phone, rollno] = resolve_columns(header)?;

    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for (offset, row) in data.iter().enumerate() {
        let row_number = offset + 2;
        let cell = |index: usize| row.get(index).map(|c| c.trim()).unwrap_or_default();

        if row.iter().all(|c| c.trim().is_empty()) || cell(email).is_empty() {
            continue;
        }

        let required = |index: usize, field: &'static str| {
            let value = cell(index);
            if value.is_empty() {
                Err(ImportError::InvalidRow {
                    row: row_number,
                    field,
                })
            } else {
                Ok(value.to_string())
            }
        };

        let record = StudentRecord {
            name: required(name, "Name")?,
            email: required(email, "Email")?,
            branch: required(branch, "Branch")?,
            phone: required(phone, "Phone")?,
            rollno: required(rollno, "Roll No")?,
        };

        if !seen.insert(record.email.to_ascii_lowercase()) {
            return Err(ImportError::DuplicateInFile {
                row: row_number,
                email: record.email,
            });
        }

        records.push(record);
    }

    Ok(records)
}

/// Parses and validates a roster file without touching the store.
pub fn parse_roster(bytes: &[u8], format: RosterFormat) -> Result<Vec<StudentRecord>, ImportError> {
    let rows = match format {
        RosterFormat::Workbook => read_workbook(bytes)?,
        RosterFormat::Csv => read_csv(bytes)?,
    };

    validate_rows(&rows)
}

/// Imports a roster file into the store.
///
/// The whole file is validated first, then checked against the emails already in the store. Only
/// if both pass are the students inserted, all in one transaction.
pub fn import_roster(
    manager: &mut AttendanceManager,
    bytes: &[u8],
    format: RosterFormat,
) -> Result<ImportSummary, PortalError> {
    let records = parse_roster(bytes, format)?;
    debug!(rows = records.len(), ?format, "validated roster file");

    if records.is_empty() {
        return Ok(ImportSummary::NoData);
    }

    let emails: Vec<String> = records.iter().map(|r| r.email.clone()).collect();
    let existing = manager
        .existing_emails(&emails)
        .during("check existing students")?;
    if !existing.is_empty() {
        return Err(ImportError::DuplicateInStore(existing).into());
    }

    let students: Vec<Student> = records.into_iter().map(StudentRecord::into_student).collect();
    let inserted = manager
        .insert_students(&students)
        .during("import students")?;

    info!(inserted, "imported students from roster file");
    Ok(ImportSummary::Inserted(inserted))
}
