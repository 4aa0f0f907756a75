mod common;

use attendance_portal::auth::StaticSession;
use attendance_portal::spreadsheet::RosterFormat;
use common::{portal, portal_as, roster_workbook, roster_workbook_with_header};
use rust_xlsxwriter::{Format, Formula, Workbook};
use std::io::Write;

#[test]
fn imports_every_row_of_a_valid_roster() {
    let mut portal = portal();
    let file = roster_workbook(&[
        ["Ada Lovelace", "ada@x.com", "CSE", "5550100", "R1"],
        ["", "", "", "", ""],
        ["Bob", "bob@x.com", "ECE", "5550101", "R2"],
    ]);

    let result = portal.import_students(&file, RosterFormat::Workbook);

    assert!(result.success, "{}", result.message);
    assert_eq!(result.message, "Successfully imported 2 students");

    let roster = portal.manager().get_roster().unwrap();
    let emails: Vec<_> = roster.iter().map(|s| s.email.as_str()).collect();
    assert_eq!(emails, vec!["ada@x.com", "bob@x.com"]);
    assert_eq!(roster[0].rollno, "R1");
    assert_eq!(roster[1].branch, "ECE");
}

#[test]
fn numeric_phone_cells_are_read_as_text() {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    for (col, title) in common::HEADER.iter().enumerate() {
        worksheet.write_string(0, col as u16, *title).unwrap();
    }
    worksheet.write_string(1, 0, "Ada").unwrap();
    worksheet.write_string(1, 1, "ada@x.com").unwrap();
    worksheet.write_string(1, 2, "CSE").unwrap();
    worksheet.write_number(1, 3, 9876543210.0).unwrap();
    worksheet.write_number(1, 4, 17.0).unwrap();
    let file = workbook.save_to_buffer().unwrap();

    let mut portal = portal();
    let result = portal.import_students(&file, RosterFormat::Workbook);

    assert!(result.success, "{}", result.message);
    let roster = portal.manager().get_roster().unwrap();
    assert_eq!(roster[0].phone, "9876543210");
    assert_eq!(roster[0].rollno, "17");
}

#[test]
fn formula_results_and_rich_text_are_read_as_text() {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    for (col, title) in common::HEADER.iter().enumerate() {
        worksheet.write_string(0, col as u16, *title).unwrap();
    }
    let bold = Format::new().set_bold();
    let plain = Format::default();
    worksheet
        .write_rich_string(1, 0, &[(&bold, "Ada "), (&plain, "Lovelace")])
        .unwrap();
    worksheet
        .write_formula(
            1,
            1,
            Formula::new("=LOWER(\"ADA@X.COM\")").set_result("ada@x.com"),
        )
        .unwrap();
    worksheet.write_string(1, 2, "CSE").unwrap();
    worksheet.write_string(1, 3, "5550100").unwrap();
    worksheet.write_string(1, 4, "R1").unwrap();
    let file = workbook.save_to_buffer().unwrap();

    let mut portal = portal();
    let result = portal.import_students(&file, RosterFormat::Workbook);

    assert!(result.success, "{}", result.message);
    let roster = portal.manager().get_roster().unwrap();
    assert_eq!(roster[0].name, "Ada Lovelace");
    assert_eq!(roster[0].email, "ada@x.com");
}

#[test]
fn header_must_be_the_first_row() {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    for (col, title) in common::HEADER.iter().enumerate() {
        worksheet.write_string(1, col as u16, *title).unwrap();
    }
    for (col, value) in ["Ada", "ada@x.com", "CSE", "5550100", "R1"].iter().enumerate() {
        worksheet.write_string(2, col as u16, *value).unwrap();
    }
    let file = workbook.save_to_buffer().unwrap();

    let mut portal = portal();
    let result = portal.import_students(&file, RosterFormat::Workbook);

    assert!(!result.success);
    assert!(
        result.message.starts_with("Missing required columns"),
        "{}",
        result.message
    );
    assert_eq!(portal.manager().num_students().unwrap(), 0);
}

#[test]
fn non_ascii_case_variants_agree_between_file_and_store() {
    let mut portal = portal();
    assert!(portal.add_student(common::record("Eve", "\u{c9}ve@x.com", "R1")).success);

    let file = roster_workbook(&[["Eva", "\u{e9}ve@x.com", "ECE", "5550101", "R2"]]);
    let result = portal.import_students(&file, RosterFormat::Workbook);

    assert!(result.success, "{}", result.message);
    assert_eq!(portal.manager().num_students().unwrap(), 2);
}

#[test]
fn same_email_in_different_case_fails_the_file() {
    let mut portal = portal();
    let file = roster_workbook(&[
        ["Ada", "A@x.com", "CSE", "5550100", "R1"],
        ["Also Ada", "a@x.com", "CSE", "5550101", "R2"],
    ]);

    let result = portal.import_students(&file, RosterFormat::Workbook);

    assert!(!result.success);
    assert_eq!(result.message, "Duplicate email found in file at row 3: a@x.com");
    assert_eq!(portal.manager().num_students().unwrap(), 0);
}

#[test]
fn collision_with_the_store_rejects_the_whole_batch() {
    let mut portal = portal();
    let existing = portal.add_student(common::record("Ada", "ada@x.com", "R1"));
    assert!(existing.success);

    let file = roster_workbook(&[
        ["Bob", "bob@x.com", "ECE", "5550101", "R2"],
        ["Ada Again", "ADA@x.com", "CSE", "5550102", "R3"],
        ["Cy", "cy@x.com", "ME", "5550103", "R4"],
    ]);

    let result = portal.import_students(&file, RosterFormat::Workbook);

    assert!(!result.success);
    assert_eq!(result.message, "The following emails already exist: ada@x.com");

    let roster = portal.manager().get_roster().unwrap();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].name, "Ada");
}

#[test]
fn missing_field_names_row_and_field() {
    let mut portal = portal();
    let file = roster_workbook(&[
        ["Ada", "ada@x.com", "CSE", "5550100", "R1"],
        ["Bob", "bob@x.com", "ECE", "", "R2"],
    ]);

    let result = portal.import_students(&file, RosterFormat::Workbook);

    assert!(!result.success);
    assert_eq!(result.message, "Row 3: Phone is required");
    assert_eq!(portal.manager().num_students().unwrap(), 0);
}

#[test]
fn missing_columns_are_a_schema_error() {
    let mut portal = portal();
    let file = roster_workbook_with_header(&["Name", "E-mail", "Branch", "Phone", "Roll"], &[]);

    let result = portal.import_students(&file, RosterFormat::Workbook);

    assert!(!result.success);
    assert_eq!(result.message, "Missing required columns: Email, Roll No");
}

#[test]
fn header_only_file_has_no_data() {
    let mut portal = portal();
    let file = roster_workbook(&[]);

    let result = portal.import_students(&file, RosterFormat::Workbook);

    assert!(!result.success);
    assert_eq!(result.message, "No valid student data found in the file");
}

#[test]
fn corrupt_file_is_unreadable() {
    let mut portal = portal();

    let result = portal.import_students(b"PK\x03\x04 truncated", RosterFormat::Workbook);

    assert!(!result.success);
    assert!(result.message.starts_with("Unreadable file"), "{}", result.message);
}

#[test]
fn csv_rosters_import_too() {
    let mut portal = portal();
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    write!(
        file,
        "name,email,branch,phone,roll no\nAda,ada@x.com,CSE,5550100,R1\nBob,bob@x.com,ECE,5550101,R2\n"
    )
    .unwrap();

    let bytes = std::fs::read(file.path()).unwrap();
    let result = portal.import_students(&bytes, RosterFormat::from_path(file.path()));

    assert!(result.success, "{}", result.message);
    assert_eq!(portal.manager().num_students().unwrap(), 2);
}

#[test]
fn import_requires_a_session() {
    let mut portal = portal_as(StaticSession::signed_out());
    let file = roster_workbook(&[["Ada", "ada@x.com", "CSE", "5550100", "R1"]]);

    let result = portal.import_students(&file, RosterFormat::Workbook);

    assert!(!result.success);
    assert_eq!(result.message, "Unauthorized");
    assert_eq!(portal.manager().num_students().unwrap(), 0);
}
