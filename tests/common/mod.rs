#![allow(dead_code)]

use attendance_portal::auth::StaticSession;
use attendance_portal::manager::AttendanceManager;
use attendance_portal::models::{Course, CourseSession, Student, StudentRecord};
use attendance_portal::portal::Portal;
use chrono::{NaiveDate, NaiveDateTime};
use rust_xlsxwriter::Workbook;

pub const HEADER: [&str; 5] = ["Name", "Email", "Branch", "Phone", "Roll No"];

/// A portal on a fresh in-memory database, signed in.
pub fn portal() -> Portal<StaticSession> {
    portal_as(StaticSession::signed_in("tester"))
}

pub fn portal_as(session: StaticSession) -> Portal<StaticSession> {
    let manager = AttendanceManager::establish(":memory:").expect("in-memory database");
    Portal::new(manager, session)
}

pub fn day(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, day)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

pub fn record(name: &str, email: &str, rollno: &str) -> StudentRecord {
    StudentRecord {
        name: name.to_string(),
        email: email.to_string(),
        branch: "CSE".to_string(),
        phone: "5550100".to_string(),
        rollno: rollno.to_string(),
    }
}

/// Inserts a student directly into the store.
pub fn student(portal: &mut Portal<StaticSession>, name: &str, rollno: &str) -> Student {
    let email = format!("{}@example.com", name.to_lowercase());
    let student = record(name, &email, rollno).into_student();
    portal.manager().insert_student(&student).unwrap();
    student
}

/// Creates a course with `sessions` sessions on consecutive days of March 2025, and enrolls the
/// given students.
pub fn course(
    portal: &mut Portal<StaticSession>,
    sessions: u32,
    enrolled: &[&Student],
) -> (Course, Vec<CourseSession>) {
    let manager = portal.manager();
    let course = manager.insert_course("Rust 101", Some("Ownership")).unwrap();
    let sessions = (1..=sessions)
        .map(|d| manager.insert_session(&course.id, day(d)).unwrap())
        .collect();
    for student in enrolled {
        manager.enroll(&student.id, &course.id).unwrap();
    }

    (course, sessions)
}

/// Writes an xlsx roster with the standard header and the given rows.
pub fn roster_workbook(rows: &[[&str; 5]]) -> Vec<u8> {
    roster_workbook_with_header(&HEADER, rows)
}

pub fn roster_workbook_with_header(header: &[&str], rows: &[[&str; 5]]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, title) in header.iter().enumerate() {
        worksheet.write_string(0, col as u16, *title).unwrap();
    }
    for (index, row) in rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            if !value.is_empty() {
                worksheet
                    .write_string(index as u32 + 1, col as u16, *value)
                    .unwrap();
            }
        }
    }

    workbook.save_to_buffer().unwrap()
}
