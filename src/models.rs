use crate::schema::{course_attendance, course_enrollments, course_sessions, courses, students};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

/// Generates a fresh identifier for a new record.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Queryable, Selectable, Insertable, Tabled, Serialize, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = students)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Student {
    pub id: String,
    pub name: String,
    pub email: String,
    pub branch: String,
    pub phone: String,
    #[tabled(rename = "roll no")]
    pub rollno: String,
}

/// The admin-supplied fields of a student, before an identifier has been assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRecord {
    pub name: String,
    pub email: String,
    pub branch: String,
    pub phone: String,
    pub rollno: String,
}

impl StudentRecord {
    pub fn into_student(self) -> Student {
        Student {
            id: new_id(),
            name: self.name,
            email: self.email,
            branch: self.branch,
            phone: self.phone,
            rollno: self.rollno,
        }
    }
}

#[derive(Queryable, Selectable, Insertable, Serialize, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = courses)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Course {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Queryable, Selectable, Insertable, Serialize, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = course_sessions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct CourseSession {
    pub id: String,
    pub course_id: String,
    pub date: NaiveDateTime,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = course_enrollments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CourseEnrollment {
    pub id: String,
    pub student_id: String,
    pub course_id: String,
}

/// Whether a student was present at a session. There is at most one per (student, session).
#[derive(Queryable, Selectable, Insertable, Serialize, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = course_attendance)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct CourseAttendance {
    pub student_id: String,
    pub course_session_id: String,
    pub present: bool,
}
