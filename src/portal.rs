//! Admin actions over the roster store.
//!
//! Every action first asks the [`SessionProvider`] for an active admin session. Mutations report
//! back with an [`ActionResult`] and never return an error; queries return a [`PortalError`] whose
//! [`user_message`](PortalError::user_message) is safe to display.

use crate::aggregate::{
    self, MarkingRow, SessionAttendance, StudentAttendanceStats, attendance_percentage,
};
use crate::auth::SessionProvider;
use crate::error::{PortalError, StoreResultExt};
use crate::manager::{AttendanceManager, SessionAttendanceRow};
use crate::models::{Course, CourseSession, Student, StudentRecord};
use crate::spreadsheet::{self, ExportMode, ImportSummary, RosterFormat, SpreadsheetFile};
use chrono::NaiveDateTime;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{error, info};

/// The number of upcoming sessions shown on the dashboard.
pub const UPCOMING_SESSIONS: i64 = 5;

pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// The largest accepted page number and page size.
pub const MAX_PAGE_INPUT: i64 = 1_000_000;

/// The outcome of a mutating action, as shown to the administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
}

impl ActionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    /// Converts an error into a failed result, logging anything that is not shown.
    pub fn from_error(err: PortalError) -> Self {
        if err.is_internal() {
            error!(error = ?err, "admin action failed");
        }
        Self::failed(err.user_message())
    }
}

/// Converts a query error into one that only carries its user-safe message, logging the details
/// of anything internal first.
pub fn user_facing<T>(result: Result<T, PortalError>) -> anyhow::Result<T> {
    result.map_err(|err| {
        if err.is_internal() {
            error!(error = ?err, "admin query failed");
        }
        anyhow::anyhow!(err.user_message())
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn new(total: i64, page: i64, limit: i64) -> Self {
        let total_pages = if limit > 0 {
            total / limit + i64::from(total % limit > 0)
        } else {
            0
        };

        Self {
            total,
            page,
            limit,
            total_pages,
            has_next_page: page.saturating_mul(limit) < total,
            has_prev_page: page > 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentPage {
    pub students: Vec<Student>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub student_count: usize,
    pub course_count: usize,
    pub upcoming_sessions: Vec<CourseSession>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseReport {
    pub course: Course,
    pub sessions: Vec<CourseSession>,
    pub enrollments: Vec<Student>,
    pub attendance_stats: Vec<StudentAttendanceStats>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSheet {
    pub course_name: String,
    pub session_date: NaiveDateTime,
    pub students: Vec<MarkingRow>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentCourseAttendance {
    pub student_name: String,
    pub course_name: String,
    pub attendance_records: Vec<SessionAttendance>,
    pub attended_sessions: usize,
    pub total_sessions: usize,
    pub percentage: u32,
}

/// A student whose attendance in a course is below the threshold.
#[derive(Debug, Clone)]
pub struct LowAttendance {
    pub student: Student,
    pub stats: StudentAttendanceStats,
}

fn is_unique_violation(err: &DieselError) -> bool {
    matches!(
        err,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    )
}

fn page_input(value: Option<i64>, default: i64, what: &str) -> Result<i64, PortalError> {
    let value = value.unwrap_or(default);
    if (1..=MAX_PAGE_INPUT).contains(&value) {
        Ok(value)
    } else {
        Err(PortalError::Invalid(format!(
            "{what} must be between 1 and {MAX_PAGE_INPUT}"
        )))
    }
}

fn trimmed(record: StudentRecord) -> Result<StudentRecord, PortalError> {
    let record = StudentRecord {
        name: record.name.trim().to_string(),
        email: record.email.trim().to_string(),
        branch: record.branch.trim().to_string(),
        phone: record.phone.trim().to_string(),
        rollno: record.rollno.trim().to_string(),
    };

    for (value, field) in [
        (&record.name, "Name"),
        (&record.email, "Email"),
        (&record.branch, "Branch"),
        (&record.phone, "Phone"),
        (&record.rollno, "Roll No"),
    ] {
        if value.is_empty() {
            return Err(PortalError::Invalid(format!("{field} is required")));
        }
    }

    Ok(record)
}

pub struct Portal<S> {
    manager: AttendanceManager,
    sessions: S,
}

impl<S: SessionProvider> Portal<S> {
    pub fn new(manager: AttendanceManager, sessions: S) -> Self {
        Self { manager, sessions }
    }

    /// Direct access to the store, bypassing the session check.
    pub fn manager(&mut self) -> &mut AttendanceManager {
        &mut self.manager
    }

    fn act<F>(&mut self, action: F) -> ActionResult
    where
        F: FnOnce(&mut AttendanceManager) -> Result<String, PortalError>,
    {
        let outcome = self
            .sessions
            .require_session()
            .and_then(|session| {
                let message = action(&mut self.manager)?;
                info!(user = %session.user, %message, "admin action");
                Ok(message)
            });

        match outcome {
            Ok(message) => ActionResult::ok(message),
            Err(err) => ActionResult::from_error(err),
        }
    }

    fn query<T, F>(&mut self, query: F) -> Result<T, PortalError>
    where
        F: FnOnce(&mut AttendanceManager) -> Result<T, PortalError>,
    {
        self.sessions.require_session()?;
        query(&mut self.manager)
    }

    pub fn add_student(&mut self, form: StudentRecord) -> ActionResult {
        self.act(|manager| {
            let student = trimmed(form)?.into_student();
            manager.insert_student(&student).map_err(|e| {
                if is_unique_violation(&e) {
                    PortalError::DuplicateEmail
                } else {
                    PortalError::Store {
                        operation: "add student",
                        source: e,
                    }
                }
            })?;
            Ok("Student added successfully".to_string())
        })
    }

    /// Deletes a student together with their enrollments and attendance records.
    pub fn delete_student(&mut self, student_id: &str) -> ActionResult {
        self.act(|manager| {
            manager
                .delete_student(student_id)
                .during("delete student")?
                .ok_or_else(|| PortalError::not_found("Student", student_id))?;
            Ok("Student deleted successfully".to_string())
        })
    }

    /// Imports a roster file. Either every student in it is added or none are.
    pub fn import_students(&mut self, bytes: &[u8], format: RosterFormat) -> ActionResult {
        let result = self
            .sessions
            .require_session()
            .and_then(|_| spreadsheet::import_roster(&mut self.manager, bytes, format));

        match result {
            Ok(ImportSummary::Inserted(count)) => {
                ActionResult::ok(format!("Successfully imported {count} students"))
            }
            Ok(ImportSummary::NoData) => {
                ActionResult::failed("No valid student data found in the file")
            }
            Err(err) => ActionResult::from_error(err),
        }
    }

    pub fn add_course(&mut self, name: &str, description: Option<&str>) -> ActionResult {
        self.act(|manager| {
            let name = name.trim();
            if name.is_empty() {
                return Err(PortalError::Invalid("Name is required".to_string()));
            }
            let description = description.map(str::trim).filter(|d| !d.is_empty());

            manager.insert_course(name, description).during("add course")?;
            Ok("Course added successfully".to_string())
        })
    }

    pub fn add_session(&mut self, course_id: &str, date: NaiveDateTime) -> ActionResult {
        self.act(|manager| {
            manager
                .get_course(course_id)
                .during("add session")?
                .ok_or_else(|| PortalError::not_found("Course", course_id))?;

            manager.insert_session(course_id, date).during("add session")?;
            Ok("Session added successfully".to_string())
        })
    }

    pub fn enroll_student(&mut self, course_id: &str, student_id: &str) -> ActionResult {
        self.act(|manager| {
            manager
                .get_course(course_id)
                .during("enroll student")?
                .ok_or_else(|| PortalError::not_found("Course", course_id))?;
            manager
                .get_student(student_id)
                .during("enroll student")?
                .ok_or_else(|| PortalError::not_found("Student", student_id))?;

            manager.enroll(student_id, course_id).map_err(|e| {
                if is_unique_violation(&e) {
                    PortalError::AlreadyEnrolled
                } else {
                    PortalError::Store {
                        operation: "enroll student",
                        source: e,
                    }
                }
            })?;
            Ok("Student enrolled successfully".to_string())
        })
    }

    /// Overwrites the attendance of every student enrolled in the session's course: present if
    /// their ID is in `present`, absent otherwise.
    pub fn save_attendance(&mut self, session_id: &str, present: &HashSet<String>) -> ActionResult {
        self.act(|manager| {
            let session = manager
                .get_session(session_id)
                .during("save attendance")?
                .ok_or_else(|| PortalError::not_found("Session", session_id))?;

            let enrolled = manager
                .get_enrolled_students(&session.course_id)
                .during("save attendance")?;
            let records = aggregate::attendance_records(session_id, &enrolled, present);

            manager.upsert_attendance(&records).during("save attendance")?;
            Ok("Attendance saved successfully".to_string())
        })
    }

    /// Saves attendance from the names of the submitted form fields. A field named
    /// `attendance-<studentId>` marks that student present.
    pub fn save_attendance_form<'a, I>(&mut self, session_id: &str, field_names: I) -> ActionResult
    where
        I: IntoIterator<Item = &'a str>,
    {
        let present = aggregate::present_from_form(field_names);
        self.save_attendance(session_id, &present)
    }

    /// Searches students by name, one page at a time. Pages start at 1; page and limit must be at
    /// most [`MAX_PAGE_INPUT`].
    pub fn search_students(
        &mut self,
        search: &str,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<StudentPage, PortalError> {
        self.query(|manager| {
            let page = page_input(page, 1, "Page")?;
            let limit = page_input(limit, DEFAULT_PAGE_SIZE, "Limit")?;

            let (students, total) = manager
                .search_students(search, (page - 1) * limit, limit)
                .during("search students")?;

            Ok(StudentPage {
                students,
                pagination: Pagination::new(total, page, limit),
            })
        })
    }

    pub fn list_courses(&mut self) -> Result<Vec<Course>, PortalError> {
        self.query(|manager| manager.get_courses().during("list courses"))
    }

    /// Lists the courses a student is enrolled in.
    pub fn student_courses(&mut self, student_id: &str) -> Result<Vec<Course>, PortalError> {
        self.query(|manager| {
            manager
                .get_student(student_id)
                .during("load student courses")?
                .ok_or_else(|| PortalError::not_found("Student", student_id))?;

            manager
                .get_student_courses(student_id)
                .during("load student courses")
        })
    }

    pub fn dashboard(&mut self, now: NaiveDateTime) -> Result<Dashboard, PortalError> {
        self.query(|manager| {
            Ok(Dashboard {
                student_count: manager.num_students().during("load dashboard")?,
                course_count: manager.num_courses().during("load dashboard")?,
                upcoming_sessions: manager
                    .get_upcoming_sessions(now, UPCOMING_SESSIONS)
                    .during("load dashboard")?,
            })
        })
    }

    pub fn course_report(&mut self, course_id: &str) -> Result<CourseReport, PortalError> {
        self.query(|manager| course_report(manager, course_id))
    }

    /// The marking sheet of a session: every enrolled student and whether they were present.
    pub fn session_sheet(&mut self, session_id: &str) -> Result<SessionSheet, PortalError> {
        self.query(|manager| {
            let (session, course) = session_with_course(manager, session_id)?;
            let enrolled = manager
                .get_enrolled_students(&course.id)
                .during("load session")?;
            let records = manager
                .get_session_attendance(session_id)
                .during("load session")?;

            Ok(SessionSheet {
                course_name: course.name,
                session_date: session.date,
                students: aggregate::marking_sheet(enrolled, &records),
            })
        })
    }

    pub fn student_course_attendance(
        &mut self,
        student_id: &str,
        course_id: &str,
    ) -> Result<StudentCourseAttendance, PortalError> {
        self.query(|manager| {
            let student = manager
                .get_student(student_id)
                .during("load student attendance")?
                .ok_or_else(|| PortalError::not_found("Student", student_id))?;
            let course = manager
                .get_course(course_id)
                .during("load student attendance")?
                .ok_or_else(|| PortalError::not_found("Course", course_id))?;

            let sessions = manager
                .get_course_sessions(course_id)
                .during("load student attendance")?;
            let records = manager
                .get_student_course_attendance(student_id, course_id)
                .during("load student attendance")?;

            let attendance_records = aggregate::session_history(&sessions, &records);
            let attended_sessions = attendance_records.iter().filter(|r| r.present).count();
            let total_sessions = sessions.len();

            Ok(StudentCourseAttendance {
                student_name: student.name,
                course_name: course.name,
                attendance_records,
                attended_sessions,
                total_sessions,
                percentage: attendance_percentage(attended_sessions, total_sessions),
            })
        })
    }

    /// Exports the attendance of a session as a spreadsheet.
    pub fn export_session(
        &mut self,
        session_id: &str,
        mode: ExportMode,
    ) -> Result<SpreadsheetFile, PortalError> {
        self.query(|manager| {
            let session = manager
                .get_session(session_id)
                .during("export attendance")?
                .ok_or_else(|| PortalError::not_found("Session", session_id))?;

            let rows = match mode {
                ExportMode::RecordedOnly => manager
                    .get_session_attendance_rows(session_id)
                    .during("export attendance")?,
                ExportMode::AllEnrolled => {
                    let enrolled = manager
                        .get_enrolled_students(&session.course_id)
                        .during("export attendance")?;
                    let records = manager
                        .get_session_attendance(session_id)
                        .during("export attendance")?;

                    aggregate::marking_sheet(enrolled, &records)
                        .into_iter()
                        .map(|row| SessionAttendanceRow {
                            student_name: row.name,
                            rollno: row.rollno,
                            present: row.present,
                        })
                        .collect()
                }
            };

            spreadsheet::session_attendance_workbook(session_id, &rows)
        })
    }

    /// Exports the per-student statistics of a course as CSV.
    pub fn course_report_csv(&mut self, course_id: &str) -> Result<Vec<u8>, PortalError> {
        self.query(|manager| {
            let report = course_report(manager, course_id)?;
            spreadsheet::course_report_csv(&report.attendance_stats)
        })
    }

    /// Lists the students of a course whose attendance is below `threshold` percent.
    pub fn low_attendance(
        &mut self,
        course_id: &str,
        threshold: u32,
    ) -> Result<(Course, Vec<LowAttendance>), PortalError> {
        self.query(|manager| {
            let report = course_report(manager, course_id)?;
            let flagged: Vec<&StudentAttendanceStats> =
                aggregate::below_threshold(&report.attendance_stats, threshold);

            let ids: Vec<String> = flagged.iter().map(|s| s.student_id.clone()).collect();
            let mut students: HashMap<String, Student> = manager
                .get_students_by_id(&ids)
                .during("load low attendance")?
                .into_iter()
                .map(|s| (s.id.clone(), s))
                .collect();

            let low = flagged
                .into_iter()
                .filter_map(|stats| {
                    students.remove(&stats.student_id).map(|student| LowAttendance {
                        student,
                        stats: stats.clone(),
                    })
                })
                .collect();

            Ok((report.course, low))
        })
    }
}

fn session_with_course(
    manager: &mut AttendanceManager,
    session_id: &str,
) -> Result<(CourseSession, Course), PortalError> {
    let session = manager
        .get_session(session_id)
        .during("load session")?
        .ok_or_else(|| PortalError::not_found("Session", session_id))?;
    let course = manager
        .get_course(&session.course_id)
        .during("load session")?
        .ok_or_else(|| PortalError::not_found("Course", &session.course_id))?;

    Ok((session, course))
}

fn course_report(manager: &mut AttendanceManager, course_id: &str) -> Result<CourseReport, PortalError> {
    let course = manager
        .get_course(course_id)
        .during("load course")?
        .ok_or_else(|| PortalError::not_found("Course", course_id))?;

    let sessions = manager.get_course_sessions(course_id).during("load course")?;
    let enrollments = manager.get_enrolled_students(course_id).during("load course")?;
    let records = manager.get_course_attendance(course_id).during("load course")?;

    // Students who were marked and later left the course still show up in the report.
    let enrolled_ids: HashSet<&str> = enrollments.iter().map(|s| s.id.as_str()).collect();
    let mut former: Vec<String> = records
        .iter()
        .map(|r| r.student_id.as_str())
        .filter(|id| !enrolled_ids.contains(id))
        .map(str::to_string)
        .collect();
    former.sort();
    former.dedup();
    let others = manager.get_students_by_id(&former).during("load course")?;

    let attendance_stats = aggregate::course_stats(&sessions, &enrollments, &others, &records);

    Ok(CourseReport {
        course,
        sessions,
        enrollments,
        attendance_stats,
    })
}
