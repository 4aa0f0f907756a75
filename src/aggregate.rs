//! Attendance statistics computed from raw attendance records.
//!
//! Nothing in here touches the store: callers load sessions, students and records and hand them
//! over.

use crate::models::{CourseAttendance, CourseSession, Student};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::warn;

/// The prefix of a submitted form field that marks a student as present.
pub const ATTENDANCE_FIELD_PREFIX: &str = "attendance-";

/// Attended sessions as a whole-number percentage of total sessions.
///
/// The ratio is rounded half-up. A course without sessions has a percentage of 0.
pub fn attendance_percentage(attended: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }

    (attended as f64 / total as f64 * 100.0).round() as u32
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAttendanceStats {
    pub student_id: String,
    pub student_name: String,
    pub attended_sessions: usize,
    pub total_sessions: usize,
    pub percentage: u32,
}

/// Computes per-student statistics for a course.
///
/// Every student in `enrolled` gets a row, as does any student with a record in `records` who is
/// no longer enrolled; those are named from `others`, or "Unknown" if they cannot be found.
/// Only records that belong to one of `sessions` are counted. Rows are ordered by name.
pub fn course_stats(
    sessions: &[CourseSession],
    enrolled: &[Student],
    others: &[Student],
    records: &[CourseAttendance],
) -> Vec<StudentAttendanceStats> {
    let session_ids: HashSet<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
    let total_sessions = sessions.len();

    let mut attended: BTreeMap<&str, usize> = enrolled.iter().map(|s| (s.id.as_str(), 0)).collect();
    for record in records
        .iter()
        .filter(|r| session_ids.contains(r.course_session_id.as_str()))
    {
        let count = attended.entry(record.student_id.as_str()).or_insert(0);
        if record.present {
            *count += 1;
        }
    }

    let names: HashMap<&str, &str> = enrolled
        .iter()
        .chain(others)
        .map(|s| (s.id.as_str(), s.name.as_str()))
        .collect();

    let mut stats: Vec<StudentAttendanceStats> = attended
        .into_iter()
        .map(|(student_id, attended_sessions)| StudentAttendanceStats {
            student_id: student_id.to_string(),
            student_name: names.get(student_id).copied().unwrap_or("Unknown").to_string(),
            attended_sessions,
            total_sessions,
            percentage: attendance_percentage(attended_sessions, total_sessions),
        })
        .collect();

    stats.sort_by(|a, b| {
        a.student_name
            .cmp(&b.student_name)
            .then_with(|| a.student_id.cmp(&b.student_id))
    });
    stats
}

/// Returns the students of `stats` whose percentage is strictly below `threshold`, in the same
/// order.
pub fn below_threshold(
    stats: &[StudentAttendanceStats],
    threshold: u32,
) -> Vec<&StudentAttendanceStats> {
    stats.iter().filter(|s| s.percentage < threshold).collect()
}

/// One enrolled student on a session's marking sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkingRow {
    pub id: String,
    pub name: String,
    pub rollno: String,
    pub present: bool,
}

/// Builds the marking sheet of a session. Students without a record are shown as absent.
pub fn marking_sheet(enrolled: Vec<Student>, records: &[CourseAttendance]) -> Vec<MarkingRow> {
    let present: HashMap<&str, bool> = records
        .iter()
        .map(|r| (r.student_id.as_str(), r.present))
        .collect();

    enrolled
        .into_iter()
        .map(|student| MarkingRow {
            present: present.get(student.id.as_str()).copied().unwrap_or(false),
            id: student.id,
            name: student.name,
            rollno: student.rollno,
        })
        .collect()
}

/// A student's attendance at one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAttendance {
    pub session_id: String,
    pub session_date: NaiveDateTime,
    pub present: bool,
}

/// Lists one student's attendance at every session of a course, defaulting to absent.
pub fn session_history(
    sessions: &[CourseSession],
    records: &[CourseAttendance],
) -> Vec<SessionAttendance> {
    let present: HashMap<&str, bool> = records
        .iter()
        .map(|r| (r.course_session_id.as_str(), r.present))
        .collect();

    sessions
        .iter()
        .map(|session| SessionAttendance {
            session_id: session.id.clone(),
            session_date: session.date,
            present: present.get(session.id.as_str()).copied().unwrap_or(false),
        })
        .collect()
}

/// Extracts the IDs of students marked present from submitted form field names of the form
/// `attendance-<studentId>`. Other fields are ignored.
pub fn present_from_form<'a, I>(field_names: I) -> HashSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    field_names
        .into_iter()
        .filter_map(|field| field.strip_prefix(ATTENDANCE_FIELD_PREFIX))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Builds one record per enrolled student for a session, present exactly when the student is in
/// `present`.
///
/// IDs in `present` that are not enrolled are ignored.
pub fn attendance_records(
    session_id: &str,
    enrolled: &[Student],
    present: &HashSet<String>,
) -> Vec<CourseAttendance> {
    let enrolled_ids: HashSet<&str> = enrolled.iter().map(|s| s.id.as_str()).collect();
    for id in present.iter().filter(|id| !enrolled_ids.contains(id.as_str())) {
        warn!(student_id = %id, session_id, "tried to mark a student who is not enrolled");
    }

    enrolled
        .iter()
        .map(|student| CourseAttendance {
            student_id: student.id.clone(),
            course_session_id: session_id.to_string(),
            present: present.contains(&student.id),
        })
        .collect()
}
