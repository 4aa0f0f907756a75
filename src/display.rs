//! Pretty printing of portal data as tables.

use crate::aggregate::StudentAttendanceStats;
use crate::models::Course;
use crate::portal::{
    CourseReport, Dashboard, LowAttendance, SessionSheet, StudentCourseAttendance, StudentPage,
};
use chrono::NaiveDateTime;
use tabled::{Table, Tabled, settings::Style};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

fn yes_no(present: bool) -> &'static str {
    if present { "Yes" } else { "No" }
}

fn date(value: NaiveDateTime) -> String {
    value.format(DATE_FORMAT).to_string()
}

fn render<T: Tabled>(rows: impl IntoIterator<Item = T>) -> String {
    let mut table = Table::new(rows);
    table.with(Style::modern());
    table.to_string()
}

#[derive(Tabled)]
struct StatsRow<'a> {
    student: &'a str,
    attended: usize,
    total: usize,
    #[tabled(rename = "%")]
    percentage: u32,
}

fn stats_table(stats: &[StudentAttendanceStats]) -> String {
    render(stats.iter().map(|s| StatsRow {
        student: &s.student_name,
        attended: s.attended_sessions,
        total: s.total_sessions,
        percentage: s.percentage,
    }))
}

/// Pretty prints one page of students.
pub fn show_students(page: &StudentPage, verbose: bool) {
    let table = if verbose {
        render(&page.students)
    } else {
        #[derive(Tabled)]
        struct SimpleStudent<'a> {
            id: &'a str,
            name: &'a str,
            #[tabled(rename = "roll no")]
            rollno: &'a str,
        }

        render(page.students.iter().map(|student| SimpleStudent {
            id: &student.id,
            name: &student.name,
            rollno: &student.rollno,
        }))
    };

    let p = &page.pagination;
    println!(
        "Students (page {} of {}, {} total):\n{table}",
        p.page,
        p.total_pages.max(1),
        p.total
    );
}

pub fn show_courses(courses: &[Course]) {
    #[derive(Tabled)]
    struct CourseRow<'a> {
        id: &'a str,
        name: &'a str,
        description: &'a str,
    }

    let table = render(courses.iter().map(|course| CourseRow {
        id: &course.id,
        name: &course.name,
        description: course.description.as_deref().unwrap_or(""),
    }));
    println!("Courses:\n{table}");
}

pub fn show_dashboard(dashboard: &Dashboard) {
    println!("Students: {}", dashboard.student_count);
    println!("Courses:  {}", dashboard.course_count);

    if dashboard.upcoming_sessions.is_empty() {
        println!("No upcoming sessions.");
        return;
    }

    #[derive(Tabled)]
    struct UpcomingRow<'a> {
        session: &'a str,
        course: &'a str,
        date: String,
    }

    let table = render(dashboard.upcoming_sessions.iter().map(|s| UpcomingRow {
        session: &s.id,
        course: &s.course_id,
        date: date(s.date),
    }));
    println!("Upcoming sessions:\n{table}");
}

/// Prints a course with its sessions and the attendance of each student.
pub fn show_course_report(report: &CourseReport) {
    println!("{} ({})", report.course.name, report.course.id);
    if let Some(description) = &report.course.description {
        println!("{description}");
    }

    #[derive(Tabled)]
    struct SessionRow<'a> {
        session: &'a str,
        date: String,
    }

    let sessions = render(report.sessions.iter().map(|s| SessionRow {
        session: &s.id,
        date: date(s.date),
    }));
    println!("Sessions:\n{sessions}");
    println!("Enrolled students: {}", report.enrollments.len());
    println!("Attendance:\n{}", stats_table(&report.attendance_stats));
}

pub fn show_session_sheet(sheet: &SessionSheet) {
    #[derive(Tabled)]
    struct MarkRow<'a> {
        id: &'a str,
        name: &'a str,
        #[tabled(rename = "roll no")]
        rollno: &'a str,
        present: &'static str,
    }

    let table = render(sheet.students.iter().map(|row| MarkRow {
        id: &row.id,
        name: &row.name,
        rollno: &row.rollno,
        present: yes_no(row.present),
    }));
    println!(
        "{} session on {}:\n{table}",
        sheet.course_name,
        date(sheet.session_date)
    );
}

/// Prints a student's attendance at every session of a course.
pub fn show_student_attendance(attendance: &StudentCourseAttendance) {
    #[derive(Tabled)]
    struct HistoryRow<'a> {
        session: &'a str,
        date: String,
        present: &'static str,
    }

    let table = render(attendance.attendance_records.iter().map(|r| HistoryRow {
        session: &r.session_id,
        date: date(r.session_date),
        present: yes_no(r.present),
    }));
    println!(
        "{} in {}: {} of {} sessions ({}%)\n{table}",
        attendance.student_name,
        attendance.course_name,
        attendance.attended_sessions,
        attendance.total_sessions,
        attendance.percentage
    );
}

pub fn show_low_attendance(course_name: &str, threshold: u32, flagged: &[LowAttendance]) {
    if flagged.is_empty() {
        println!("No students in {course_name} are below {threshold}%.");
        return;
    }

    #[derive(Tabled)]
    struct FlaggedRow<'a> {
        name: &'a str,
        email: &'a str,
        #[tabled(rename = "%")]
        percentage: u32,
    }

    let table = render(flagged.iter().map(|f| FlaggedRow {
        name: &f.student.name,
        email: &f.student.email,
        percentage: f.stats.percentage,
    }));
    println!("Students in {course_name} below {threshold}%:\n{table}");
}
