//! This module contains the command-line interface [`Cli`] parser for administering students,
//! courses and attendance records.

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::models::StudentRecord;
use crate::portal::MAX_PAGE_INPUT;

/// The command line configuration struct, where the command-line interface parser is automatically
/// derived by [`clap::Parser`].
#[derive(Parser, Debug)]
#[command(version, about = "Administer students, courses and attendance")]
pub struct Cli {
    /// Path to a configuration file. Defaults to `config.toml` in the working directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print results as JSON instead of tables.
    #[arg(long, global = true)]
    pub json: bool,

    /// The different commands available for managing attendance records.
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug)]
pub struct StudentArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub branch: String,
    #[arg(long)]
    pub phone: String,
    #[arg(long = "roll-no")]
    pub rollno: String,
}

impl From<StudentArgs> for StudentRecord {
    fn from(args: StudentArgs) -> Self {
        StudentRecord {
            name: args.name,
            email: args.email,
            branch: args.branch,
            phone: args.phone,
            rollno: args.rollno,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new student to the roster.
    AddStudent(StudentArgs),

    /// Remove a student, along with their enrollments and attendance.
    RemoveStudent { student_id: String },

    /// Add every student in a spreadsheet (.xlsx, .xls, .ods or .csv) to the roster.
    ImportStudents { file_path: PathBuf },

    /// List students, optionally filtered by name.
    ListStudents {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, value_parser = clap::value_parser!(i64).range(1..=MAX_PAGE_INPUT))]
        page: Option<i64>,
        #[arg(long, value_parser = clap::value_parser!(i64).range(1..=MAX_PAGE_INPUT))]
        limit: Option<i64>,
        /// Show every column.
        #[arg(short, long)]
        verbose: bool,
    },

    /// List the courses a student is enrolled in.
    StudentCourses { student_id: String },

    /// Add a new course.
    AddCourse {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },

    /// List all courses.
    ListCourses,

    /// Show a course's sessions and per-student attendance.
    ShowCourse { course_id: String },

    /// Enroll a student in a course.
    Enroll { course_id: String, student_id: String },

    /// Add an attendance-taking session to a course.
    AddSession {
        course_id: String,
        /// `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM`.
        #[arg(value_parser = parse_session_date)]
        date: NaiveDateTime,
    },

    /// Show the marking sheet of a session.
    ShowSession { session_id: String },

    /// Record a session's attendance. Enrolled students not listed are marked absent.
    MarkAttendance {
        session_id: String,
        /// IDs of the students who were present.
        #[arg(long = "present", num_args = 0..)]
        present: Vec<String>,
    },

    /// Export a session's attendance to an xlsx file.
    ExportSession {
        session_id: String,
        /// Where to write the file. Defaults to `attendance-<sessionId>.xlsx`.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Include enrolled students without a record, as absent.
        #[arg(long)]
        include_unmarked: bool,
    },

    /// Show a student's attendance in a course.
    StudentReport { student_id: String, course_id: String },

    /// Export per-student course attendance as CSV.
    ExportCourseReport {
        course_id: String,
        /// Where to write the file. Defaults to standard output.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Show roster totals and upcoming sessions.
    Dashboard,

    /// List students whose attendance in a course is below the threshold.
    FlagAtRisk {
        course_id: String,
        /// Percentage below which a student is flagged. Defaults to the configured threshold.
        #[arg(long)]
        threshold: Option<u32>,
    },

    /// Email students whose attendance in a course is below the threshold.
    EmailAtRisk {
        course_id: String,
        #[arg(long)]
        threshold: Option<u32>,
    },
}

/// Parses a session date, either a bare date (taken as midnight) or a date and time.
pub fn parse_session_date(value: &str) -> Result<NaiveDateTime, String> {
    let value = value.trim();

    for format in ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(date) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(date);
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| format!("invalid date {value:?}, expected YYYY-MM-DD or YYYY-MM-DDTHH:MM"))
}
