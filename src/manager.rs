use crate::error::{PortalError, StoreResultExt};
use crate::models::{Course, CourseAttendance, CourseEnrollment, CourseSession, Student, new_id};
use crate::schema::{course_attendance, course_enrollments, course_sessions, courses, students};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::result::QueryResult;
use diesel::sql_types::Text;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// The escape character of `LIKE` patterns built by [`contains_pattern`].
const LIKE_ESCAPE: char = '!';

/// Builds a `LIKE` pattern matching `needle` anywhere, with `%` and `_` taken literally.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '!' | '%' | '_') {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

// Emails are matched case-insensitively.
diesel::define_sql_function! {
    fn lower(x: Text) -> Text;
}

/// One row of a session export: the student's name and roll number, and whether they were
/// present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAttendanceRow {
    pub student_name: String,
    pub rollno: String,
    pub present: bool,
}

/// The manager for recording, modifying, and retrieving roster and attendance data.
pub struct AttendanceManager {
    db: SqliteConnection,
}

impl AttendanceManager {
    /// Creates a new `AttendanceManager` by connecting to the `sqlite3` database at
    /// `database_url`, enabling foreign keys and running any pending migrations.
    pub fn establish(database_url: &str) -> Result<Self, PortalError> {
        let mut connection =
            SqliteConnection::establish(database_url).map_err(|source| {
                PortalError::Connection {
                    url: database_url.to_string(),
                    source,
                }
            })?;

        diesel::sql_query("PRAGMA foreign_keys = ON")
            .execute(&mut connection)
            .during("enable foreign keys")?;

        let applied = connection
            .run_pending_migrations(MIGRATIONS)
            .map_err(PortalError::Migration)?;
        if !applied.is_empty() {
            info!(count = applied.len(), "applied pending migrations");
        }

        debug!(database_url, "connected to roster store");
        Ok(Self { db: connection })
    }

    /// Returns the total number of students on the roster.
    pub fn num_students(&mut self) -> QueryResult<usize> {
        students::table
            .count()
            .get_result(&mut self.db)
            .map(|count: i64| count as usize)
    }

    /// Returns the total number of courses.
    pub fn num_courses(&mut self) -> QueryResult<usize> {
        courses::table
            .count()
            .get_result(&mut self.db)
            .map(|count: i64| count as usize)
    }

    /// Retrieves all students on the roster, ordered by name.
    pub fn get_roster(&mut self) -> QueryResult<Vec<Student>> {
        use crate::schema::students::dsl::*;

        students
            .order(name.asc())
            .select(Student::as_select())
            .load(&mut self.db)
    }

    /// Retrieves one page of students whose name contains `search`, ignoring ASCII case, along
    /// with the total number of matches.
    pub fn search_students(
        &mut self,
        search: &str,
        offset: i64,
        limit: i64,
    ) -> QueryResult<(Vec<Student>, i64)> {
        use crate::schema::students::dsl::*;

        let pattern = contains_pattern(search.trim());

        let page = students
            .filter(name.like(&pattern).escape(LIKE_ESCAPE))
            .order(name.asc())
            .offset(offset)
            .limit(limit)
            .select(Student::as_select())
            .load(&mut self.db)?;

        let total = students
            .filter(name.like(&pattern).escape(LIKE_ESCAPE))
            .count()
            .get_result(&mut self.db)?;

        Ok((page, total))
    }

    /// Retrieves a specific student based on their ID.
    pub fn get_student(&mut self, student_id: &str) -> QueryResult<Option<Student>> {
        students::table
            .find(student_id)
            .select(Student::as_select())
            .first(&mut self.db)
            .optional()
    }

    /// Inserts a single student.
    pub fn insert_student(&mut self, student: &Student) -> QueryResult<()> {
        diesel::insert_into(students::table)
            .values(student)
            .execute(&mut self.db)?;

        Ok(())
    }

    /// Inserts students in one transaction: either all of them are inserted or none are.
    pub fn insert_students(&mut self, new_students: &[Student]) -> QueryResult<usize> {
        self.db.transaction(|conn| {
            diesel::insert_into(students::table)
                .values(new_students)
                .execute(conn)
        })
    }

    /// Returns which of the given emails already belong to a student, ignoring ASCII case as
    /// SQLite's `lower()` does. The returned emails are lower-cased.
    pub fn existing_emails(&mut self, candidates: &[String]) -> QueryResult<Vec<String>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let lowered: Vec<String> = candidates.iter().map(|e| e.to_ascii_lowercase()).collect();

        students::table
            .filter(lower(students::email).eq_any(&lowered))
            .select(lower(students::email))
            .order(lower(students::email).asc())
            .load(&mut self.db)
    }

    /// Removes and returns a student given their ID, along with all of their enrollments and
    /// attendance records. Returns `None` if the student does not exist.
    pub fn delete_student(&mut self, student_id: &str) -> QueryResult<Option<Student>> {
        self.db.transaction(|conn| {
            let Some(student) = students::table
                .find(student_id)
                .select(Student::as_select())
                .first(conn)
                .optional()?
            else {
                return Ok(None);
            };

            let enrollments = diesel::delete(
                course_enrollments::table.filter(course_enrollments::student_id.eq(student_id)),
            )
            .execute(conn)?;
            let records = diesel::delete(
                course_attendance::table.filter(course_attendance::student_id.eq(student_id)),
            )
            .execute(conn)?;
            diesel::delete(students::table.find(student_id)).execute(conn)?;

            debug!(student_id, enrollments, records, "deleted student and dependents");
            Ok(Some(student))
        })
    }

    /// Retrieves all courses, ordered by name.
    pub fn get_courses(&mut self) -> QueryResult<Vec<Course>> {
        courses::table
            .order(courses::name.asc())
            .select(Course::as_select())
            .load(&mut self.db)
    }

    pub fn get_course(&mut self, course_id: &str) -> QueryResult<Option<Course>> {
        courses::table
            .find(course_id)
            .select(Course::as_select())
            .first(&mut self.db)
            .optional()
    }

    pub fn insert_course(&mut self, name: &str, description: Option<&str>) -> QueryResult<Course> {
        let course = Course {
            id: new_id(),
            name: name.to_string(),
            description: description.map(str::to_string),
        };

        diesel::insert_into(courses::table)
            .values(&course)
            .execute(&mut self.db)?;

        Ok(course)
    }

    /// Retrieves the courses a student is enrolled in.
    pub fn get_student_courses(&mut self, student_id: &str) -> QueryResult<Vec<Course>> {
        course_enrollments::table
            .inner_join(courses::table)
            .filter(course_enrollments::student_id.eq(student_id))
            .order(courses::name.asc())
            .select(Course::as_select())
            .load(&mut self.db)
    }

    pub fn insert_session(
        &mut self,
        course_id: &str,
        date: NaiveDateTime,
    ) -> QueryResult<CourseSession> {
        let session = CourseSession {
            id: new_id(),
            course_id: course_id.to_string(),
            date,
        };

        diesel::insert_into(course_sessions::table)
            .values(&session)
            .execute(&mut self.db)?;

        Ok(session)
    }

    pub fn get_session(&mut self, session_id: &str) -> QueryResult<Option<CourseSession>> {
        course_sessions::table
            .find(session_id)
            .select(CourseSession::as_select())
            .first(&mut self.db)
            .optional()
    }

    /// Retrieves every session of a course in date order.
    pub fn get_course_sessions(&mut self, course_id: &str) -> QueryResult<Vec<CourseSession>> {
        course_sessions::table
            .filter(course_sessions::course_id.eq(course_id))
            .order(course_sessions::date.asc())
            .select(CourseSession::as_select())
            .load(&mut self.db)
    }

    /// Retrieves up to `limit` sessions dated at or after `now`, soonest first.
    pub fn get_upcoming_sessions(
        &mut self,
        now: NaiveDateTime,
        limit: i64,
    ) -> QueryResult<Vec<CourseSession>> {
        course_sessions::table
            .filter(course_sessions::date.ge(now))
            .order(course_sessions::date.asc())
            .limit(limit)
            .select(CourseSession::as_select())
            .load(&mut self.db)
    }

    /// Enrolls a student in a course. Enrolling twice violates the (student, course) uniqueness
    /// constraint.
    pub fn enroll(&mut self, student_id: &str, course_id: &str) -> QueryResult<CourseEnrollment> {
        let enrollment = CourseEnrollment {
            id: new_id(),
            student_id: student_id.to_string(),
            course_id: course_id.to_string(),
        };

        diesel::insert_into(course_enrollments::table)
            .values(&enrollment)
            .execute(&mut self.db)?;

        Ok(enrollment)
    }

    /// Retrieves every student enrolled in a course, ordered by name.
    pub fn get_enrolled_students(&mut self, course_id: &str) -> QueryResult<Vec<Student>> {
        course_enrollments::table
            .inner_join(students::table)
            .filter(course_enrollments::course_id.eq(course_id))
            .order(students::name.asc())
            .select(Student::as_select())
            .load(&mut self.db)
    }

    /// Retrieves the students with the given IDs.
    pub fn get_students_by_id(&mut self, ids: &[String]) -> QueryResult<Vec<Student>> {
        students::table
            .filter(students::id.eq_any(ids))
            .select(Student::as_select())
            .load(&mut self.db)
    }

    /// Returns the attendance records for a given session.
    pub fn get_session_attendance(&mut self, session_id: &str) -> QueryResult<Vec<CourseAttendance>> {
        course_attendance::table
            .filter(course_attendance::course_session_id.eq(session_id))
            .select(CourseAttendance::as_select())
            .load(&mut self.db)
    }

    /// Returns the attendance records of a session joined with each student's name and roll
    /// number. Students without a record are not included.
    pub fn get_session_attendance_rows(
        &mut self,
        session_id: &str,
    ) -> QueryResult<Vec<SessionAttendanceRow>> {
        let rows = course_attendance::table
            .inner_join(students::table)
            .filter(course_attendance::course_session_id.eq(session_id))
            .order(students::name.asc())
            .select((students::name, students::rollno, course_attendance::present))
            .load::<(String, String, bool)>(&mut self.db)?;

        Ok(rows
            .into_iter()
            .map(|(student_name, rollno, present)| SessionAttendanceRow {
                student_name,
                rollno,
                present,
            })
            .collect())
    }

    /// Returns every attendance record of every session of a course.
    pub fn get_course_attendance(&mut self, course_id: &str) -> QueryResult<Vec<CourseAttendance>> {
        course_attendance::table
            .inner_join(course_sessions::table)
            .filter(course_sessions::course_id.eq(course_id))
            .select(CourseAttendance::as_select())
            .load(&mut self.db)
    }

    /// Returns one student's attendance records across the sessions of a course.
    pub fn get_student_course_attendance(
        &mut self,
        student_id: &str,
        course_id: &str,
    ) -> QueryResult<Vec<CourseAttendance>> {
        course_attendance::table
            .inner_join(course_sessions::table)
            .filter(course_sessions::course_id.eq(course_id))
            .filter(course_attendance::student_id.eq(student_id))
            .select(CourseAttendance::as_select())
            .load(&mut self.db)
    }

    /// Writes the given attendance records in one transaction. If a record for the same
    /// (student, session) already exists, its `present` flag is overwritten.
    pub fn upsert_attendance(&mut self, records: &[CourseAttendance]) -> QueryResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        self.db.transaction(|conn| {
            diesel::replace_into(course_attendance::table)
                .values(records)
                .execute(conn)
        })
    }
}
