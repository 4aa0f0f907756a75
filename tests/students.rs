mod common;

use attendance_portal::auth::StaticSession;
use common::{course, portal, portal_as, record, student};
use std::collections::HashSet;

#[test]
fn adds_a_student_with_trimmed_fields() {
    let mut portal = portal();

    let result = portal.add_student(record("  Ada ", "ada@x.com ", "R1"));

    assert_eq!(result.message, "Student added successfully");
    let roster = portal.manager().get_roster().unwrap();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].name, "Ada");
    assert_eq!(roster[0].email, "ada@x.com");
}

#[test]
fn rejects_a_blank_field() {
    let mut portal = portal();

    let result = portal.add_student(record("Ada", "", "R1"));

    assert!(!result.success);
    assert_eq!(result.message, "Email is required");
    assert_eq!(portal.manager().num_students().unwrap(), 0);
}

#[test]
fn rejects_an_email_already_on_the_roster() {
    let mut portal = portal();
    assert!(portal.add_student(record("Ada", "ada@x.com", "R1")).success);

    let result = portal.add_student(record("Other Ada", "ADA@x.com", "R2"));

    assert!(!result.success);
    assert_eq!(result.message, "A student with this email already exists");
    assert_eq!(portal.manager().num_students().unwrap(), 1);
}

#[test]
fn deleting_a_student_removes_their_enrollments_and_records() {
    let mut portal = portal();
    let ada = student(&mut portal, "Ada", "R1");
    let bob = student(&mut portal, "Bob", "R2");
    let (course, sessions) = course(&mut portal, 1, &[&ada, &bob]);
    let present: HashSet<String> = [ada.id.clone(), bob.id.clone()].into_iter().collect();
    assert!(portal.save_attendance(&sessions[0].id, &present).success);

    let result = portal.delete_student(&ada.id);

    assert_eq!(result.message, "Student deleted successfully");
    let manager = portal.manager();
    assert!(manager.get_student(&ada.id).unwrap().is_none());

    let enrolled: Vec<_> = manager
        .get_enrolled_students(&course.id)
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(enrolled, vec![bob.id.clone()]);

    let records = manager.get_session_attendance(&sessions[0].id).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].student_id, bob.id);
}

#[test]
fn deleting_an_unknown_student_is_not_found() {
    let mut portal = portal();

    let result = portal.delete_student("missing");

    assert!(!result.success);
    assert_eq!(result.message, "Student not found");
}

#[test]
fn enrolling_twice_is_rejected() {
    let mut portal = portal();
    let ada = student(&mut portal, "Ada", "R1");
    let (course, _) = course(&mut portal, 0, &[]);

    assert!(portal.enroll_student(&course.id, &ada.id).success);
    let result = portal.enroll_student(&course.id, &ada.id);

    assert!(!result.success);
    assert_eq!(result.message, "Student is already enrolled in this course");
}

#[test]
fn enrolling_in_an_unknown_course_is_not_found() {
    let mut portal = portal();
    let ada = student(&mut portal, "Ada", "R1");

    let result = portal.enroll_student("missing", &ada.id);

    assert_eq!(result.message, "Course not found");
}

#[test]
fn sessions_need_an_existing_course() {
    let mut portal = portal();

    let result = portal.add_session("missing", common::day(1));

    assert!(!result.success);
    assert_eq!(result.message, "Course not found");
}

#[test]
fn courses_are_added_and_listed() {
    let mut portal = portal();

    assert!(portal.add_course("Systems", Some("  ")).success);
    assert!(portal.add_course("Algorithms", Some("Graphs")).success);
    assert_eq!(portal.add_course(" ", None).message, "Name is required");

    let courses = portal.list_courses().unwrap();
    let listed: Vec<_> = courses
        .iter()
        .map(|c| (c.name.as_str(), c.description.as_deref()))
        .collect();
    assert_eq!(listed, vec![("Algorithms", Some("Graphs")), ("Systems", None)]);
}

#[test]
fn lists_the_courses_of_a_student() {
    let mut portal = portal();
    let ada = student(&mut portal, "Ada", "R1");
    let (course, _) = course(&mut portal, 0, &[&ada]);
    assert!(portal.add_course("Unrelated", None).success);

    let courses = portal.student_courses(&ada.id).unwrap();

    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0].id, course.id);
    assert_eq!(
        portal.student_courses("missing").unwrap_err().user_message(),
        "Student not found"
    );
}

#[test]
fn mutations_require_a_session() {
    let mut portal = portal_as(StaticSession::signed_out());

    let result = portal.add_student(record("Ada", "ada@x.com", "R1"));

    assert!(!result.success);
    assert_eq!(result.message, "Unauthorized");
    assert_eq!(portal.add_course("Systems", None).message, "Unauthorized");
    assert_eq!(portal.manager().num_students().unwrap(), 0);
}
