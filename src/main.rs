use anyhow::{Context, Result, bail};
use attendance_portal::cli::{Cli, Command};
use attendance_portal::portal::{ActionResult, user_facing};
use attendance_portal::spreadsheet::{ExportMode, RosterFormat};
use attendance_portal::{aggregate, display, mailer};
use clap::Parser;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report(result: ActionResult, json: bool) -> Result<()> {
    if json {
        print_json(&result)?;
    } else {
        println!("{}", result.message);
    }

    if !result.success {
        bail!(result.message);
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} y/[N]: ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    attendance_portal::init_tracing();

    let (settings, mut portal) = attendance_portal::create_default_portal(cli.config.as_deref())?;
    let json = cli.json;

    match cli.command {
        Command::AddStudent(args) => report(portal.add_student(args.into()), json)?,
        Command::RemoveStudent { student_id } => {
            report(portal.delete_student(&student_id), json)?
        }
        Command::ImportStudents { file_path } => {
            let bytes = fs::read(&file_path)
                .with_context(|| format!("failed to read {}", file_path.display()))?;
            let format = RosterFormat::from_path(&file_path);
            report(portal.import_students(&bytes, format), json)?
        }
        Command::ListStudents {
            search,
            page,
            limit,
            verbose,
        } => {
            let page = user_facing(portal.search_students(&search, page, limit))?;
            if json {
                print_json(&page)?;
            } else {
                display::show_students(&page, verbose);
            }
        }
        Command::StudentCourses { student_id } => {
            let courses = user_facing(portal.student_courses(&student_id))?;
            if json {
                print_json(&courses)?;
            } else {
                display::show_courses(&courses);
            }
        }
        Command::AddCourse { name, description } => {
            report(portal.add_course(&name, description.as_deref()), json)?
        }
        Command::ListCourses => {
            let courses = user_facing(portal.list_courses())?;
            if json {
                print_json(&courses)?;
            } else {
                display::show_courses(&courses);
            }
        }
        Command::ShowCourse { course_id } => {
            let course = user_facing(portal.course_report(&course_id))?;
            if json {
                print_json(&course)?;
            } else {
                display::show_course_report(&course);
            }
        }
        Command::Enroll {
            course_id,
            student_id,
        } => report(portal.enroll_student(&course_id, &student_id), json)?,
        Command::AddSession { course_id, date } => {
            report(portal.add_session(&course_id, date), json)?
        }
        Command::ShowSession { session_id } => {
            let sheet = user_facing(portal.session_sheet(&session_id))?;
            if json {
                print_json(&sheet)?;
            } else {
                display::show_session_sheet(&sheet);
            }
        }
        Command::MarkAttendance {
            session_id,
            present,
        } => {
            let present: HashSet<String> = present.into_iter().collect();
            report(portal.save_attendance(&session_id, &present), json)?
        }
        Command::ExportSession {
            session_id,
            out,
            include_unmarked,
        } => {
            let mode = if include_unmarked {
                ExportMode::AllEnrolled
            } else {
                ExportMode::RecordedOnly
            };
            let file = user_facing(portal.export_session(&session_id, mode))?;
            let path = out.unwrap_or_else(|| file.filename.clone().into());
            fs::write(&path, &file.bytes)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        Command::StudentReport {
            student_id,
            course_id,
        } => {
            let attendance = user_facing(portal.student_course_attendance(&student_id, &course_id))?;
            if json {
                print_json(&attendance)?;
            } else {
                display::show_student_attendance(&attendance);
            }
        }
        Command::ExportCourseReport { course_id, out } => {
            let csv = user_facing(portal.course_report_csv(&course_id))?;
            match out {
                Some(path) => fs::write(&path, csv)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => io::stdout().write_all(&csv)?,
            }
        }
        Command::Dashboard => {
            let dashboard = user_facing(portal.dashboard(chrono::Local::now().naive_local()))?;
            if json {
                print_json(&dashboard)?;
            } else {
                display::show_dashboard(&dashboard);
            }
        }
        Command::FlagAtRisk {
            course_id,
            threshold,
        } => {
            let threshold = threshold.unwrap_or(settings.report.low_attendance_threshold);
            let (course, flagged) = user_facing(portal.low_attendance(&course_id, threshold))?;
            if json {
                let stats: Vec<&aggregate::StudentAttendanceStats> =
                    flagged.iter().map(|f| &f.stats).collect();
                print_json(&stats)?;
            } else {
                display::show_low_attendance(&course.name, threshold, &flagged);
            }
        }
        Command::EmailAtRisk {
            course_id,
            threshold,
        } => {
            let threshold = threshold.unwrap_or(settings.report.low_attendance_threshold);
            let (course, flagged) = user_facing(portal.low_attendance(&course_id, threshold))?;
            display::show_low_attendance(&course.name, threshold, &flagged);
            if flagged.is_empty() {
                return Ok(());
            }

            if !confirm("Email these students?")? {
                println!("Emailing canceled!");
                return Ok(());
            }

            let sent =
                mailer::send_low_attendance_notices(settings.smtp.as_ref(), &course.name, &flagged)?;
            println!("Sent {sent} notices.");
        }
    }

    Ok(())
}
