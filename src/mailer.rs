use crate::portal::LowAttendance;
use crate::settings::SmtpSettings;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::env;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("SMTP is not configured; add an [smtp] section to the configuration")]
    NotConfigured,

    #[error("SMTP_PASSWORD must be set")]
    MissingPassword,

    #[error("invalid address {address:?}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error(transparent)]
    Message(#[from] lettre::error::Error),

    #[error(transparent)]
    Smtp(#[from] lettre::transport::smtp::Error),
}

fn mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.trim().parse().map_err(|source| MailError::Address {
        address: address.to_string(),
        source,
    })
}

fn parse_recipients(recipients: &str) -> Vec<&str> {
    recipients
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Builds the low-attendance notice for one student.
pub fn low_attendance_notice(
    smtp: &SmtpSettings,
    course_name: &str,
    flagged: &LowAttendance,
) -> Result<Message, MailError> {
    let mut builder = Message::builder()
        .from(mailbox(&smtp.sender)?)
        .to(mailbox(&flagged.student.email)?)
        .subject(format!("Low attendance in {course_name}"))
        .header(ContentType::TEXT_PLAIN);

    for cc in parse_recipients(&smtp.cc) {
        builder = builder.cc(mailbox(cc)?);
    }

    let body = format!(
        "Hi {name},\n\n\
         You have attended {attended} of {total} sessions of {course_name} so far ({percentage}%).\n\
         Please reach out if there is anything we should know about.\n",
        name = flagged.student.name,
        attended = flagged.stats.attended_sessions,
        total = flagged.stats.total_sessions,
        percentage = flagged.stats.percentage,
    );

    Ok(builder.body(body)?)
}

/// Emails every flagged student, returning how many notices were sent.
pub fn send_low_attendance_notices(
    smtp: Option<&SmtpSettings>,
    course_name: &str,
    flagged: &[LowAttendance],
) -> Result<usize, MailError> {
    let smtp = smtp.ok_or(MailError::NotConfigured)?;
    let password = env::var("SMTP_PASSWORD").map_err(|_| MailError::MissingPassword)?;

    // Build every message before connecting so that a bad address sends nothing.
    let messages = flagged
        .iter()
        .map(|f| low_attendance_notice(smtp, course_name, f))
        .collect::<Result<Vec<_>, _>>()?;

    let transport = SmtpTransport::starttls_relay(&smtp.relay)?
        .credentials(Credentials::new(smtp.username.clone(), password))
        .build();

    for message in &messages {
        transport.send(message)?;
    }

    info!(sent = messages.len(), course_name, "sent low attendance notices");
    Ok(messages.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::StudentAttendanceStats;
    use crate::models::Student;

    fn smtp(cc: &str) -> SmtpSettings {
        SmtpSettings {
            relay: "smtp.example.com".to_string(),
            username: "attendance@example.com".to_string(),
            sender: "attendance@example.com".to_string(),
            cc: cc.to_string(),
        }
    }

    fn flagged(email: &str) -> LowAttendance {
        LowAttendance {
            student: Student {
                id: "ada".to_string(),
                name: "Ada".to_string(),
                email: email.to_string(),
                branch: "CSE".to_string(),
                phone: "555".to_string(),
                rollno: "R1".to_string(),
            },
            stats: StudentAttendanceStats {
                student_id: "ada".to_string(),
                student_name: "Ada".to_string(),
                attended_sessions: 1,
                total_sessions: 4,
                percentage: 25,
            },
        }
    }

    #[test]
    fn recipients_are_split_and_trimmed() {
        assert_eq!(
            parse_recipients(" a@x.com, ,b@x.com "),
            vec!["a@x.com", "b@x.com"]
        );
        assert!(parse_recipients("").is_empty());
    }

    #[test]
    fn notice_reports_the_percentage() {
        let message = low_attendance_notice(&smtp("dean@example.com"), "Rust 101", &flagged("ada@x.com")).unwrap();

        let envelope = message.envelope();
        assert_eq!(envelope.to().len(), 2);

        let text = String::from_utf8(message.formatted()).unwrap();
        assert!(text.contains("Subject: Low attendance in Rust 101"));
        assert!(text.contains("1 of 4 sessions"));
        assert!(text.contains("(25%)"));
    }

    #[test]
    fn invalid_student_address_is_rejected() {
        let err = low_attendance_notice(&smtp(""), "Rust 101", &flagged("not an address")).unwrap_err();

        assert!(matches!(err, MailError::Address { .. }));
    }

    #[test]
    fn sending_requires_configuration() {
        let err = send_low_attendance_notices(None, "Rust 101", &[]).unwrap_err();

        assert!(matches!(err, MailError::NotConfigured));
    }
}
