//! Error types for the portal.
//!
//! Every error carries a message that is safe to show an administrator. Store failures are the
//! exception: their source is logged and only a generic "failed to ..." message is surfaced.

use thiserror::Error;

/// The columns a roster spreadsheet must contain, matched case-insensitively.
pub const REQUIRED_COLUMNS: [&str; 5] = ["Name", "Email", "Branch", "Phone", "Roll No"];

/// A failure while importing a roster spreadsheet. None of these leave anything behind in the
/// store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImportError {
    /// The payload could not be parsed as a spreadsheet at all.
    #[error("Unreadable file: {0}")]
    UnreadableFile(String),

    /// The header row is missing one or more of [`REQUIRED_COLUMNS`].
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<&'static str>),

    /// A row with an email is missing another required field.
    #[error("Row {row}: {field} is required")]
    InvalidRow { row: usize, field: &'static str },

    /// The same email (ignoring case) appears twice in the file.
    #[error("Duplicate email found in file at row {row}: {email}")]
    DuplicateInFile { row: usize, email: String },

    /// Some emails in the file already belong to students in the store.
    #[error("The following emails already exist: {}", .0.join(", "))]
    DuplicateInStore(Vec<String>),
}

#[derive(Debug, Error)]
pub enum PortalError {
    /// There is no active admin session.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{resource} not found")]
    NotFound { resource: &'static str, id: String },

    /// Submitted input failed validation.
    #[error("{0}")]
    Invalid(String),

    /// An enrollment already exists for this (student, course) pair.
    #[error("Student is already enrolled in this course")]
    AlreadyEnrolled,

    /// A student with this email already exists.
    #[error("A student with this email already exists")]
    DuplicateEmail,

    #[error(transparent)]
    Import(#[from] ImportError),

    /// A store operation failed. `operation` reads as "failed to {operation}".
    #[error("Failed to {operation}")]
    Store {
        operation: &'static str,
        #[source]
        source: diesel::result::Error,
    },

    #[error("Failed to connect to the database at {url}")]
    Connection {
        url: String,
        #[source]
        source: diesel::ConnectionError,
    },

    #[error("Failed to run database migrations")]
    Migration(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Writing a spreadsheet or CSV report failed.
    #[error("Failed to {operation}")]
    Report {
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl PortalError {
    pub fn not_found(resource: &'static str, id: &str) -> Self {
        PortalError::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Returns a message that can be shown to an administrator without leaking internals.
    pub fn user_message(&self) -> String {
        match self {
            PortalError::Store { operation, .. } | PortalError::Report { operation, .. } => {
                format!("Failed to {operation}. Please try again.")
            }
            PortalError::Connection { .. } | PortalError::Migration(_) => {
                "The database is unavailable. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Whether this error hides details that should be logged rather than shown.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            PortalError::Store { .. }
                | PortalError::Report { .. }
                | PortalError::Connection { .. }
                | PortalError::Migration(_)
        )
    }
}

/// Attaches the failed operation to a raw store error.
pub(crate) trait StoreResultExt<T> {
    fn during(self, operation: &'static str) -> Result<T, PortalError>;
}

impl<T> StoreResultExt<T> for diesel::QueryResult<T> {
    fn during(self, operation: &'static str) -> Result<T, PortalError> {
        self.map_err(|source| PortalError::Store { operation, source })
    }
}
