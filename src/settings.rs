//! Runtime configuration, read from an optional `config.toml` and `ATTENDANCE__*` environment
//! variables.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;

/// The default percentage below which a student is flagged for low attendance.
pub const DEFAULT_LOW_ATTENDANCE_THRESHOLD: u32 = 75;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_url: String,
    #[serde(default)]
    pub admin: AdminSettings,
    #[serde(default)]
    pub report: ReportSettings,
    pub smtp: Option<SmtpSettings>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminSettings {
    /// The administrator operating the CLI. Without one, every action is unauthorized.
    pub operator: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportSettings {
    pub low_attendance_threshold: u32,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            low_attendance_threshold: DEFAULT_LOW_ATTENDANCE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpSettings {
    pub relay: String,
    pub username: String,
    pub sender: String,
    /// Comma separated addresses copied on every notice.
    #[serde(default)]
    pub cc: String,
}

impl Settings {
    /// Loads settings from the given file (required), or from `config.toml` (optional) when no
    /// path is given. `DATABASE_URL` from the environment or a `.env` file takes precedence over
    /// the file.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("config").required(false),
        };

        Config::builder()
            .set_default("database_url", "attendance.db")?
            .add_source(file)
            .add_source(Environment::with_prefix("ATTENDANCE").separator("__"))
            .set_override_option("database_url", env::var("DATABASE_URL").ok())?
            .build()?
            .try_deserialize()
    }
}
