use anyhow::Result;
use std::path::Path;

pub mod aggregate;
pub mod auth;
pub mod cli;
pub mod display;
pub mod error;
pub mod mailer;
pub mod manager;
pub mod models;
pub mod portal;
pub mod schema;
pub mod settings;
pub mod spreadsheet;

use crate::auth::StaticSession;
use crate::manager::AttendanceManager;
use crate::portal::Portal;
use crate::settings::Settings;

/// Loads the settings and opens a portal on the configured database, signed in as the configured
/// operator.
pub fn create_default_portal(config_path: Option<&Path>) -> Result<(Settings, Portal<StaticSession>)> {
    // Load configuration from `config.toml` or the given path.
    let settings = Settings::load_from(config_path)?;

    let manager = portal::user_facing(AttendanceManager::establish(&settings.database_url))?;
    let session = StaticSession::from_operator(settings.admin.operator.as_deref());

    Ok((settings, Portal::new(manager, session)))
}

/// Installs the `tracing` subscriber, filtered by `RUST_LOG` (default `info`). Logs go to stderr
/// so that exported files can be written to stdout.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}
