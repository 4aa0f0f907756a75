//! Prepares the database: applies any pending migrations and, if a roster file is passed as the
//! first argument, imports it.

use anyhow::{Context, Result, bail};
use attendance_portal::spreadsheet::RosterFormat;
use std::env;
use std::fs;
use std::path::PathBuf;

pub fn main() -> Result<()> {
    attendance_portal::init_tracing();

    // Connecting runs the migrations.
    let (settings, mut portal) = attendance_portal::create_default_portal(None)?;
    println!("Database ready at {}", settings.database_url);

    let Some(roster_path) = env::args().nth(1).map(PathBuf::from) else {
        return Ok(());
    };

    let bytes = fs::read(&roster_path)
        .with_context(|| format!("failed to read {}", roster_path.display()))?;
    let result = portal.import_students(&bytes, RosterFormat::from_path(&roster_path));
    println!("{}", result.message);

    if !result.success {
        bail!(result.message);
    }

    let roster = portal.manager().get_roster()?;
    println!("{} students on the roster", roster.len());

    Ok(())
}
