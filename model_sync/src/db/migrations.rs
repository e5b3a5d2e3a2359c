//! Migration plan output
//!
//! Plans can be kept as `.sql` scripts next to the database they target.

use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::schema::generator::{render_script, MigrationStep};
use crate::utils::naming::format_file_name;

/// Write a plan to `<directory>/<timestamp>_<label>.sql` and return the path
pub fn write_plan(directory: &Path, label: &str, steps: &[MigrationStep]) -> Result<PathBuf> {
    fs::create_dir_all(directory)?;

    let filename = format!("{}_{}.sql", generate_migration_id(), format_file_name(label));
    let filepath = directory.join(filename);

    fs::write(&filepath, render_script(steps))?;
    tracing::info!(path = %filepath.display(), statements = steps.len(), "Wrote migration plan");

    Ok(filepath)
}

/// Generate a migration ID based on timestamp
fn generate_migration_id() -> String {
    Utc::now().format("%Y%m%d%H%M%S").to_string()
}
