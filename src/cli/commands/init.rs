//! Initialize the field database.
//!
//! Creates the database (with schema applied) and the backup directory.
//! Both default to locations under `~/.acfporter/`, and both honor
//! the `--db` / `--backup-dir` flags and their environment variables.

use crate::config::{resolve_backup_dir, resolve_db_path};
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Serialize)]
struct InitOutput {
    database: PathBuf,
    backup_dir: PathBuf,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns `AlreadyInitialized` if the database exists and `force` is not
/// set, or an error if a directory or the database cannot be created.
pub fn execute(
    db_path: Option<&PathBuf>,
    backup_dir: Option<&PathBuf>,
    force: bool,
    json: bool,
) -> Result<()> {
    let db_path = resolve_db_path(db_path.map(|p| p.as_path()))
        .ok_or_else(|| Error::Config("Could not determine database location".to_string()))?;
    let backup_dir = resolve_backup_dir(backup_dir.map(|p| p.as_path()))
        .ok_or_else(|| Error::Config("Could not determine backup directory".to_string()))?;

    if db_path.exists() {
        if !force {
            return Err(Error::AlreadyInitialized { path: db_path });
        }
        remove_database(&db_path)?;
    }

    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::create_dir_all(&backup_dir)?;

    // Opening applies the schema
    SqliteStorage::open(&db_path)?;
    info!(db = %db_path.display(), "Initialized field database");

    if json {
        let output = InitOutput {
            database: db_path,
            backup_dir,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("Initialized acf-porter");
        println!("  Database: {}", db_path.display());
        println!("  Backups:  {}", backup_dir.display());
        println!();
        println!("Next: create an item with 'acfp item create <title>'.");
    }

    Ok(())
}

/// Remove a database file and its WAL side files.
fn remove_database(db_path: &Path) -> Result<()> {
    fs::remove_file(db_path)?;
    for suffix in ["-wal", "-shm"] {
        let mut side = db_path.as_os_str().to_owned();
        side.push(suffix);
        let side = PathBuf::from(side);
        if side.exists() {
            fs::remove_file(side)?;
        }
    }
    Ok(())
}
