//! Backup command implementations.

use crate::cli::BackupCommands;
use crate::cli::commands::import::report;
use crate::cli::commands::{backup_storage, load_policy, open_storage, resolve_actor};
use crate::error::Result;
use crate::transfer::{list_backups, BackupStorage, BackupSummary, TransferService};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct BackupListOutput {
    directory: PathBuf,
    backups: Vec<BackupSummary>,
    count: usize,
}

/// Execute backup commands.
///
/// # Errors
///
/// Returns an error if the backup directory cannot be read, or as
/// `import` when restoring.
pub fn execute(
    command: &BackupCommands,
    db_path: Option<&PathBuf>,
    backup_dir: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    match command {
        BackupCommands::List { item } => list(*item, backup_dir, json),
        BackupCommands::Restore { path, backup } => {
            restore(path, *backup, db_path, backup_dir, actor, json)
        }
    }
}

fn list(item_id: Option<i64>, backup_dir: Option<&PathBuf>, json: bool) -> Result<()> {
    let backups = backup_storage(backup_dir)?;
    let summaries = list_backups(&backups, item_id)?;

    if json {
        let output = BackupListOutput {
            directory: backups.location().to_path_buf(),
            count: summaries.len(),
            backups: summaries,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if summaries.is_empty() {
        println!("No backups found in {}", backups.location().display());
    } else {
        println!("Backups ({} found):", summaries.len());
        println!();
        for s in &summaries {
            println!(
                "  {} {} {}",
                s.backup_date.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
                format!("#{}", s.post_id).bold(),
                s.title
            );
            println!(
                "    {} {}",
                s.path.display(),
                format!("({} fields)", s.field_count).dimmed()
            );
        }
    }

    Ok(())
}

fn restore(
    path: &Path,
    create_backup: bool,
    db_path: Option<&PathBuf>,
    backup_dir: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let (limits, policy) = load_policy()?;
    let actor = resolve_actor(actor);
    let mut storage = open_storage(db_path)?.with_actor(actor.clone());
    let backups = backup_storage(backup_dir)?;

    let mut service = TransferService::new(&mut storage, &backups, actor)
        .with_limits(limits)
        .with_policy(policy);

    let outcome = service.restore_backup(path, create_backup)?;
    report(&outcome, json)
}
