//! Export command implementation.

use crate::cli::ExportArgs;
use crate::cli::commands::{backup_storage, load_policy, open_storage, resolve_actor};
use crate::error::Result;
use crate::transfer::TransferService;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Serialize)]
struct ExportOutput {
    item_id: i64,
    path: PathBuf,
    content_type: &'static str,
    field_count: usize,
}

/// Execute the export command.
///
/// Writes `acf-export-<slug>.json` into the current directory unless
/// `--output` or `--stdout` is given.
///
/// # Errors
///
/// Returns an error if the item is missing or has no fields, the actor
/// is not allowed, or the file cannot be written.
pub fn execute(
    args: &ExportArgs,
    db_path: Option<&PathBuf>,
    backup_dir: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let backups = backup_storage(backup_dir)?;
    let (limits, policy) = load_policy()?;

    let service = TransferService::new(&mut storage, &backups, resolve_actor(actor))
        .with_limits(limits)
        .with_policy(policy);
    let document = service.export_fields(args.item)?;

    if args.stdout {
        print!("{}", document.body);
        return Ok(());
    }

    let path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&document.filename));
    fs::write(&path, document.body.as_bytes())?;
    info!(path = %path.display(), "Wrote export");

    if json {
        let output = ExportOutput {
            item_id: document.item.id,
            path,
            content_type: document.content_type,
            field_count: document.field_count,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!(
            "Exported {} fields from '{}' to {}",
            document.field_count,
            document.item.title,
            path.display()
        );
    }

    Ok(())
}
