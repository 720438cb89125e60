//! Import command implementation.

use crate::cli::ImportArgs;
use crate::cli::commands::{backup_storage, load_policy, open_storage, read_payload, resolve_actor};
use crate::error::Result;
use crate::transfer::{ImportCommand, KeyOutcome, OutcomeStatus, ReconcileOutcome, TransferService};
use colored::Colorize;
use std::path::PathBuf;
use tracing::warn;

/// Execute the import command.
///
/// Every key is written independently; an import where some keys fail
/// still succeeds. If every key fails the command exits with the
/// update-failed code.
///
/// # Errors
///
/// Returns an error for missing input, an invalid payload, a failed
/// backup, a fingerprint mismatch, or when no key could be written.
pub fn execute(
    args: &ImportArgs,
    db_path: Option<&PathBuf>,
    backup_dir: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let (limits, policy) = load_policy()?;
    let (inline_text, uploaded_file) = read_payload(&args.payload, &limits)?;

    let actor = resolve_actor(actor);
    let mut storage = open_storage(db_path)?.with_actor(actor.clone());
    let backups = backup_storage(backup_dir)?;

    let mut service = TransferService::new(&mut storage, &backups, actor)
        .with_limits(limits)
        .with_policy(policy);

    let outcome = service.import_fields(&ImportCommand {
        item_id: args.item,
        inline_text,
        uploaded_file,
        create_backup: args.backup,
        expected_fingerprint: args.expect.clone(),
    })?;

    report(&outcome, json)
}

/// Print an import outcome, converting `UpdateFailed` into an error.
pub(crate) fn report(outcome: &ReconcileOutcome, json: bool) -> Result<()> {
    for (key, result) in &outcome.per_key_outcome {
        if let KeyOutcome::Failed(reason) = result {
            warn!(key = %key, reason = %reason, "Field not updated");
        }
    }

    if outcome.status == OutcomeStatus::UpdateFailed {
        outcome.clone().into_result()?;
    }

    if json {
        println!("{}", serde_json::to_string(outcome)?);
        return Ok(());
    }

    println!(
        "{} {} fields into item {} from {}",
        "Imported".green().bold(),
        outcome.updated_count,
        outcome.item_id,
        outcome.provenance
    );
    if let Some(path) = &outcome.backup_path {
        println!("  Backup: {}", path.display());
    }
    if outcome.failed_count > 0 {
        println!(
            "  {}",
            format!("{} fields failed:", outcome.failed_count).yellow()
        );
        for (key, result) in &outcome.per_key_outcome {
            if let KeyOutcome::Failed(reason) = result {
                println!("    {key}: {reason}");
            }
        }
    }

    Ok(())
}
