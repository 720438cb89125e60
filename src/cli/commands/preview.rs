//! Preview command implementation.
//!
//! Shows the per-key diff between an item's current fields and a candidate
//! payload. Nothing is written and no backup is taken.

use crate::cli::PreviewArgs;
use crate::cli::commands::{backup_storage, load_policy, open_storage, read_payload, resolve_actor};
use crate::error::Result;
use crate::transfer::{render_value, Classification, PreviewCommand, PreviewReport, TransferService};
use colored::{ColoredString, Colorize};
use std::path::PathBuf;

/// Execute the preview command.
///
/// # Errors
///
/// Returns an error if the item is missing or the payload is invalid.
pub fn execute(
    args: &PreviewArgs,
    db_path: Option<&PathBuf>,
    backup_dir: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let (limits, _) = load_policy()?;
    let (inline_text, uploaded_file) = read_payload(&args.payload, &limits)?;
    let truncate = limits.preview_truncate;

    let mut storage = open_storage(db_path)?;
    let backups = backup_storage(backup_dir)?;
    let mut service =
        TransferService::new(&mut storage, &backups, resolve_actor(actor)).with_limits(limits);

    let report = service.preview_import(&PreviewCommand {
        item_id: args.item,
        inline_text,
        uploaded_file,
    })?;

    if json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        print_report(&report, truncate);
    }

    Ok(())
}

fn badge(classification: Classification) -> ColoredString {
    let label = format!("{:<9}", classification.as_str());
    match classification {
        Classification::New => label.green(),
        Classification::Changed => label.yellow(),
        Classification::Removed => label.red(),
        Classification::Unchanged => label.dimmed(),
    }
}

fn badge_rejected() -> ColoredString {
    format!("{:<9}", "rejected").red().bold()
}

fn print_report(report: &PreviewReport, truncate: usize) {
    println!(
        "Preview for {} {} (from {})",
        format!("#{}", report.item.id).bold(),
        report.item.title.bold(),
        report.provenance
    );
    println!();

    for entry in &report.entries {
        println!("  {} {}", badge(entry.classification), entry.key.bold());
        if entry.classification != Classification::Unchanged {
            let before = render_value(entry.previous_value.as_ref(), truncate);
            let after = render_value(entry.new_value.as_ref(), truncate);
            println!("      - {}", before.replace('\n', "\n        ").dimmed());
            println!("      + {}", after.replace('\n', "\n        "));
        }
    }

    for key in &report.rejected_keys {
        println!("  {} {:?} (empty after sanitizing)", badge_rejected(), key);
    }

    let s = &report.summary;
    println!();
    println!(
        "{} new, {} changed, {} removed, {} unchanged",
        s.new, s.changed, s.removed, s.unchanged
    );
    if !s.has_changes() {
        println!("{}", "Nothing would change.".dimmed());
    }
    println!("Fingerprint: {}", report.fingerprint);
    println!(
        "{}",
        format!(
            "Import with --expect {} to refuse the import if the item changes first.",
            report.fingerprint
        )
        .dimmed()
    );
}
