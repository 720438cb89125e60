//! Item command implementations.

use crate::cli::ItemCommands;
use crate::cli::commands::{load_policy, open_storage, resolve_actor};
use crate::error::Result;
use crate::model::{ContentItemRef, FieldSet};
use crate::storage::{Event, SqliteStorage};
use crate::transfer::{fingerprint, render_value, TransferError};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

const HISTORY_LIMIT: u32 = 10;

#[derive(Serialize)]
struct ItemSummary {
    #[serde(flatten)]
    item: ContentItemRef,
    field_count: usize,
}

#[derive(Serialize)]
struct ItemListOutput {
    items: Vec<ItemSummary>,
    count: usize,
}

#[derive(Serialize)]
struct ItemShowOutput {
    item: ContentItemRef,
    fingerprint: String,
    fields: FieldSet,
    history: Vec<Event>,
}

/// Execute item commands.
///
/// # Errors
///
/// Returns an error if the database is unavailable or the item is missing.
pub fn execute(
    command: &ItemCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    match command {
        ItemCommands::Create { title, type_tag } => create(title, type_tag, db_path, actor, json),
        ItemCommands::List { type_tag } => list(type_tag.as_deref(), db_path, json),
        ItemCommands::Show { id } => show(*id, db_path, json),
    }
}

fn create(
    title: &str,
    type_tag: &str,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let actor = resolve_actor(actor);

    let item = storage.create_item(title, type_tag, &actor)?;

    if json {
        println!("{}", serde_json::to_string(&item)?);
    } else {
        println!("Created item {}: {} [{}]", item.id, item.title, item.type_tag);
    }

    Ok(())
}

fn list(type_tag: Option<&str>, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;
    let items = summarize(&storage, storage.list_items(type_tag)?)?;

    if json {
        let output = ItemListOutput {
            count: items.len(),
            items,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if items.is_empty() {
        println!("No items found.");
    } else {
        println!("Items ({} found):", items.len());
        println!();
        for summary in &items {
            println!(
                "  {} {} {}",
                format!("#{}", summary.item.id).bold(),
                summary.item.title,
                format!("[{}, {} fields]", summary.item.type_tag, summary.field_count).dimmed()
            );
        }
    }

    Ok(())
}

fn field_lines(fields: &FieldSet, truncate: usize) -> Vec<String> {
    fields
        .iter()
        .map(|(key, value)| {
            let rendered = render_value(Some(value), truncate);
            format!("  {}: {}", key.bold(), rendered.replace('\n', "\n    "))
        })
        .collect()
}

fn summarize(storage: &SqliteStorage, items: Vec<ContentItemRef>) -> Result<Vec<ItemSummary>> {
    items
        .into_iter()
        .map(|item| {
            let field_count = storage.count_fields(item.id)?;
            Ok(ItemSummary { item, field_count })
        })
        .collect()
}

fn show(id: i64, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;
    let item = storage
        .get_item(id)?
        .ok_or(TransferError::ItemNotFound { id })?;
    let fields = storage.get_fields(id)?;
    let history = storage.item_events(id, Some(HISTORY_LIMIT))?;

    if json {
        let output = ItemShowOutput {
            fingerprint: fingerprint(&fields),
            item,
            fields,
            history,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("{} {}", format!("#{}", item.id).bold(), item.title.bold());
    println!("  Type:        {}", item.type_tag);
    println!("  Fingerprint: {}", fingerprint(&fields).dimmed());
    println!();

    if fields.is_empty() {
        println!("No fields.");
    } else {
        let (limits, _) = load_policy()?;
        println!("{}", format!("Fields ({})", fields.len()).cyan().bold());
        for line in field_lines(&fields, limits.preview_truncate) {
            println!("{line}");
        }
    }

    if !history.is_empty() {
        println!();
        println!("{}", "Recent history".cyan().bold());
        for event in &history {
            let when = chrono::DateTime::from_timestamp_millis(event.created_at)
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default();
            println!(
                "  {} {} {} {}",
                when.dimmed(),
                event.event_type.as_str(),
                event.comment.as_deref().unwrap_or(""),
                format!("by {}", event.actor).dimmed()
            );
        }
    }

    Ok(())
}
