//! Field command implementations (single-key reads and writes).

use crate::cli::FieldCommands;
use crate::cli::commands::{open_storage, resolve_actor};
use crate::error::{Error, Result};
use crate::model::FieldSet;
use crate::storage::{SqliteStorage, MAX_FIELD_KEY_BYTES};
use crate::transfer::TransferError;
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Serialize)]
struct FieldOutput<'a> {
    item_id: i64,
    key: &'a str,
    value: &'a Value,
}

#[derive(Serialize)]
struct FieldsOutput<'a> {
    item_id: i64,
    fields: &'a FieldSet,
    count: usize,
}

#[derive(Serialize)]
struct FieldDeleteOutput<'a> {
    item_id: i64,
    key: &'a str,
    deleted: bool,
}

/// Execute field commands.
///
/// # Errors
///
/// Returns an error if the database is unavailable, the item is missing,
/// or a value is not valid JSON.
pub fn execute(
    command: &FieldCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    match command {
        FieldCommands::Set { item, key, value } => set(*item, key, value, db_path, actor, json),
        FieldCommands::Get { item, key } => get(*item, key.as_deref(), db_path, json),
        FieldCommands::Delete { item, key } => delete(*item, key, db_path, actor, json),
    }
}

/// Parse a command-line field value as JSON.
fn parse_value(key: &str, raw: &str) -> Result<Value> {
    serde_json::from_str(raw)
        .map_err(|e| Error::InvalidArgument(format!("Invalid JSON value for '{key}': {e}")))
}

fn require_item(storage: &SqliteStorage, item_id: i64) -> Result<()> {
    storage
        .get_item(item_id)?
        .map(|_| ())
        .ok_or_else(|| TransferError::ItemNotFound { id: item_id }.into())
}

fn set(
    item_id: i64,
    key: &str,
    raw: &str,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let value = parse_value(key, raw)?;
    let mut storage = open_storage(db_path)?;
    require_item(&storage, item_id)?;
    let actor = resolve_actor(actor);

    if !storage.set_field(item_id, key, &value, &actor)? {
        return Err(Error::InvalidArgument(format!(
            "Field key must be 1 to {MAX_FIELD_KEY_BYTES} bytes"
        )));
    }

    if json {
        let output = FieldOutput {
            item_id,
            key,
            value: &value,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("Set {} on item {item_id}", key.bold());
    }

    Ok(())
}

fn get(item_id: i64, key: Option<&str>, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;
    require_item(&storage, item_id)?;

    if let Some(key) = key {
        let value = storage
            .get_field(item_id, key)?
            .ok_or_else(|| Error::InvalidArgument(format!("Field not found: {key}")))?;

        if json {
            let output = FieldOutput {
                item_id,
                key,
                value: &value,
            };
            println!("{}", serde_json::to_string(&output)?);
        } else {
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        return Ok(());
    }

    let fields = storage.get_fields(item_id)?;
    if json {
        let output = FieldsOutput {
            item_id,
            fields: &fields,
            count: fields.len(),
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if fields.is_empty() {
        println!("No fields on item {item_id}.");
    } else {
        for (key, value) in &fields {
            println!("{}: {}", key.bold(), serde_json::to_string(value)?);
        }
    }

    Ok(())
}

fn delete(
    item_id: i64,
    key: &str,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    require_item(&storage, item_id)?;
    let actor = resolve_actor(actor);

    let deleted = storage.delete_field(item_id, key, &actor)?;

    if json {
        let output = FieldDeleteOutput {
            item_id,
            key,
            deleted,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if deleted {
        println!("Deleted {} from item {item_id}", key.bold());
    } else {
        println!("No field {key} on item {item_id}");
    }

    Ok(())
}
