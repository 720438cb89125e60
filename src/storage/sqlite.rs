//! SQLite storage implementation.
//!
//! This module provides the host store for items and their custom fields.
//! It follows the MutationContext pattern for transaction discipline and
//! audit logging, and implements the transfer collaborator traits.

use crate::error::Result;
use crate::model::{ContentItemRef, FieldSet};
use crate::storage::events::{get_events, insert_event, Event, EventType};
use crate::storage::schema::{apply_schema, MAX_FIELD_KEY_BYTES};
use crate::transfer::{FieldStore, ItemDirectory};
use rusqlite::{Connection, OptionalExtension, Transaction};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Actor recorded for writes made through the trait interfaces
/// when none was set.
const DEFAULT_ACTOR: &str = "system";

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
    actor: String,
}

/// Context for a mutation operation, tracking side effects.
///
/// This struct is passed to mutation closures to record audit events,
/// which are written just before the transaction commits.
pub struct MutationContext {
    /// Name of the operation being performed.
    pub op_name: String,
    /// Actor performing the operation.
    pub actor: String,
    /// Events to write at the end of the transaction.
    pub events: Vec<Event>,
}

impl MutationContext {
    /// Create a new mutation context.
    #[must_use]
    pub fn new(op_name: &str, actor: &str) -> Self {
        Self {
            op_name: op_name.to_string(),
            actor: actor.to_string(),
            events: Vec::new(),
        }
    }

    /// Record an event for this operation.
    pub fn record_event(&mut self, entity_type: &str, entity_id: &str, event_type: EventType) {
        self.events
            .push(Event::new(entity_type, entity_id, event_type, &self.actor));
    }

    /// Record a field change with old/new values. The field key goes in
    /// the event comment.
    pub fn record_field_change(
        &mut self,
        item_id: i64,
        key: &str,
        event_type: EventType,
        old_value: Option<String>,
        new_value: Option<String>,
    ) {
        self.events.push(
            Event::new("item", &item_id.to_string(), event_type, &self.actor)
                .with_values(old_value, new_value)
                .with_comment(key),
        );
    }
}

impl SqliteStorage {
    /// Open a database at the given path.
    ///
    /// Creates the database and applies schema if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a database with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_timeout(path: &Path, timeout_ms: Option<u64>) -> Result<Self> {
        let conn = Connection::open(path)?;

        if let Some(timeout) = timeout_ms {
            conn.busy_timeout(Duration::from_millis(timeout))?;
        } else {
            // Default 5 second timeout
            conn.busy_timeout(Duration::from_secs(5))?;
        }

        apply_schema(&conn)?;
        Ok(Self {
            conn,
            actor: DEFAULT_ACTOR.to_string(),
        })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self {
            conn,
            actor: DEFAULT_ACTOR.to_string(),
        })
    }

    /// Set the actor recorded for writes made through [`FieldStore`].
    #[must_use]
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    /// Actor used for trait-driven writes.
    #[must_use]
    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// Execute a mutation with the transaction protocol.
    ///
    /// This method:
    /// 1. Begins an IMMEDIATE transaction (for write locking)
    /// 2. Executes the mutation closure
    /// 3. Writes audit events
    /// 4. Commits (or rolls back on error)
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails. The transaction is rolled back on error.
    pub fn mutate<F, R>(&mut self, op: &str, actor: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction, &mut MutationContext) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let mut ctx = MutationContext::new(op, actor);

        let result = f(&tx, &mut ctx)?;

        for event in &ctx.events {
            insert_event(&tx, event)?;
        }

        tx.commit()?;
        debug!(op = %ctx.op_name, actor = %ctx.actor, events = ctx.events.len(), "Mutation committed");

        Ok(result)
    }

    // ==================
    // Item Operations
    // ==================

    /// Create a new item.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn create_item(&mut self, title: &str, type_tag: &str, actor: &str) -> Result<ContentItemRef> {
        let now = chrono::Utc::now().timestamp_millis();

        self.mutate("create_item", actor, |tx, ctx| {
            tx.execute(
                "INSERT INTO items (title, type_tag, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
                rusqlite::params![title, type_tag, now],
            )?;
            let id = tx.last_insert_rowid();

            ctx.record_event("item", &id.to_string(), EventType::ItemCreated);

            Ok(ContentItemRef::new(id, title, type_tag))
        })
    }

    /// Get an item by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_item(&self, id: i64) -> Result<Option<ContentItemRef>> {
        let item = self
            .conn
            .query_row(
                "SELECT id, title, type_tag FROM items WHERE id = ?1",
                [id],
                map_item,
            )
            .optional()?;

        Ok(item)
    }

    /// List items, optionally filtered by type tag, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_items(&self, type_tag: Option<&str>) -> Result<Vec<ContentItemRef>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, type_tag FROM items
             WHERE (?1 IS NULL OR type_tag = ?1)
             ORDER BY id ASC",
        )?;

        let rows = stmt.query_map([type_tag], map_item)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    // ==================
    // Field Operations
    // ==================

    /// Get all fields of an item, in insertion order.
    ///
    /// An unknown item has no fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored value is not valid JSON.
    pub fn get_fields(&self, item_id: i64) -> Result<FieldSet> {
        let mut stmt = self.conn.prepare(
            "SELECT field_key, field_value FROM item_fields
             WHERE item_id = ?1
             ORDER BY rowid ASC",
        )?;

        let rows = stmt.query_map([item_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut fields = FieldSet::new();
        for row in rows {
            let (key, raw) = row?;
            fields.insert(key, serde_json::from_str(&raw)?);
        }
        Ok(fields)
    }

    /// Get a single field value.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored value is not valid JSON.
    pub fn get_field(&self, item_id: i64, key: &str) -> Result<Option<Value>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT field_value FROM item_fields WHERE item_id = ?1 AND field_key = ?2",
                rusqlite::params![item_id, key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(raw.map(|r| serde_json::from_str(&r)).transpose()?)
    }

    /// Count the fields of an item.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_fields(&self, item_id: i64) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM item_fields WHERE item_id = ?1",
            [item_id],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Insert or replace a field value.
    ///
    /// Returns `Ok(false)` without writing when the item does not exist or
    /// the key is empty or longer than [`MAX_FIELD_KEY_BYTES`].
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails.
    pub fn set_field(&mut self, item_id: i64, key: &str, value: &Value, actor: &str) -> Result<bool> {
        if key.is_empty() || key.len() > MAX_FIELD_KEY_BYTES {
            debug!(item_id, key_bytes = key.len(), "Rejecting field key");
            return Ok(false);
        }

        let now = chrono::Utc::now().timestamp_millis();
        let new_raw = serde_json::to_string(value)?;

        self.mutate("set_field", actor, |tx, ctx| {
            if !item_exists(tx, item_id)? {
                debug!(item_id, key, "Rejecting field write for missing item");
                return Ok(false);
            }

            let old_raw: Option<String> = tx
                .query_row(
                    "SELECT field_value FROM item_fields WHERE item_id = ?1 AND field_key = ?2",
                    rusqlite::params![item_id, key],
                    |row| row.get(0),
                )
                .optional()?;

            tx.execute(
                "INSERT INTO item_fields (item_id, field_key, field_value, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(item_id, field_key) DO UPDATE SET
                    field_value = excluded.field_value,
                    updated_at = excluded.updated_at",
                rusqlite::params![item_id, key, new_raw, now],
            )?;

            ctx.record_field_change(item_id, key, EventType::FieldUpdated, old_raw, Some(new_raw));

            Ok(true)
        })
    }

    /// Delete a field.
    ///
    /// Returns whether a field was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails.
    pub fn delete_field(&mut self, item_id: i64, key: &str, actor: &str) -> Result<bool> {
        self.mutate("delete_field", actor, |tx, ctx| {
            let old_raw: Option<String> = tx
                .query_row(
                    "SELECT field_value FROM item_fields WHERE item_id = ?1 AND field_key = ?2",
                    rusqlite::params![item_id, key],
                    |row| row.get(0),
                )
                .optional()?;

            let Some(old_raw) = old_raw else {
                return Ok(false);
            };

            tx.execute(
                "DELETE FROM item_fields WHERE item_id = ?1 AND field_key = ?2",
                rusqlite::params![item_id, key],
            )?;

            ctx.record_field_change(item_id, key, EventType::FieldDeleted, Some(old_raw), None);

            Ok(true)
        })
    }

    /// Recent audit events for an item, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn item_events(&self, item_id: i64, limit: Option<u32>) -> Result<Vec<Event>> {
        get_events(&self.conn, "item", &item_id.to_string(), limit).map_err(Into::into)
    }
}

impl FieldStore for SqliteStorage {
    fn get_fields(&self, item_id: i64) -> Result<FieldSet> {
        SqliteStorage::get_fields(self, item_id)
    }

    fn update_field(&mut self, key: &str, value: &Value, item_id: i64) -> Result<bool> {
        let actor = self.actor.clone();
        self.set_field(item_id, key, value, &actor)
    }
}

impl ItemDirectory for SqliteStorage {
    fn get_item(&self, item_id: i64) -> Result<Option<ContentItemRef>> {
        SqliteStorage::get_item(self, item_id)
    }

    fn list_items(&self, type_tag: Option<&str>) -> Result<Vec<ContentItemRef>> {
        SqliteStorage::list_items(self, type_tag)
    }
}

fn map_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<ContentItemRef> {
    Ok(ContentItemRef {
        id: row.get(0)?,
        title: row.get(1)?,
        type_tag: row.get(2)?,
    })
}

fn item_exists(tx: &Transaction, item_id: i64) -> Result<bool> {
    Ok(tx
        .prepare("SELECT 1 FROM items WHERE id = ?1")?
        .exists([item_id])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_open_memory() {
        let storage = SqliteStorage::open_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_mutation_context_tags_events_with_actor() {
        let mut ctx = MutationContext::new("set_field", "tester");
        ctx.record_field_change(7, "hero", EventType::FieldUpdated, None, Some("\"x\"".into()));

        assert_eq!(ctx.op_name, "set_field");
        assert_eq!(ctx.events.len(), 1);
        assert_eq!(ctx.events[0].actor, "tester");
        assert_eq!(ctx.events[0].entity_id, "7");
    }

    #[test]
    fn test_item_crud() {
        let mut storage = SqliteStorage::open_memory().unwrap();

        let home = storage.create_item("Home", "page", "actor").unwrap();
        storage.create_item("Launch", "post", "actor").unwrap();

        let fetched = storage.get_item(home.id).unwrap().unwrap();
        assert_eq!(fetched, home);
        assert!(storage.get_item(999).unwrap().is_none());

        assert_eq!(storage.list_items(None).unwrap().len(), 2);
        let posts = storage.list_items(Some("post")).unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "Launch");
    }

    #[test]
    fn test_field_upsert_keeps_order() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let item = storage.create_item("Home", "page", "actor").unwrap();

        assert!(storage.set_field(item.id, "zeta", &json!(1), "actor").unwrap());
        assert!(storage.set_field(item.id, "alpha", &json!("a"), "actor").unwrap());
        assert!(storage.set_field(item.id, "zeta", &json!([1, 2]), "actor").unwrap());

        let fields = storage.get_fields(item.id).unwrap();
        let keys: Vec<&String> = fields.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
        assert_eq!(fields["zeta"], json!([1, 2]));
        assert_eq!(storage.count_fields(item.id).unwrap(), 2);
    }

    #[test]
    fn test_field_values_keep_their_type() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let item = storage.create_item("Home", "page", "actor").unwrap();

        storage.set_field(item.id, "s", &json!("1"), "actor").unwrap();
        storage.set_field(item.id, "n", &json!(1), "actor").unwrap();
        storage.set_field(item.id, "f", &json!(1.0), "actor").unwrap();
        storage.set_field(item.id, "z", &Value::Null, "actor").unwrap();

        assert_eq!(storage.get_field(item.id, "s").unwrap(), Some(json!("1")));
        assert_eq!(storage.get_field(item.id, "n").unwrap(), Some(json!(1)));
        assert_eq!(storage.get_field(item.id, "f").unwrap(), Some(json!(1.0)));
        assert_eq!(storage.get_field(item.id, "z").unwrap(), Some(Value::Null));
        assert_eq!(storage.get_field(item.id, "missing").unwrap(), None);
    }

    #[test]
    fn test_set_field_rejections() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let item = storage.create_item("Home", "page", "actor").unwrap();

        assert!(!storage.set_field(999, "title", &json!("x"), "actor").unwrap());
        assert!(!storage.set_field(item.id, "", &json!("x"), "actor").unwrap());
        let long_key = "k".repeat(MAX_FIELD_KEY_BYTES + 1);
        assert!(!storage.set_field(item.id, &long_key, &json!("x"), "actor").unwrap());
        let max_key = "k".repeat(MAX_FIELD_KEY_BYTES);
        assert!(storage.set_field(item.id, &max_key, &json!("x"), "actor").unwrap());
    }

    #[test]
    fn test_delete_field() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let item = storage.create_item("Home", "page", "actor").unwrap();
        storage.set_field(item.id, "title", &json!("x"), "actor").unwrap();

        assert!(storage.delete_field(item.id, "title", "actor").unwrap());
        assert!(!storage.delete_field(item.id, "title", "actor").unwrap());
        assert!(storage.get_fields(item.id).unwrap().is_empty());
    }

    #[test]
    fn test_mutations_write_audit_events() {
        let mut storage = SqliteStorage::open_memory().unwrap().with_actor("alice");
        let item = storage.create_item("Home", "page", "bob").unwrap();

        FieldStore::update_field(&mut storage, "title", &json!("Hi"), item.id).unwrap();
        FieldStore::update_field(&mut storage, "title", &json!("Bye"), item.id).unwrap();

        let events = storage.item_events(item.id, None).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].event_type, EventType::FieldUpdated);
        assert_eq!(events[0].actor, "alice");
        assert_eq!(events[0].old_value.as_deref(), Some("\"Hi\""));
        assert_eq!(events[0].new_value.as_deref(), Some("\"Bye\""));
        assert_eq!(events[2].event_type, EventType::ItemCreated);
        assert_eq!(events[2].actor, "bob");
    }

    #[test]
    fn test_rejected_write_records_nothing() {
        let mut storage = SqliteStorage::open_memory().unwrap();

        assert!(!storage.set_field(5, "title", &json!("x"), "actor").unwrap());
        assert!(storage.item_events(5, None).unwrap().is_empty());
    }

    #[test]
    fn test_open_file_database() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("fields.db");

        {
            let mut storage = SqliteStorage::open(&path).unwrap();
            let item = storage.create_item("Home", "page", "actor").unwrap();
            storage.set_field(item.id, "title", &json!("x"), "actor").unwrap();
        }

        let storage = SqliteStorage::open(&path).unwrap();
        assert_eq!(storage.get_fields(1).unwrap()["title"], "x");
    }
}
