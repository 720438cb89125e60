//! Database schema definitions.
//!
//! Items and their custom fields, plus the audit event log.

use rusqlite::{Connection, Result};

/// Current schema version for migration tracking.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Longest field key the store accepts, in bytes.
pub const MAX_FIELD_KEY_BYTES: usize = 255;

/// The complete SQL schema for the field database.
///
/// Note: Timestamps are stored as INTEGER (Unix milliseconds). Field values
/// are stored as compact JSON text.
pub const SCHEMA_SQL: &str = r"
-- ====================
-- Schema Version Tracking
-- ====================

CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at INTEGER NOT NULL
);

-- ====================
-- Core Tables
-- ====================

-- Items: content entities that own custom fields
CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    type_tag TEXT NOT NULL DEFAULT 'page',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_items_type ON items(type_tag);

-- Item Fields: one row per key, value is JSON text
CREATE TABLE IF NOT EXISTS item_fields (
    item_id INTEGER NOT NULL,
    field_key TEXT NOT NULL CHECK (length(field_key) BETWEEN 1 AND 255),
    field_value TEXT NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (item_id, field_key),
    FOREIGN KEY (item_id) REFERENCES items(id) ON DELETE CASCADE
);

-- ====================
-- Audit Events
-- ====================

CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_type TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    event_type TEXT NOT NULL,
    actor TEXT NOT NULL,
    old_value TEXT,
    new_value TEXT,
    comment TEXT,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id);
CREATE INDEX IF NOT EXISTS idx_events_created ON events(created_at DESC);

-- ====================
-- Triggers
-- ====================

-- Touch the owning item whenever one of its fields changes
CREATE TRIGGER IF NOT EXISTS touch_item_on_field_write
AFTER INSERT ON item_fields
BEGIN
    UPDATE items SET updated_at = NEW.updated_at WHERE id = NEW.item_id;
END;

CREATE TRIGGER IF NOT EXISTS touch_item_on_field_update
AFTER UPDATE ON item_fields
BEGIN
    UPDATE items SET updated_at = NEW.updated_at WHERE id = NEW.item_id;
END;
";

/// Apply the schema to the database.
///
/// This uses `execute_batch` to run the entire DDL script.
/// It is idempotent because all statements use `IF NOT EXISTS`.
///
/// # Errors
///
/// Returns an error if the SQL execution fails or pragmas cannot be set.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;

    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
        rusqlite::params![
            format!("v{CURRENT_SCHEMA_VERSION}"),
            chrono::Utc::now().timestamp_millis()
        ],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_schema() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).expect("Failed to apply schema");

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        for table in ["events", "item_fields", "items", "schema_migrations"] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        apply_schema(&conn).expect("First apply failed");
        apply_schema(&conn).expect("Second apply failed");

        let versions: i32 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn test_field_requires_item() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO item_fields (item_id, field_key, field_value, updated_at)
             VALUES (99, 'title', '\"x\"', 0)",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_field_write_touches_item() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        conn.execute(
            "INSERT INTO items (id, title, created_at, updated_at) VALUES (1, 'Home', 0, 0)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO item_fields (item_id, field_key, field_value, updated_at)
             VALUES (1, 'title', '\"x\"', 500)",
            [],
        )
        .unwrap();

        let updated_at: i64 = conn
            .query_row("SELECT updated_at FROM items WHERE id = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(updated_at, 500);
    }
}
