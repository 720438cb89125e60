//! Collaborator traits for the transfer core.
//!
//! The core never talks to a concrete host. It reads and writes fields
//! through [`FieldStore`], looks items up through [`ItemDirectory`], and
//! persists snapshots through [`BackupStorage`]. `SqliteStorage` and
//! `DirBackupStorage` are the implementations used by the CLI.

use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::Result;
use crate::model::{ContentItemRef, FieldSet};

/// Key-value field access for content items.
pub trait FieldStore {
    /// Current fields of an item. An unknown item has no fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn get_fields(&self, item_id: i64) -> Result<FieldSet>;

    /// Write a single field.
    ///
    /// `Ok(false)` means the store rejected the write.
    ///
    /// # Errors
    ///
    /// Returns an error if the store failed while writing.
    fn update_field(&mut self, key: &str, value: &Value, item_id: i64) -> Result<bool>;
}

/// Lookup of content items.
pub trait ItemDirectory {
    /// Fetch one item.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn get_item(&self, item_id: i64) -> Result<Option<ContentItemRef>>;

    /// List items, optionally restricted to one type tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn list_items(&self, type_tag: Option<&str>) -> Result<Vec<ContentItemRef>>;
}

/// Append-only storage for backup artifacts.
pub trait BackupStorage {
    /// Location shown in messages.
    fn location(&self) -> &Path;

    /// Ensure the storage area exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the area cannot be created.
    fn prepare(&self) -> io::Result<()>;

    /// Durably write a new artifact. Must never overwrite an existing one.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact exists or cannot be written.
    fn write_artifact(&self, name: &str, content: &[u8]) -> io::Result<PathBuf>;

    /// Paths of all artifacts.
    ///
    /// # Errors
    ///
    /// Returns an error if the area cannot be listed.
    fn list_artifacts(&self) -> io::Result<Vec<PathBuf>>;

    /// Read an artifact.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact cannot be read.
    fn read_artifact(&self, path: &Path) -> io::Result<Vec<u8>>;
}
