//! In-memory collaborators for unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::{ContentItemRef, FieldSet};
use crate::transfer::adapter::{BackupStorage, FieldStore, ItemDirectory};

/// Field store and item directory backed by hash maps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Vec<ContentItemRef>,
    fields: HashMap<i64, FieldSet>,
    rejected: HashSet<String>,
    erroring: HashSet<String>,
    writes: Vec<String>,
}

impl MemoryStore {
    pub fn with_item(id: i64, title: &str) -> Self {
        let mut store = Self::default();
        store.items.push(ContentItemRef::new(id, title, "page"));
        store
    }

    pub fn with_fields(mut self, id: i64, fields: Value) -> Self {
        self.fields
            .insert(id, fields.as_object().cloned().unwrap_or_default());
        self
    }

    pub fn rejecting(mut self, key: &str) -> Self {
        self.rejected.insert(key.to_string());
        self
    }

    pub fn erroring(mut self, key: &str) -> Self {
        self.erroring.insert(key.to_string());
        self
    }

    pub fn fields_of(&self, id: i64) -> FieldSet {
        self.fields.get(&id).cloned().unwrap_or_default()
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.clone()
    }
}

impl FieldStore for MemoryStore {
    fn get_fields(&self, item_id: i64) -> Result<FieldSet> {
        Ok(self.fields_of(item_id))
    }

    fn update_field(&mut self, key: &str, value: &Value, item_id: i64) -> Result<bool> {
        if self.erroring.contains(key) {
            return Err(Error::Io(io::Error::other("boom")));
        }
        if self.rejected.contains(key) {
            return Ok(false);
        }
        self.writes.push(key.to_string());
        self.fields
            .entry(item_id)
            .or_default()
            .insert(key.to_string(), value.clone());
        Ok(true)
    }
}

impl ItemDirectory for MemoryStore {
    fn get_item(&self, item_id: i64) -> Result<Option<ContentItemRef>> {
        Ok(self.items.iter().find(|i| i.id == item_id).cloned())
    }

    fn list_items(&self, type_tag: Option<&str>) -> Result<Vec<ContentItemRef>> {
        Ok(self
            .items
            .iter()
            .filter(|i| type_tag.is_none_or(|t| t == i.type_tag))
            .cloned()
            .collect())
    }
}

/// Backup storage that keeps artifacts in memory.
#[derive(Debug, Default)]
pub struct MemoryBackups {
    artifacts: RefCell<Vec<(PathBuf, Vec<u8>)>>,
    fail_prepare: bool,
    fail_write: bool,
}

impl MemoryBackups {
    pub fn failing_prepare() -> Self {
        Self {
            fail_prepare: true,
            ..Self::default()
        }
    }

    pub fn failing_write() -> Self {
        Self {
            fail_write: true,
            ..Self::default()
        }
    }

    pub fn count(&self) -> usize {
        self.artifacts.borrow().len()
    }
}

impl BackupStorage for MemoryBackups {
    fn location(&self) -> &Path {
        Path::new("/memory")
    }

    fn prepare(&self) -> io::Result<()> {
        if self.fail_prepare {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        }
        Ok(())
    }

    fn write_artifact(&self, name: &str, content: &[u8]) -> io::Result<PathBuf> {
        if self.fail_write {
            return Err(io::Error::other("disk full"));
        }
        let path = self.location().join(name);
        self.artifacts
            .borrow_mut()
            .push((path.clone(), content.to_vec()));
        Ok(path)
    }

    fn list_artifacts(&self) -> io::Result<Vec<PathBuf>> {
        Ok(self.artifacts.borrow().iter().map(|(p, _)| p.clone()).collect())
    }

    fn read_artifact(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.artifacts
            .borrow()
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, c)| c.clone())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "missing artifact"))
    }
}
