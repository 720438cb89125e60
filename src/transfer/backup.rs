//! Pre-import backups.
//!
//! Before an import mutates anything, the current field set can be
//! snapshotted to a JSON artifact:
//!
//! ```json
//! {"postId": 12, "title": "Home", "typeTag": "page", "backupDate": "2025-01-20T10:00:00Z", "fields": {...}}
//! ```
//!
//! Artifacts are named `acf-backup-<slug>-<id>-<timestamp>.json` and are
//! created with create-new semantics: an existing artifact is never
//! overwritten, and this module never deletes one.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::model::{ContentItemRef, FieldSet};
use crate::transfer::adapter::BackupStorage;
use crate::transfer::types::{TransferError, TransferResult};

/// File name prefix shared by all backup artifacts.
pub const BACKUP_PREFIX: &str = "acf-backup-";

/// A point-in-time copy of an item's fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRecord {
    pub post_id: i64,
    pub title: String,
    pub type_tag: String,
    pub backup_date: DateTime<Utc>,
    pub fields: FieldSet,
}

/// Where a backup was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupRef {
    pub path: PathBuf,
    pub field_count: usize,
}

/// Listing entry for an existing backup.
#[derive(Debug, Clone, Serialize)]
pub struct BackupSummary {
    pub path: PathBuf,
    pub post_id: i64,
    pub title: String,
    pub backup_date: DateTime<Utc>,
    pub field_count: usize,
}

/// Artifact name for an item at a given instant.
#[must_use]
pub fn backup_name(item: &ContentItemRef, at: DateTime<Utc>) -> String {
    format!(
        "{BACKUP_PREFIX}{}-{}-{}.json",
        item.slug(),
        item.id,
        at.format("%Y%m%dT%H%M%S%.6fZ")
    )
}

/// Snapshot `fields` for `item` using the current time.
///
/// Returns `None` without touching storage when `fields` is empty.
///
/// # Errors
///
/// - `BackupDirectoryUnavailable` if the storage area cannot be prepared
/// - `BackupWriteFailed` if the artifact cannot be durably written
pub fn write_backup<B: BackupStorage + ?Sized>(
    storage: &B,
    item: &ContentItemRef,
    fields: &FieldSet,
) -> TransferResult<Option<BackupRef>> {
    write_backup_at(storage, item, fields, Utc::now())
}

/// Like [`write_backup`] with an explicit timestamp.
///
/// # Errors
///
/// See [`write_backup`].
pub fn write_backup_at<B: BackupStorage + ?Sized>(
    storage: &B,
    item: &ContentItemRef,
    fields: &FieldSet,
    at: DateTime<Utc>,
) -> TransferResult<Option<BackupRef>> {
    if fields.is_empty() {
        info!(item_id = item.id, "No fields to back up, skipping");
        return Ok(None);
    }

    storage
        .prepare()
        .map_err(|e| TransferError::BackupDirectoryUnavailable {
            path: storage.location().to_path_buf(),
            reason: e.to_string(),
        })?;

    let record = BackupRecord {
        post_id: item.id,
        title: item.title.clone(),
        type_tag: item.type_tag.clone(),
        backup_date: at,
        fields: fields.clone(),
    };

    let name = backup_name(item, at);
    let mut content = serde_json::to_vec_pretty(&record)?;
    content.push(b'\n');

    let path = storage
        .write_artifact(&name, &content)
        .map_err(|e| TransferError::BackupWriteFailed {
            path: storage.location().join(&name),
            reason: e.to_string(),
        })?;

    info!(item_id = item.id, path = %path.display(), fields = fields.len(), "Backup written");

    Ok(Some(BackupRef {
        path,
        field_count: fields.len(),
    }))
}

/// Parse a backup artifact.
///
/// # Errors
///
/// Returns an error if the artifact cannot be read or is not a backup record.
pub fn read_backup<B: BackupStorage + ?Sized>(
    storage: &B,
    path: &Path,
) -> TransferResult<BackupRecord> {
    let bytes = storage.read_artifact(path)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| TransferError::InvalidJson(format!("{}: {e}", path.display())))
}

/// List backups, newest first, optionally for one item.
///
/// Artifacts that cannot be parsed are skipped with a warning.
///
/// # Errors
///
/// Returns an error if the storage area cannot be listed.
pub fn list_backups<B: BackupStorage + ?Sized>(
    storage: &B,
    item_id: Option<i64>,
) -> TransferResult<Vec<BackupSummary>> {
    let mut summaries = Vec::new();

    for path in storage.list_artifacts()? {
        let record = match read_backup(storage, &path) {
            Ok(record) => record,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable backup");
                continue;
            }
        };

        if item_id.is_some_and(|id| id != record.post_id) {
            continue;
        }

        summaries.push(BackupSummary {
            path,
            post_id: record.post_id,
            title: record.title,
            backup_date: record.backup_date,
            field_count: record.fields.len(),
        });
    }

    summaries.sort_by(|a, b| b.backup_date.cmp(&a.backup_date));
    Ok(summaries)
}

/// Backup storage in a flat directory.
#[derive(Debug, Clone)]
pub struct DirBackupStorage {
    dir: PathBuf,
}

impl DirBackupStorage {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

/// Remove a partially written artifact. Returns false if it is still on disk.
fn discard_partial(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => true,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Partial backup artifact left behind");
            false
        }
    }
}

impl BackupStorage for DirBackupStorage {
    fn location(&self) -> &Path {
        &self.dir
    }

    fn prepare(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        if fs::metadata(&self.dir)?.permissions().readonly() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "backup directory is read-only",
            ));
        }
        Ok(())
    }

    fn write_artifact(&self, name: &str, content: &[u8]) -> io::Result<PathBuf> {
        let path = self.dir.join(name);

        let mut file = OpenOptions::new().write(true).create_new(true).open(&path)?;

        let written = file
            .write_all(content)
            .and_then(|()| file.flush())
            .and_then(|()| file.sync_all());

        if let Err(e) = written {
            drop(file);
            discard_partial(&path);
            return Err(e);
        }

        Ok(path)
    }

    fn list_artifacts(&self) -> io::Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with(BACKUP_PREFIX) && n.ends_with(".json"))
            })
            .collect();

        paths.sort();
        Ok(paths)
    }

    fn read_artifact(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::TempDir;

    fn item() -> ContentItemRef {
        ContentItemRef::new(12, "Home Page", "page")
    }

    #[test]
    fn test_discard_partial() {
        let temp = TempDir::new().unwrap();
        let partial = temp.path().join("partial.json");
        fs::write(&partial, b"{").unwrap();

        assert!(discard_partial(&partial));
        assert!(!partial.exists());
        assert!(discard_partial(&partial));

        // A directory cannot be removed as a file, so it is reported as left behind
        let stuck = temp.path().join("stuck");
        fs::create_dir(&stuck).unwrap();
        assert!(!discard_partial(&stuck));
        assert!(stuck.exists());
    }

    fn fields() -> FieldSet {
        json!({"hero_title": "Welcome", "cards": [1, 2]})
            .as_object()
            .cloned()
            .unwrap()
    }

    fn at(second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 20, 10, 0, second).unwrap()
    }

    #[test]
    fn test_backup_name() {
        assert_eq!(
            backup_name(&item(), at(5)),
            "acf-backup-home-page-12-20250120T100005.000000Z.json"
        );
    }

    #[test]
    fn test_empty_fields_write_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let storage = DirBackupStorage::new(temp_dir.path().join("backups"));

        let result = write_backup(&storage, &item(), &FieldSet::new()).unwrap();

        assert!(result.is_none());
        assert!(!temp_dir.path().join("backups").exists());
    }

    #[test]
    fn test_backup_wire_format() {
        let temp_dir = TempDir::new().unwrap();
        let storage = DirBackupStorage::new(temp_dir.path().to_path_buf());

        let backup = write_backup_at(&storage, &item(), &fields(), at(0))
            .unwrap()
            .unwrap();
        assert_eq!(backup.field_count, 2);

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&backup.path).unwrap()).unwrap();
        assert_eq!(raw["postId"], 12);
        assert_eq!(raw["title"], "Home Page");
        assert_eq!(raw["typeTag"], "page");
        assert_eq!(raw["backupDate"], "2025-01-20T10:00:00Z");
        assert_eq!(raw["fields"]["hero_title"], "Welcome");
    }

    #[test]
    fn test_existing_artifact_is_never_overwritten() {
        let temp_dir = TempDir::new().unwrap();
        let storage = DirBackupStorage::new(temp_dir.path().to_path_buf());

        let first = write_backup_at(&storage, &item(), &fields(), at(0)).unwrap().unwrap();
        let original = fs::read_to_string(&first.path).unwrap();

        let mut other = fields();
        other.insert("extra".into(), json!(true));
        let result = write_backup_at(&storage, &item(), &other, at(0));

        assert!(matches!(result, Err(TransferError::BackupWriteFailed { .. })));
        assert_eq!(fs::read_to_string(&first.path).unwrap(), original);
    }

    #[test]
    fn test_directory_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not-a-dir");
        fs::write(&blocker, "file").unwrap();
        let storage = DirBackupStorage::new(blocker.join("backups"));

        let result = write_backup(&storage, &item(), &fields());
        assert!(matches!(
            result,
            Err(TransferError::BackupDirectoryUnavailable { .. })
        ));
    }

    #[test]
    fn test_distinct_items_never_collide() {
        let temp_dir = TempDir::new().unwrap();
        let storage = DirBackupStorage::new(temp_dir.path().to_path_buf());
        let twin = ContentItemRef::new(13, "Home Page", "page");

        write_backup_at(&storage, &item(), &fields(), at(0)).unwrap();
        write_backup_at(&storage, &twin, &fields(), at(0)).unwrap();

        assert_eq!(storage.list_artifacts().unwrap().len(), 2);
    }

    #[test]
    fn test_list_and_read_backups() {
        let temp_dir = TempDir::new().unwrap();
        let storage = DirBackupStorage::new(temp_dir.path().to_path_buf());
        let other = ContentItemRef::new(99, "About", "page");

        write_backup_at(&storage, &item(), &fields(), at(0)).unwrap();
        write_backup_at(&storage, &item(), &fields(), at(30)).unwrap();
        write_backup_at(&storage, &other, &fields(), at(10)).unwrap();
        fs::write(temp_dir.path().join("acf-backup-broken.json"), "{nope").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

        let all = list_backups(&storage, None).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].backup_date, at(30));

        let mine = list_backups(&storage, Some(12)).unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|b| b.post_id == 12));

        let record = read_backup(&storage, &mine[0].path).unwrap();
        assert_eq!(record.fields, fields());
        assert_eq!(record.backup_date, at(30));
    }

    #[test]
    fn test_list_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let storage = DirBackupStorage::new(temp_dir.path().join("missing"));
        assert!(list_backups(&storage, None).unwrap().is_empty());
    }
}
