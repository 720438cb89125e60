//! Command implementations.

pub mod backup;
pub mod completions;
pub mod export;
pub mod field;
pub mod import;
pub mod init;
pub mod item;
pub mod preview;
pub mod version;

use crate::cli::PayloadArgs;
use crate::config::{default_actor, resolve_backup_dir, resolve_db_path, Settings};
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;
use crate::transfer::{read_upload, AccessPolicy, DirBackupStorage, Limits, UploadedFile};
use std::io::Read;
use std::path::PathBuf;
use tracing::debug;

/// Open the field database, failing if it has not been initialized.
pub(crate) fn open_storage(db_path: Option<&PathBuf>) -> Result<SqliteStorage> {
    let db_path = resolve_db_path(db_path.map(|p| p.as_path())).ok_or(Error::NotInitialized)?;

    if !db_path.exists() {
        return Err(Error::NotInitialized);
    }

    SqliteStorage::open(&db_path)
}

/// Backup storage rooted at the resolved backup directory.
pub(crate) fn backup_storage(backup_dir: Option<&PathBuf>) -> Result<DirBackupStorage> {
    resolve_backup_dir(backup_dir.map(|p| p.as_path()))
        .map(DirBackupStorage::new)
        .ok_or_else(|| Error::Config("Could not determine backup directory".to_string()))
}

/// Actor from the flag, or the default chain.
pub(crate) fn resolve_actor(actor: Option<&str>) -> String {
    actor.map(ToString::to_string).unwrap_or_else(default_actor)
}

/// Settings-derived limits and access policy.
pub(crate) fn load_policy() -> Result<(Limits, AccessPolicy)> {
    let settings = Settings::load()?;
    Ok((settings.limits(), AccessPolicy::new(settings.admins)))
}

/// Read the payload sources named on the command line.
///
/// `--inline -` reads stdin. The file is only read when no inline text
/// was given, since inline text takes precedence.
pub(crate) fn read_payload(
    args: &PayloadArgs,
    limits: &Limits,
) -> Result<(Option<String>, Option<UploadedFile>)> {
    let inline = match args.inline.as_deref() {
        Some("-") => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Some(text)
        }
        other => other.map(ToString::to_string),
    };

    let has_inline = inline.as_deref().is_some_and(|t| !t.trim().is_empty());
    let upload = match &args.file {
        Some(path) if has_inline => {
            debug!(file = %path.display(), "Inline JSON given, not reading file");
            None
        }
        Some(path) => Some(read_upload(path, limits.max_upload_bytes)?),
        None => None,
    };

    Ok((inline, upload))
}
