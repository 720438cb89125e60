//! Configuration management.
//!
//! This module resolves where the field database and backup artifacts
//! live, who the acting user is, and loads optional settings.
//!
//! # Layout
//!
//! Everything defaults to a single global directory:
//! - **Database**: `~/.acfporter/data/fields.db`
//! - **Backups**: `~/.acfporter/backups/`
//! - **Settings**: `~/.acfporter/config.json`
//!
//! Each location can be overridden by a CLI flag or environment variable.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::transfer::{Limits, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_PREVIEW_TRUNCATE};

/// Optional settings read from `config.json`.
///
/// Unknown keys are ignored; missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Upper bound for uploaded payload files, in bytes.
    pub max_upload_bytes: u64,
    /// Characters of a scalar value shown in preview output.
    pub preview_truncate: usize,
    /// Actors allowed to export and import. Empty allows everyone.
    pub admins: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            preview_truncate: DEFAULT_PREVIEW_TRUNCATE,
            admins: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from `path`. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {e}", path.display())))
    }

    /// Load settings from the resolved config path.
    ///
    /// # Errors
    ///
    /// See [`Settings::load_from`].
    pub fn load() -> Result<Self> {
        match resolve_config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Size and display limits for the transfer service.
    #[must_use]
    pub fn limits(&self) -> Limits {
        Limits {
            max_upload_bytes: self.max_upload_bytes,
            preview_truncate: self.preview_truncate,
        }
    }
}

/// Get the global acf-porter directory (`~/.acfporter`).
#[must_use]
pub fn global_data_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".acfporter"))
}

/// Check if test mode is enabled.
///
/// Test mode is enabled by setting `ACFP_TEST_DB=1` (or any value other
/// than empty, `0` or `false`). It redirects the database to an isolated
/// file.
#[must_use]
pub fn is_test_mode() -> bool {
    std::env::var("ACFP_TEST_DB").is_ok_and(|v| is_truthy(&v))
}

fn is_truthy(value: &str) -> bool {
    !value.is_empty() && value != "0" && !value.eq_ignore_ascii_case("false")
}

/// Get the test database path (`~/.acfporter/test/fields.db`).
#[must_use]
pub fn test_db_path() -> Option<PathBuf> {
    global_data_dir().map(|dir| dir.join("test").join("fields.db"))
}

/// Resolve the database path.
///
/// Priority:
/// 1. `explicit_path` from the `--db` flag
/// 2. `ACFP_TEST_DB` → test database
/// 3. `ACFP_DB` environment variable
/// 4. `~/.acfporter/data/fields.db`
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if is_test_mode() {
        return test_db_path();
    }

    if let Some(path) = non_empty_env("ACFP_DB") {
        return Some(PathBuf::from(path));
    }

    global_data_dir().map(|dir| dir.join("data").join("fields.db"))
}

/// Resolve the backup directory.
///
/// Priority: `explicit_path` → `ACFP_BACKUP_DIR` → `~/.acfporter/backups`.
#[must_use]
pub fn resolve_backup_dir(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if let Some(path) = non_empty_env("ACFP_BACKUP_DIR") {
        return Some(PathBuf::from(path));
    }

    global_data_dir().map(|dir| dir.join("backups"))
}

/// Resolve the settings file: `ACFP_CONFIG` or `~/.acfporter/config.json`.
#[must_use]
pub fn resolve_config_path() -> Option<PathBuf> {
    non_empty_env("ACFP_CONFIG")
        .map(PathBuf::from)
        .or_else(|| global_data_dir().map(|dir| dir.join("config.json")))
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Get the default actor name.
///
/// Priority:
/// 1. `ACFP_ACTOR` environment variable
/// 2. Git user name
/// 3. System username
/// 4. "unknown"
#[must_use]
pub fn default_actor() -> String {
    if let Some(actor) = non_empty_env("ACFP_ACTOR") {
        return actor;
    }

    if let Ok(output) = std::process::Command::new("git")
        .args(["config", "user.name"])
        .output()
    {
        if output.status.success() {
            let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !name.is_empty() {
                return name;
            }
        }
    }

    if let Ok(user) = std::env::var("USER") {
        return user;
    }

    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_actor() {
        assert!(!default_actor().is_empty());
    }

    #[test]
    fn test_resolve_db_path_with_explicit() {
        let explicit = PathBuf::from("/custom/path/fields.db");
        assert_eq!(resolve_db_path(Some(&explicit)), Some(explicit));
    }

    #[test]
    fn test_resolve_backup_dir_with_explicit() {
        let explicit = PathBuf::from("/custom/backups");
        assert_eq!(resolve_backup_dir(Some(&explicit)), Some(explicit));
    }

    #[test]
    fn test_test_db_path_is_separate() {
        let global = global_data_dir().unwrap();
        let test = test_db_path().unwrap();

        assert!(test.to_string_lossy().contains("/test/"));
        assert!(test.ends_with("fields.db"));
        assert_ne!(global.join("data").join("fields.db"), test);
    }

    #[test]
    fn test_is_truthy() {
        for falsy in ["", "0", "false", "FALSE"] {
            assert!(!is_truthy(falsy), "{falsy:?}");
        }
        for truthy in ["1", "true", "yes"] {
            assert!(is_truthy(truthy), "{truthy:?}");
        }
    }

    #[test]
    fn test_missing_settings_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::load_from(&temp.path().join("config.json")).unwrap();

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.limits().max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    fn test_partial_settings_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{"admins": ["alice"], "preview_truncate": 20, "theme": "dark"}"#)
            .unwrap();

        let settings = Settings::load_from(&path).unwrap();

        assert_eq!(settings.admins, vec!["alice".to_string()]);
        assert_eq!(settings.limits().preview_truncate, 20);
        assert_eq!(settings.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    fn test_malformed_settings_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        assert!(matches!(Settings::load_from(&path), Err(Error::Config(_))));
    }
}
