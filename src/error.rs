//! Error types for the acf-porter CLI.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 3=not_found, 4=validation, 5=backup, etc.)
//! - Retryability flags
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

use crate::transfer::TransferError;

/// Result type alias for acf-porter operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the string or on the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    NotInitialized,
    AlreadyInitialized,
    DatabaseError,

    // Not Found (exit 3)
    ItemNotFound,
    NoFieldsFound,

    // Validation (exit 4)
    NoInput,
    InvalidFileType,
    FileTooLarge,
    InvalidJson,
    EmptyOrInvalidJson,
    InvalidArgument,

    // Backup (exit 5)
    BackupDirectoryUnavailable,
    BackupWriteFailed,

    // Update (exit 6)
    UpdateFailed,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Access (exit 9)
    PermissionDenied,
    SecurityCheckFailed,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::ItemNotFound => "ITEM_NOT_FOUND",
            Self::NoFieldsFound => "NO_FIELDS_FOUND",
            Self::NoInput => "NO_INPUT",
            Self::InvalidFileType => "INVALID_FILE_TYPE",
            Self::FileTooLarge => "FILE_TOO_LARGE",
            Self::InvalidJson => "INVALID_JSON",
            Self::EmptyOrInvalidJson => "EMPTY_OR_INVALID_JSON",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::BackupDirectoryUnavailable => "BACKUP_DIRECTORY_UNAVAILABLE",
            Self::BackupWriteFailed => "BACKUP_WRITE_FAILED",
            Self::UpdateFailed => "UPDATE_FAILED",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::SecurityCheckFailed => "SECURITY_CHECK_FAILED",
        }
    }

    /// Category-based exit code (2-9).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::NotInitialized | Self::AlreadyInitialized | Self::DatabaseError => 2,
            Self::ItemNotFound | Self::NoFieldsFound => 3,
            Self::NoInput
            | Self::InvalidFileType
            | Self::FileTooLarge
            | Self::InvalidJson
            | Self::EmptyOrInvalidJson
            | Self::InvalidArgument => 4,
            Self::BackupDirectoryUnavailable | Self::BackupWriteFailed => 5,
            Self::UpdateFailed => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
            Self::PermissionDenied | Self::SecurityCheckFailed => 9,
        }
    }

    /// Whether retrying the same operation can succeed.
    ///
    /// True for payload validation errors and a stale fingerprint, which
    /// succeed once the input is corrected, and for database errors, which
    /// are usually a busy lock and succeed after waiting. False for
    /// not-found, backup, I/O, config and access errors.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NoInput
                | Self::InvalidFileType
                | Self::FileTooLarge
                | Self::InvalidJson
                | Self::EmptyOrInvalidJson
                | Self::InvalidArgument
                | Self::SecurityCheckFailed
                | Self::DatabaseError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in acf-porter CLI operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: run `acfp init` first")]
    NotInitialized,

    #[error("Already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::AlreadyInitialized { .. } => ErrorCode::AlreadyInitialized,
            Self::Transfer(e) => e.error_code(),
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized => Some("Run `acfp init` to create the field database".to_string()),

            Self::AlreadyInitialized { path } => Some(format!(
                "Database already exists at {}. Use `--force` to reinitialize.",
                path.display()
            )),

            Self::Transfer(e) => transfer_hint(e),

            Self::InvalidArgument(msg) if msg.contains("JSON value") => Some(
                "Field values are JSON: quote strings ('\"text\"'), or pass numbers, \
                 booleans, arrays and objects as-is"
                    .to_string(),
            ),

            Self::InvalidArgument(_)
            | Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Config(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

fn transfer_hint(err: &TransferError) -> Option<String> {
    match err {
        TransferError::NoInput => {
            Some("Pass a JSON file with `--file <path>` or inline JSON with `--inline '<json>'`".to_string())
        }
        TransferError::InvalidFileType { .. } => {
            Some("Only .json files (or application/json uploads) are accepted".to_string())
        }
        TransferError::FileTooLarge { limit, .. } => Some(format!(
            "Split the payload or raise `max_upload_bytes` in config.json (current limit: {limit} bytes)"
        )),
        TransferError::EmptyOrInvalidJson => Some(
            "The payload must be a JSON object mapping field keys to values, e.g. {\"hero_title\": \"Hi\"}"
                .to_string(),
        ),
        TransferError::ItemNotFound { .. } => {
            Some("Use `acfp item list` to see available items.".to_string())
        }
        TransferError::NoFieldsFound { id } => Some(format!(
            "Item {id} has no fields yet. Use `acfp field set {id} <key> <json>` or import a payload."
        )),
        TransferError::BackupDirectoryUnavailable { .. } => Some(
            "Check permissions or point `--backup-dir` / ACFP_BACKUP_DIR at a writable directory"
                .to_string(),
        ),
        TransferError::UpdateFailed { .. } => {
            Some("No field could be written. Run with -vv to see per-key failures.".to_string())
        }
        TransferError::PermissionDenied { .. } => {
            Some("Add your actor name to `admins` in config.json, or pass `--actor`".to_string())
        }
        TransferError::SecurityCheckFailed { .. } => Some(
            "The item changed since the preview. Run `acfp preview` again and retry with the new fingerprint."
                .to_string(),
        ),
        TransferError::InvalidJson(_)
        | TransferError::BackupWriteFailed { .. }
        | TransferError::Store(_)
        | TransferError::Io(_)
        | TransferError::Json(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_errors_keep_their_code() {
        let err: Error = TransferError::NoInput.into();
        assert_eq!(err.error_code(), ErrorCode::NoInput);
        assert_eq!(err.exit_code(), 4);

        let err: Error = TransferError::UpdateFailed { failed: 3 }.into();
        assert_eq!(err.error_code().as_str(), "UPDATE_FAILED");
        assert_eq!(err.exit_code(), 6);
    }

    #[test]
    fn test_retryable_codes() {
        assert!(ErrorCode::InvalidJson.is_retryable());
        assert!(ErrorCode::SecurityCheckFailed.is_retryable());
        assert!(ErrorCode::DatabaseError.is_retryable());
        assert!(!ErrorCode::ItemNotFound.is_retryable());
        assert!(!ErrorCode::BackupWriteFailed.is_retryable());
        assert!(!ErrorCode::PermissionDenied.is_retryable());
    }

    #[test]
    fn test_structured_json_includes_hint() {
        let err: Error = TransferError::ItemNotFound { id: 42 }.into();
        let json = err.to_structured_json();

        assert_eq!(json["error"]["code"], "ITEM_NOT_FOUND");
        assert_eq!(json["error"]["exit_code"], 3);
        assert_eq!(json["error"]["retryable"], false);
        assert!(json["error"]["hint"].as_str().unwrap().contains("item list"));
    }

    #[test]
    fn test_every_transfer_kind_has_distinct_message() {
        let errors = [
            TransferError::NoInput,
            TransferError::InvalidFileType { name: "a.txt".into() },
            TransferError::FileTooLarge { size: 10, limit: 5 },
            TransferError::InvalidJson("eof".into()),
            TransferError::EmptyOrInvalidJson,
            TransferError::BackupDirectoryUnavailable {
                path: PathBuf::from("/x"),
                reason: "denied".into(),
            },
            TransferError::BackupWriteFailed {
                path: PathBuf::from("/x/y.json"),
                reason: "disk full".into(),
            },
            TransferError::ItemNotFound { id: 1 },
            TransferError::NoFieldsFound { id: 1 },
            TransferError::UpdateFailed { failed: 2 },
            TransferError::PermissionDenied { actor: "bob".into() },
            TransferError::SecurityCheckFailed {
                expected: "aa".into(),
                actual: "bb".into(),
            },
        ];

        let messages: std::collections::HashSet<String> =
            errors.iter().map(ToString::to_string).collect();
        assert_eq!(messages.len(), errors.len());

        let codes: std::collections::HashSet<&str> =
            errors.iter().map(|e| e.error_code().as_str()).collect();
        assert_eq!(codes.len(), errors.len());
    }
}
