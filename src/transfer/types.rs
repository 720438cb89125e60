//! Transfer types for export, preview and import.
//!
//! This module defines the request, result and error types that flow
//! between the resolver, diff engine, backup writer and reconciler.

use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;

use crate::error::ErrorCode;
use crate::model::{ContentItemRef, FieldSet};

/// Default upper bound for uploaded payloads (2 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 2 * 1024 * 1024;

/// Default prefix length for scalar values in diff display.
pub const DEFAULT_PREVIEW_TRUNCATE: usize = 100;

/// Where an import payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    /// JSON text passed directly.
    Inline,
    /// JSON read from an uploaded file.
    UploadedFile,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inline => write!(f, "inline"),
            Self::UploadedFile => write!(f, "uploaded-file"),
        }
    }
}

/// A candidate field set plus its provenance.
#[derive(Debug, Clone)]
pub struct ImportPayload {
    pub fields: FieldSet,
    pub provenance: Provenance,
}

/// An uploaded JSON file.
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    /// Original file name (used for the extension check).
    pub name: String,
    /// Size reported by the source. May exceed `content.len()` when the
    /// reader stopped at the size limit.
    pub size_bytes: u64,
    /// Raw bytes.
    pub content: Vec<u8>,
    /// MIME type, when the source reports one.
    pub mime: Option<String>,
}

impl UploadedFile {
    /// Build an upload from in-memory bytes.
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size_bytes: content.len() as u64,
            content,
            mime: None,
        }
    }

    /// Attach a MIME type.
    #[must_use]
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// True when no file was actually provided.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.size_bytes == 0
    }
}

/// Size and display limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_upload_bytes: u64,
    pub preview_truncate: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            preview_truncate: DEFAULT_PREVIEW_TRUNCATE,
        }
    }
}

/// Per-key change classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    New,
    Changed,
    Removed,
    Unchanged,
}

impl Classification {
    /// Classify from presence and exact equality of the two sides.
    #[must_use]
    pub fn of(previous: Option<&Value>, new: Option<&Value>) -> Self {
        match (previous, new) {
            (None, Some(_)) => Self::New,
            (Some(_), None) => Self::Removed,
            (Some(p), Some(n)) if p == n => Self::Unchanged,
            (Some(_), Some(_)) => Self::Changed,
            // A key only reaches the diff if one side has it.
            (None, None) => Self::Unchanged,
        }
    }

    /// Short label for terminal output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Changed => "changed",
            Self::Removed => "removed",
            Self::Unchanged => "unchanged",
        }
    }
}

/// One row of a diff.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeEntry {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
    pub classification: Classification,
}

/// Counts per classification.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub new: usize,
    pub changed: usize,
    pub removed: usize,
    pub unchanged: usize,
}

impl DiffSummary {
    /// True if applying the candidate would change anything.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.new + self.changed > 0
    }

    /// Total number of entries.
    #[must_use]
    pub fn total(&self) -> usize {
        self.new + self.changed + self.removed + self.unchanged
    }
}

/// Result of a single key update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "reason", rename_all = "snake_case")]
pub enum KeyOutcome {
    Updated,
    Failed(String),
}

impl KeyOutcome {
    #[must_use]
    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated)
    }
}

/// Aggregate result of applying a payload.
///
/// `updated_count + failed_count` always equals the payload size.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ReconcileResult {
    pub updated_count: usize,
    pub failed_count: usize,
    /// Sanitized key and outcome, in payload order.
    pub per_key_outcome: Vec<(String, KeyOutcome)>,
}

impl ReconcileResult {
    /// Record one key's outcome.
    pub fn record(&mut self, key: String, outcome: KeyOutcome) {
        if outcome.is_updated() {
            self.updated_count += 1;
        } else {
            self.failed_count += 1;
        }
        self.per_key_outcome.push((key, outcome));
    }

    /// Total keys processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.updated_count + self.failed_count
    }

    /// Every key failed.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        self.failed_count > 0 && self.updated_count == 0
    }
}

/// Overall status reported for an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    UpdateFailed,
}

/// What the caller gets back from an import.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOutcome {
    pub status: OutcomeStatus,
    pub item_id: i64,
    pub provenance: Provenance,
    pub updated_count: usize,
    pub failed_count: usize,
    pub backup_created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
    pub per_key_outcome: Vec<(String, KeyOutcome)>,
}

impl ReconcileOutcome {
    /// Convert an `UpdateFailed` status into an error.
    ///
    /// # Errors
    ///
    /// Returns `TransferError::UpdateFailed` if no field could be written.
    pub fn into_result(self) -> TransferResult<Self> {
        match self.status {
            OutcomeStatus::Success => Ok(self),
            OutcomeStatus::UpdateFailed => Err(TransferError::UpdateFailed {
                failed: self.failed_count,
            }),
        }
    }
}

/// Explicit import request.
#[derive(Debug, Clone, Default)]
pub struct ImportCommand {
    pub item_id: i64,
    pub inline_text: Option<String>,
    pub uploaded_file: Option<UploadedFile>,
    pub create_backup: bool,
    /// Fingerprint from an earlier preview; import is refused if the item changed since.
    pub expected_fingerprint: Option<String>,
}

/// Explicit preview request.
#[derive(Debug, Clone, Default)]
pub struct PreviewCommand {
    pub item_id: i64,
    pub inline_text: Option<String>,
    pub uploaded_file: Option<UploadedFile>,
}

/// Read-only comparison between current and candidate fields.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewReport {
    pub item: ContentItemRef,
    pub provenance: Provenance,
    pub entries: Vec<ChangeEntry>,
    pub summary: DiffSummary,
    /// Raw payload keys that are empty after sanitizing; import rejects them.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected_keys: Vec<String>,
    /// Fingerprint of the item's current fields.
    pub fingerprint: String,
}

/// A rendered export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportDocument {
    pub item: ContentItemRef,
    pub filename: String,
    pub content_type: &'static str,
    pub field_count: usize,
    #[serde(skip)]
    pub body: String,
}

/// Transfer-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Neither inline text nor a file was provided.
    #[error("No input: provide inline JSON or a JSON file")]
    NoInput,

    /// Uploaded file is not JSON.
    #[error("Invalid file type: {name} is not a JSON file")]
    InvalidFileType { name: String },

    /// Uploaded file exceeds the size limit.
    #[error("File too large: {size} bytes exceeds the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },

    /// Payload is not parseable JSON.
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    /// Payload parsed but is not a non-empty object.
    #[error("Empty or invalid JSON: expected a non-empty object of field keys")]
    EmptyOrInvalidJson,

    /// Backup location could not be prepared.
    #[error("Backup directory unavailable: {path}: {reason}")]
    BackupDirectoryUnavailable { path: PathBuf, reason: String },

    /// Backup artifact could not be durably written.
    #[error("Backup write failed: {path}: {reason}")]
    BackupWriteFailed { path: PathBuf, reason: String },

    /// Content item does not exist.
    #[error("Item not found: {id}")]
    ItemNotFound { id: i64 },

    /// Content item has no fields to export.
    #[error("No fields found for item {id}")]
    NoFieldsFound { id: i64 },

    /// Every field update was rejected.
    #[error("Update failed: all {failed} field updates were rejected")]
    UpdateFailed { failed: usize },

    /// Actor is not allowed to perform the operation.
    #[error("Permission denied for actor '{actor}'")]
    PermissionDenied { actor: String },

    /// The item changed since the fingerprint was taken.
    #[error("Security check failed: expected fingerprint {expected}, found {actual}")]
    SecurityCheckFailed { expected: String, actual: String },

    /// Field store error.
    #[error("Store error: {0}")]
    Store(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TransferError {
    /// Map to the crate-wide error code.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NoInput => ErrorCode::NoInput,
            Self::InvalidFileType { .. } => ErrorCode::InvalidFileType,
            Self::FileTooLarge { .. } => ErrorCode::FileTooLarge,
            Self::InvalidJson(_) => ErrorCode::InvalidJson,
            Self::EmptyOrInvalidJson => ErrorCode::EmptyOrInvalidJson,
            Self::BackupDirectoryUnavailable { .. } => ErrorCode::BackupDirectoryUnavailable,
            Self::BackupWriteFailed { .. } => ErrorCode::BackupWriteFailed,
            Self::ItemNotFound { .. } => ErrorCode::ItemNotFound,
            Self::NoFieldsFound { .. } => ErrorCode::NoFieldsFound,
            Self::UpdateFailed { .. } => ErrorCode::UpdateFailed,
            Self::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            Self::SecurityCheckFailed { .. } => ErrorCode::SecurityCheckFailed,
            Self::Store(_) => ErrorCode::DatabaseError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
        }
    }

    /// True for the backup failures that abort an import.
    #[must_use]
    pub const fn is_backup_failure(&self) -> bool {
        matches!(
            self,
            Self::BackupDirectoryUnavailable { .. } | Self::BackupWriteFailed { .. }
        )
    }
}

impl From<crate::error::Error> for TransferError {
    fn from(err: crate::error::Error) -> Self {
        match err {
            crate::error::Error::Transfer(inner) => inner,
            other => Self::Store(other.to_string()),
        }
    }
}

/// Result type for transfer operations.
pub type TransferResult<T> = std::result::Result<T, TransferError>;
