//! Field transfer: export, preview and import.
//!
//! This module moves an item's custom fields in and out of the store as
//! a single JSON object:
//!
//! - **Export**: current fields → pretty JSON document
//! - **Preview**: candidate payload vs. current fields → per-key diff
//! - **Import**: candidate payload → per-key writes, optionally preceded
//!   by a backup of the current fields
//!
//! # Import pipeline
//!
//! 1. The payload resolver picks inline text over an uploaded file and
//!    validates type, size, encoding and shape
//! 2. The backup writer snapshots current fields (skipped when empty)
//! 3. The reconciler writes each key independently; one rejected key
//!    never stops the others
//!
//! Any failure in steps 1 or 2 aborts before the store is touched.
//!
//! # Example
//!
//! ```ignore
//! use acfp::transfer::{DirBackupStorage, ImportCommand, TransferService};
//!
//! let backups = DirBackupStorage::new(backup_dir);
//! let mut service = TransferService::new(&mut storage, &backups, "alice");
//! let outcome = service.import_fields(&ImportCommand {
//!     item_id: 12,
//!     inline_text: Some(r#"{"hero_title": "Hi"}"#.into()),
//!     create_backup: true,
//!     ..ImportCommand::default()
//! })?;
//! ```

mod adapter;
mod backup;
mod diff;
mod export;
mod hash;
mod payload;
mod reconcile;
mod service;
mod types;

#[cfg(test)]
pub(crate) mod fakes;

pub use adapter::{BackupStorage, FieldStore, ItemDirectory};
pub use backup::{
    backup_name, list_backups, read_backup, write_backup, BackupRecord, BackupRef, BackupSummary,
    DirBackupStorage, BACKUP_PREFIX,
};
pub use diff::{diff, render_value, summarize, EMPTY_MARKER};
pub use export::{export_fields, export_filename, EXPORT_CONTENT_TYPE};
pub use hash::{fingerprint, matches_fingerprint};
pub use payload::{is_json_like, read_upload, resolve};
pub use reconcile::{apply, sanitize_fields, sanitize_key};
pub use service::{AccessPolicy, Stage, TransferService};
pub use types::{
    ChangeEntry, Classification, DiffSummary, ExportDocument, ImportCommand, ImportPayload,
    KeyOutcome, Limits, OutcomeStatus, PreviewCommand, PreviewReport, Provenance,
    ReconcileOutcome, ReconcileResult, TransferError, TransferResult, UploadedFile,
    DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_PREVIEW_TRUNCATE,
};
