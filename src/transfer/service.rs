//! Transfer orchestration.
//!
//! [`TransferService`] is built once per invocation from borrowed
//! collaborators and drives each operation through an explicit stage
//! sequence:
//!
//! ```text
//! import:  Idle -> [BackingUp] -> Resolving -> Applying -> Done | Failed
//! preview: Idle -> Resolving -> Diffing -> Done | Failed
//! ```
//!
//! Backup always happens before any field is written. Preview never
//! writes to the store and never touches backup storage.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::model::ContentItemRef;
use crate::transfer::adapter::{BackupStorage, FieldStore, ItemDirectory};
use crate::transfer::backup::{read_backup, write_backup};
use crate::transfer::diff::{diff, summarize};
use crate::transfer::export;
use crate::transfer::hash::{fingerprint, matches_fingerprint};
use crate::transfer::payload::resolve;
use crate::transfer::reconcile::{apply, sanitize_fields};
use crate::transfer::types::{
    ExportDocument, ImportCommand, Limits, OutcomeStatus, PreviewCommand, PreviewReport,
    ReconcileOutcome, TransferError, TransferResult,
};

/// Stage of the operation currently being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    BackingUp,
    Resolving,
    Applying,
    Diffing,
    Done,
    Failed,
}

/// Who may run mutating operations.
///
/// An empty admin list allows everyone.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    admins: Vec<String>,
}

impl AccessPolicy {
    #[must_use]
    pub fn new(admins: Vec<String>) -> Self {
        Self { admins }
    }

    /// Check that `actor` may mutate or export fields.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` if an admin list is configured and
    /// `actor` is not on it.
    pub fn check(&self, actor: &str) -> TransferResult<()> {
        if self.admins.is_empty() || self.admins.iter().any(|a| a == actor) {
            Ok(())
        } else {
            Err(TransferError::PermissionDenied {
                actor: actor.to_string(),
            })
        }
    }
}

/// Export, preview and import against one field store.
pub struct TransferService<'a, S, B: ?Sized> {
    store: &'a mut S,
    backups: &'a B,
    limits: Limits,
    policy: AccessPolicy,
    actor: String,
    stages: Vec<Stage>,
}

impl<'a, S, B> TransferService<'a, S, B>
where
    S: FieldStore + ItemDirectory,
    B: BackupStorage + ?Sized,
{
    /// Create a service with default limits and an open access policy.
    pub fn new(store: &'a mut S, backups: &'a B, actor: impl Into<String>) -> Self {
        Self {
            store,
            backups,
            limits: Limits::default(),
            policy: AccessPolicy::default(),
            actor: actor.into(),
            stages: vec![Stage::Idle],
        }
    }

    /// Override size and display limits.
    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Restrict mutating operations.
    #[must_use]
    pub fn with_policy(mut self, policy: AccessPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Limits in effect.
    #[must_use]
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Stage of the most recent operation.
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stages.last().copied().unwrap_or(Stage::Idle)
    }

    /// Every stage the most recent operation passed through.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Export the fields of an item.
    ///
    /// # Errors
    ///
    /// `PermissionDenied`, `ItemNotFound` or `NoFieldsFound`.
    pub fn export_fields(&self, item_id: i64) -> TransferResult<ExportDocument> {
        self.policy.check(&self.actor)?;
        export::export_fields(&*self.store, item_id)
    }

    /// Import a payload into an item.
    ///
    /// Returns an outcome whose status is `UpdateFailed` when every key
    /// was rejected; the store may still have been partially written in
    /// other cases.
    ///
    /// # Errors
    ///
    /// Access, lookup, fingerprint, backup and resolver failures abort
    /// the import before any field is written.
    pub fn import_fields(&mut self, command: &ImportCommand) -> TransferResult<ReconcileOutcome> {
        self.stages = vec![Stage::Idle];
        let result = self.run_import(command);

        match &result {
            Ok(outcome) => {
                self.enter(Stage::Done);
                match outcome.status {
                    OutcomeStatus::Success => info!(
                        item_id = command.item_id,
                        updated = outcome.updated_count,
                        failed = outcome.failed_count,
                        backup = outcome.backup_created,
                        "Import complete"
                    ),
                    OutcomeStatus::UpdateFailed => warn!(
                        item_id = command.item_id,
                        failed = outcome.failed_count,
                        "Import applied no fields"
                    ),
                }
            }
            Err(e) => {
                self.enter(Stage::Failed);
                warn!(item_id = command.item_id, code = e.error_code().as_str(), error = %e, "Import failed");
            }
        }

        result
    }

    /// Compare an item's fields with a candidate payload without writing.
    ///
    /// # Errors
    ///
    /// `ItemNotFound` or any resolver error.
    pub fn preview_import(&mut self, command: &PreviewCommand) -> TransferResult<PreviewReport> {
        self.stages = vec![Stage::Idle];
        let result = self.run_preview(command);

        match &result {
            Ok(report) => {
                self.enter(Stage::Done);
                debug!(item_id = command.item_id, entries = report.entries.len(), "Preview complete");
            }
            Err(e) => {
                self.enter(Stage::Failed);
                warn!(item_id = command.item_id, error = %e, "Preview failed");
            }
        }

        result
    }

    /// Re-import the fields held in a backup artifact into its item.
    ///
    /// # Errors
    ///
    /// Fails if the artifact cannot be read, or as [`Self::import_fields`].
    pub fn restore_backup(
        &mut self,
        path: &Path,
        create_backup: bool,
    ) -> TransferResult<ReconcileOutcome> {
        let record = read_backup(self.backups, path)?;
        info!(item_id = record.post_id, path = %path.display(), "Restoring backup");

        let command = ImportCommand {
            item_id: record.post_id,
            inline_text: Some(serde_json::to_string(&record.fields)?),
            create_backup,
            ..ImportCommand::default()
        };
        self.import_fields(&command)
    }

    fn run_import(&mut self, command: &ImportCommand) -> TransferResult<ReconcileOutcome> {
        self.policy.check(&self.actor)?;
        let item = self.lookup(command.item_id)?;
        let current = self.store.get_fields(item.id)?;

        if !matches_fingerprint(&current, command.expected_fingerprint.as_deref()) {
            return Err(TransferError::SecurityCheckFailed {
                expected: command.expected_fingerprint.clone().unwrap_or_default(),
                actual: fingerprint(&current),
            });
        }

        let backup = if command.create_backup {
            self.enter(Stage::BackingUp);
            write_backup(self.backups, &item, &current)?
        } else {
            None
        };

        self.enter(Stage::Resolving);
        let payload = resolve(
            command.inline_text.as_deref(),
            command.uploaded_file.as_ref(),
            &self.limits,
        )?;

        self.enter(Stage::Applying);
        let result = apply(&mut *self.store, item.id, &payload);

        let status = if result.all_failed() {
            OutcomeStatus::UpdateFailed
        } else {
            OutcomeStatus::Success
        };

        Ok(ReconcileOutcome {
            status,
            item_id: item.id,
            provenance: payload.provenance,
            updated_count: result.updated_count,
            failed_count: result.failed_count,
            backup_created: backup.is_some(),
            backup_path: backup.map(|b| b.path),
            per_key_outcome: result.per_key_outcome,
        })
    }

    fn run_preview(&mut self, command: &PreviewCommand) -> TransferResult<PreviewReport> {
        let item = self.lookup(command.item_id)?;

        self.enter(Stage::Resolving);
        let payload = resolve(
            command.inline_text.as_deref(),
            command.uploaded_file.as_ref(),
            &self.limits,
        )?;

        self.enter(Stage::Diffing);
        let current = self.store.get_fields(item.id)?;
        let (candidate, rejected_keys) = sanitize_fields(&payload.fields);
        let entries = diff(&current, &candidate);

        Ok(PreviewReport {
            summary: summarize(&entries),
            fingerprint: fingerprint(&current),
            provenance: payload.provenance,
            entries,
            rejected_keys,
            item,
        })
    }

    fn lookup(&self, item_id: i64) -> TransferResult<ContentItemRef> {
        self.store
            .get_item(item_id)?
            .ok_or(TransferError::ItemNotFound { id: item_id })
    }

    fn enter(&mut self, stage: Stage) {
        debug!(from = ?self.stage(), to = ?stage, "Stage transition");
        self.stages.push(stage);
    }
}
