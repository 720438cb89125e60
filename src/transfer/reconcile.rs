//! Reconciliation: apply a payload to the field store.
//!
//! Keys are applied one at a time in payload order. A rejected or failed
//! key is counted and the walk continues; nothing is rolled back.

use tracing::{debug, warn};

use crate::model::FieldSet;
use crate::transfer::adapter::FieldStore;
use crate::transfer::types::{ImportPayload, KeyOutcome, ReconcileResult};

/// Apply every field of `payload` to `item_id`.
///
/// Never fails as a whole: per-key failures are recorded in the result.
pub fn apply<S: FieldStore + ?Sized>(
    store: &mut S,
    item_id: i64,
    payload: &ImportPayload,
) -> ReconcileResult {
    let mut result = ReconcileResult::default();

    for (raw_key, value) in &payload.fields {
        let key = sanitize_key(raw_key);

        if key.is_empty() {
            warn!(item_id, key = ?raw_key, "Empty field key after sanitizing");
            result.record(key, KeyOutcome::Failed("empty key".to_string()));
            continue;
        }

        let outcome = match store.update_field(&key, value, item_id) {
            Ok(true) => KeyOutcome::Updated,
            Ok(false) => KeyOutcome::Failed("rejected by store".to_string()),
            Err(e) => KeyOutcome::Failed(e.to_string()),
        };

        match &outcome {
            KeyOutcome::Updated => debug!(item_id, %key, "Field updated"),
            KeyOutcome::Failed(reason) => warn!(item_id, %key, %reason, "Field update failed"),
        }

        result.record(key, outcome);
    }

    result
}

/// Strip control characters and surrounding whitespace from a field key.
#[must_use]
pub fn sanitize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Rewrite a payload's keys the way [`apply`] will write them.
///
/// Returns the fields keyed by sanitized key, plus the raw keys that
/// sanitize to nothing and would be rejected. When two raw keys collapse
/// to the same key, the later one wins, as it does in the store.
#[must_use]
pub fn sanitize_fields(fields: &FieldSet) -> (FieldSet, Vec<String>) {
    let mut sanitized = FieldSet::new();
    let mut rejected = Vec::new();

    for (raw_key, value) in fields {
        let key = sanitize_key(raw_key);
        if key.is_empty() {
            rejected.push(raw_key.clone());
        } else {
            sanitized.insert(key, value.clone());
        }
    }

    (sanitized, rejected)
}
