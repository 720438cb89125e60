//! Field set fingerprints.
//!
//! A fingerprint is the SHA256 of the compact JSON of a field set with
//! keys sorted at every level, so two field sets with the same content
//! always hash the same regardless of document order.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::model::FieldSet;

/// SHA256 hex fingerprint of a field set.
#[must_use]
pub fn fingerprint(fields: &FieldSet) -> String {
    let canonical = canonicalize(&Value::Object(fields.clone()));
    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// True if `expected` is absent or matches the fingerprint of `fields`.
#[must_use]
pub fn matches_fingerprint(fields: &FieldSet, expected: Option<&str>) -> bool {
    expected.is_none_or(|e| e.eq_ignore_ascii_case(&fingerprint(fields)))
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
