//! Diff engine for import previews.
//!
//! Compares the current fields of an item with a candidate payload and
//! classifies every key. Equality is exact structural equality on
//! `serde_json::Value`: `"1"` and `1` differ, as do `1` and `1.0`.
//!
//! Rendering helpers only shape output; they never feed back into
//! classification.

use serde_json::Value;

use crate::model::{FieldSet, sorted_keys};
use crate::transfer::types::{ChangeEntry, Classification, DiffSummary};

/// Marker shown when a side has no value.
pub const EMPTY_MARKER: &str = "(empty)";

/// Marker appended to truncated scalars.
pub const ELLIPSIS: &str = "...";

/// Classify every key in `current ∪ candidate`, sorted by key.
#[must_use]
pub fn diff(current: &FieldSet, candidate: &FieldSet) -> Vec<ChangeEntry> {
    sorted_keys(current, candidate)
        .into_iter()
        .map(|key| {
            let previous = current.get(key);
            let new = candidate.get(key);
            ChangeEntry {
                key: key.to_string(),
                classification: Classification::of(previous, new),
                previous_value: previous.cloned(),
                new_value: new.cloned(),
            }
        })
        .collect()
}

/// Count entries per classification.
#[must_use]
pub fn summarize(entries: &[ChangeEntry]) -> DiffSummary {
    entries
        .iter()
        .fold(DiffSummary::default(), |mut summary, entry| {
            match entry.classification {
                Classification::New => summary.new += 1,
                Classification::Changed => summary.changed += 1,
                Classification::Removed => summary.removed += 1,
                Classification::Unchanged => summary.unchanged += 1,
            }
            summary
        })
}

/// Render a value for display.
///
/// Scalars longer than `max_chars` are cut and suffixed with [`ELLIPSIS`].
/// Arrays and objects are pretty-printed in full.
#[must_use]
pub fn render_value(value: Option<&Value>, max_chars: usize) -> String {
    match value {
        None => EMPTY_MARKER.to_string(),
        Some(v @ (Value::Array(_) | Value::Object(_))) => {
            serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
        }
        Some(Value::String(s)) => truncate(s, max_chars),
        Some(scalar) => truncate(&scalar.to_string(), max_chars),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &text[..cut]),
        None => text.to_string(),
    }
}
