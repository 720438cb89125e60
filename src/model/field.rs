//! Field set model.
//!
//! A field set maps field keys to arbitrary JSON values. It is backed by
//! `serde_json::Map` with `preserve_order`, so iteration follows document
//! order. Callers that need a display-stable order use [`sorted_keys`].

use std::collections::BTreeSet;

/// The complete collection of a content item's fields at a point in time.
pub type FieldSet = serde_json::Map<String, serde_json::Value>;

/// Union of the keys of `a` and `b`, ascending by byte order, without duplicates.
#[must_use]
pub fn sorted_keys<'a>(a: &'a FieldSet, b: &'a FieldSet) -> Vec<&'a str> {
    a.keys()
        .chain(b.keys())
        .map(String::as_str)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
