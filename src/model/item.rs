//! Content item model.
//!
//! Content items are owned by the host store. The transfer core only
//! holds them by id and uses the title to derive file names.

use serde::{Deserialize, Serialize};

/// A content item whose fields are read or written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItemRef {
    /// Host identifier
    pub id: i64,

    /// Display title
    pub title: String,

    /// Type tag (e.g. "page", "post")
    pub type_tag: String,
}

impl ContentItemRef {
    /// Create a new item reference.
    pub fn new(id: i64, title: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            type_tag: type_tag.into(),
        }
    }

    /// Stable, file-name safe slug derived from the title.
    ///
    /// Falls back to `item-<id>` when the title has no usable characters.
    #[must_use]
    pub fn slug(&self) -> String {
        let slug = slugify(&self.title);
        if slug.is_empty() {
            format!("item-{}", self.id)
        } else {
            slug
        }
    }
}

/// Lowercase ASCII alphanumerics, with every other run collapsed to a single `-`.
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}
