//! Data models for acf-porter.
//!
//! - [`FieldSet`] - the key/value custom fields attached to a content item
//! - [`ContentItemRef`] - the item those fields belong to

pub mod field;
pub mod item;

pub use field::{FieldSet, sorted_keys};
pub use item::{ContentItemRef, slugify};
