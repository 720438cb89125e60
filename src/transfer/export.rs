//! Field export.
//!
//! Renders an item's fields as a pretty-printed JSON document with a
//! suggested download filename of `acf-export-<slug>.json`.

use tracing::info;

use crate::model::ContentItemRef;
use crate::transfer::adapter::{FieldStore, ItemDirectory};
use crate::transfer::types::{ExportDocument, TransferError, TransferResult};

/// Content type of export documents.
pub const EXPORT_CONTENT_TYPE: &str = "application/json";

/// Suggested filename for an item's export.
#[must_use]
pub fn export_filename(item: &ContentItemRef) -> String {
    format!("acf-export-{}.json", item.slug())
}

/// Export the fields of `item_id`.
///
/// # Errors
///
/// - `ItemNotFound` if the item does not exist
/// - `NoFieldsFound` if the item has no fields
pub fn export_fields<S>(store: &S, item_id: i64) -> TransferResult<ExportDocument>
where
    S: FieldStore + ItemDirectory + ?Sized,
{
    let item = store
        .get_item(item_id)?
        .ok_or(TransferError::ItemNotFound { id: item_id })?;

    let fields = store.get_fields(item_id)?;
    if fields.is_empty() {
        return Err(TransferError::NoFieldsFound { id: item_id });
    }

    let mut body = serde_json::to_string_pretty(&fields)?;
    body.push('\n');

    info!(item_id, fields = fields.len(), "Exported fields");

    Ok(ExportDocument {
        filename: export_filename(&item),
        content_type: EXPORT_CONTENT_TYPE,
        field_count: fields.len(),
        item,
        body,
    })
}
