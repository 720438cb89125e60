//! Payload resolution.
//!
//! Turns either inline JSON text or an uploaded file into an
//! [`ImportPayload`]. Exactly one source is used. When both are present
//! inline text wins and the file is ignored.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::transfer::types::{
    ImportPayload, Limits, Provenance, TransferError, TransferResult, UploadedFile,
};

/// MIME types accepted in place of a `.json` extension.
const JSON_MIME_TYPES: &[&str] = &["application/json", "text/json"];

/// Resolve a candidate field set from inline text or an uploaded file.
///
/// # Errors
///
/// - `NoInput` if neither source has content
/// - `InvalidFileType` / `FileTooLarge` for a rejected upload
/// - `InvalidJson` if the text does not parse
/// - `EmptyOrInvalidJson` if the JSON is not a non-empty object
pub fn resolve(
    inline_text: Option<&str>,
    uploaded_file: Option<&UploadedFile>,
    limits: &Limits,
) -> TransferResult<ImportPayload> {
    let inline = inline_text.filter(|text| !text.trim().is_empty());
    let upload = uploaded_file.filter(|file| !file.is_empty());

    match (inline, upload) {
        (Some(text), file) => {
            if let Some(file) = file {
                debug!(file = %file.name, "Inline JSON takes precedence, ignoring uploaded file");
            }
            let value = parse_json(text)?;
            into_payload(value, Provenance::Inline)
        }
        (None, Some(file)) => {
            check_file(file, limits)?;
            let text = std::str::from_utf8(&file.content)
                .map_err(|e| TransferError::InvalidJson(format!("file is not UTF-8: {e}")))?;
            let value = parse_json(text)?;
            into_payload(value, Provenance::UploadedFile)
        }
        (None, None) => Err(TransferError::NoInput),
    }
}

/// Read a file from disk as an upload, stopping one byte past `limit`.
///
/// The reported size comes from file metadata so the resolver can reject
/// oversized files without holding them in memory.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn read_upload(path: &Path, limit: u64) -> TransferResult<UploadedFile> {
    let file = File::open(path)?;
    let size_bytes = file.metadata()?.len();

    let mut content = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut content)?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(UploadedFile {
        name,
        size_bytes,
        content,
        mime: None,
    })
}

/// True if the extension or MIME type marks the file as JSON.
#[must_use]
pub fn is_json_like(file: &UploadedFile) -> bool {
    let by_extension = Path::new(&file.name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let by_mime = file.mime.as_deref().is_some_and(|mime| {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        JSON_MIME_TYPES.contains(&essence.as_str()) || essence.ends_with("+json")
    });

    by_extension || by_mime
}

fn check_file(file: &UploadedFile, limits: &Limits) -> TransferResult<()> {
    if !is_json_like(file) {
        return Err(TransferError::InvalidFileType {
            name: file.name.clone(),
        });
    }

    if file.size_bytes > limits.max_upload_bytes {
        return Err(TransferError::FileTooLarge {
            size: file.size_bytes,
            limit: limits.max_upload_bytes,
        });
    }

    Ok(())
}

fn parse_json(text: &str) -> TransferResult<Value> {
    serde_json::from_str(text).map_err(|e| TransferError::InvalidJson(e.to_string()))
}

fn into_payload(value: Value, provenance: Provenance) -> TransferResult<ImportPayload> {
    match value {
        Value::Object(fields) if !fields.is_empty() => Ok(ImportPayload { fields, provenance }),
        _ => Err(TransferError::EmptyOrInvalidJson),
    }
}
