//! Parsing of exported likes files.
//!
//! Two shapes are accepted: a bare JSON array of like objects, or an object
//! with the array under a `likes` key. Unknown fields are ignored and
//! missing fields surface as `None`, so per-item validation stays in the
//! ingest layer.

use crate::error::{Result, XlikesError};
use crate::model::RawLike;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LikesExport {
    Wrapped { likes: Vec<RawLike> },
    Bare(Vec<RawLike>),
}

impl From<LikesExport> for Vec<RawLike> {
    fn from(export: LikesExport) -> Self {
        match export {
            LikesExport::Wrapped { likes } => likes,
            LikesExport::Bare(items) => items,
        }
    }
}

/// Parse an exported likes document from a string.
///
/// # Errors
///
/// Fails when the document is not valid JSON or matches neither accepted
/// shape.
pub fn parse_likes_export(content: &str) -> Result<Vec<RawLike>> {
    let export: LikesExport = serde_json::from_str(content)?;
    let items: Vec<RawLike> = export.into();
    debug!("Parsed {} items from likes export", items.len());
    Ok(items)
}

/// Read and parse an exported likes file.
///
/// # Errors
///
/// Fails when the file cannot be read or does not parse.
pub fn parse_likes_file(path: impl AsRef<Path>) -> Result<Vec<RawLike>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        XlikesError::config(path, format!("cannot read likes export: {e}"))
    })?;
    parse_likes_export(&content)
}
