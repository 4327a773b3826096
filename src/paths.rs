//! Path composition shared by every backend.
//!
//! Storage paths are always the backend prefix joined with a caller-relative
//! logical path using `/`, independent of the platform separator. `..`
//! segments are rejected outright so a logical path can never escape the
//! prefix.

use crate::types::StorageError;

/// Normalizes a logical path into clean `/`-separated segments.
///
/// Redundant and leading separators and `.` segments are dropped; `..`
/// segments and paths that normalize to nothing are rejected.
pub fn clean(logical: &str) -> Result<String, StorageError> {
    let mut segments = Vec::new();
    for segment in logical.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(StorageError::InvalidPath(format!(
                    "path traversal in {logical:?}"
                )));
            }
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        return Err(StorageError::InvalidPath(format!("empty path {logical:?}")));
    }
    Ok(segments.join("/"))
}

/// Joins the backend prefix with a normalized logical path.
pub fn storage_path(prefix: &str, logical: &str) -> Result<String, StorageError> {
    let logical = clean(logical)?;
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        Ok(logical)
    } else {
        Ok(format!("{prefix}/{logical}"))
    }
}

/// Strips the trailing separator a configured web base often carries.
pub fn trim_web_base(web: &str) -> String {
    web.trim_end_matches('/').to_owned()
}

/// Builds the public URL for a logical path. Pure string work, no I/O, and
/// always `/` regardless of the platform separator.
pub fn public_url(web: &str, logical: &str) -> String {
    format!("{}/{}", web, logical.trim_start_matches('/'))
}
