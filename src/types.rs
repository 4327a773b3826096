//! Blob descriptor and error types.

/// A unit of content handed to a storage backend.
///
/// `path` is the logical, caller-relative path; backends root it under their
/// configured prefix and never expose the joined storage path back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub path: String,
    pub content: Vec<u8>,
    pub content_type: String,
    pub meta: Option<String>,
}

impl Blob {
    pub fn new(path: impl Into<String>, content: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content,
            content_type: content_type.into(),
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: impl Into<String>) -> Self {
        self.meta = Some(meta.into());
        self
    }
}

/// Error type shared by every storage backend.
///
/// Errors always return to the immediate caller; this layer never retries
/// and never swallows. Construction failures are returned from the
/// constructor so the wiring layer decides whether to abort.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("backend construction failed: {0}")]
    Construction(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("{op} failed: {message}")]
    Transport { op: &'static str, message: String },

    #[error("{backend} backend does not support {op}")]
    Unsupported {
        backend: &'static str,
        op: &'static str,
    },

    #[error("{0} canceled")]
    Canceled(&'static str),

    #[error("invalid path: {0}")]
    InvalidPath(String),
}

impl StorageError {
    pub(crate) fn transport(op: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            op,
            message: err.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
