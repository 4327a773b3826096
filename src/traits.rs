//! Storage trait definitions.

use crate::types::{Blob, StorageError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Capability set every storage backend implements.
///
/// Calling code depends on this trait alone. A backend is selected once, at
/// construction, via [`StorageConfig::connect`](crate::StorageConfig::connect)
/// and shared freely afterwards: instances hold only immutable configuration
/// and a client handle, so many callers may use one instance concurrently.
/// No ordering is guaranteed across concurrent calls to the same logical
/// path; callers needing last-writer-wins must serialize externally.
#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug {
    /// Human-readable identity of the backend, for diagnostics only.
    fn describe(&self) -> String;

    /// Persists the blob under the backend prefix, returning the logical path.
    ///
    /// Overwrite behavior is backend-specific: the filesystem backend skips
    /// the write when the target already exists, the object-store backends
    /// always overwrite. Callers may depend on either; the divergence is
    /// deliberate.
    async fn put(&self, blob: Blob) -> Result<String, StorageError>;

    /// Same contract as [`put`](Self::put), aborting with
    /// [`StorageError::Canceled`] when the token fires. Backends whose
    /// transport has no cancellable upload return
    /// [`StorageError::Unsupported`] instead of ignoring the token.
    async fn put_cancelable(
        &self,
        token: &CancellationToken,
        blob: Blob,
    ) -> Result<String, StorageError>;

    /// Downloads an object into a local file, returning the destination path.
    async fn get(&self, logical: &str, dest: &Path) -> Result<PathBuf, StorageError>;

    /// Existence/stat check. [`StorageError::NotFound`] when the object is
    /// absent; the S3-style backend also reports a zero-length object as
    /// missing.
    async fn info(&self, logical: &str) -> Result<String, StorageError>;

    /// Relocates an object within the backend, verifying the source exists
    /// first. Object-store backends copy then delete the source, so a
    /// failure between the two leaves both objects present.
    async fn rename(&self, src: &str, dest: &str) -> Result<(), StorageError>;

    /// Removes an object. Deleting a missing object succeeds on every
    /// backend.
    async fn delete(&self, logical: &str) -> Result<(), StorageError>;

    /// Public URL for a logical path: web base + `/` + path. No I/O.
    fn public_url(&self, logical: &str) -> String;
}
