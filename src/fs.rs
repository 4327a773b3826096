//! Local-filesystem backend.

use crate::paths;
use crate::traits::BlobStore;
use crate::types::{Blob, StorageError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Stores blobs under a local directory, serving them from a web base.
///
/// Writes are single-pass with no temp-file-and-rename step; a crash during
/// a write can leave a partial file behind.
#[derive(Debug)]
pub struct FsStore {
    root: PathBuf,
    web: String,
}

impl FsStore {
    /// Fails with [`StorageError::Construction`] when `web` is not an
    /// absolute http(s) URL.
    pub fn new(root: impl Into<PathBuf>, web: &str) -> Result<Self, StorageError> {
        let uri = web
            .parse::<http::Uri>()
            .map_err(|_| StorageError::Construction(format!("invalid web base {web:?}")))?;
        if uri.scheme().is_none() || uri.authority().is_none() {
            return Err(StorageError::Construction(format!(
                "invalid web base {web:?}"
            )));
        }

        let root = root.into();
        info!(root = %root.display(), "initialising filesystem store");
        Ok(Self {
            root,
            web: paths::trim_web_base(web),
        })
    }

    fn target(&self, logical: &str) -> Result<PathBuf, StorageError> {
        Ok(self.root.join(paths::clean(logical)?))
    }

    async fn write(&self, blob: &Blob) -> Result<(), StorageError> {
        let target = self.target(&blob.path)?;
        match tokio::fs::try_exists(&target).await {
            // Existing content wins; re-putting the same path is a no-op.
            Ok(true) => {
                debug!(path = %target.display(), "already cached, skipping write");
                return Ok(());
            }
            Ok(false) => {}
            Err(e) => return Err(StorageError::transport("stat", e)),
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::transport("mkdir", e))?;
        }
        tokio::fs::write(&target, &blob.content)
            .await
            .map_err(|e| StorageError::transport("write", e))?;
        debug!(path = %target.display(), "cached");
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FsStore {
    fn describe(&self) -> String {
        format!("file://{} serving from {}", self.root.display(), self.web)
    }

    async fn put(&self, blob: Blob) -> Result<String, StorageError> {
        self.write(&blob).await?;
        Ok(blob.path)
    }

    async fn put_cancelable(
        &self,
        token: &CancellationToken,
        blob: Blob,
    ) -> Result<String, StorageError> {
        if token.is_cancelled() {
            return Err(StorageError::Canceled("put"));
        }
        tokio::select! {
            _ = token.cancelled() => return Err(StorageError::Canceled("put")),
            res = self.write(&blob) => res?,
        };
        Ok(blob.path)
    }

    async fn get(&self, _logical: &str, _dest: &Path) -> Result<PathBuf, StorageError> {
        Err(StorageError::Unsupported {
            backend: "fs",
            op: "get",
        })
    }

    async fn info(&self, logical: &str) -> Result<String, StorageError> {
        let target = self.target(logical)?;
        match tokio::fs::metadata(&target).await {
            Ok(meta) => Ok(format!("size={}", meta.len())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(logical.to_owned()))
            }
            Err(e) => Err(StorageError::transport("stat", e)),
        }
    }

    async fn rename(&self, src: &str, dest: &str) -> Result<(), StorageError> {
        self.info(src).await?;
        let from = self.target(src)?;
        let to = self.target(dest)?;
        if let Some(parent) = to.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::transport("mkdir", e))?;
        }
        tokio::fs::rename(&from, &to)
            .await
            .map_err(|e| StorageError::transport("rename", e))
    }

    async fn delete(&self, logical: &str) -> Result<(), StorageError> {
        let target = self.target(logical)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::transport("delete", e)),
        }
    }

    fn public_url(&self, logical: &str) -> String {
        paths::public_url(&self.web, logical)
    }
}
