//! Aliyun-OSS-compatible object-store backend.
//!
//! Shares the capability set with the S3 backend, with two documented gaps:
//! `rename` is not implemented and the transport has no cancellable upload,
//! so both fail with [`StorageError::Unsupported`].

use crate::paths;
use crate::traits::BlobStore;
use crate::types::{Blob, StorageError};
use async_trait::async_trait;
use opendal::{ErrorKind, Operator};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct OssConfig {
    pub bucket: String,
    #[serde(default)]
    pub prefix: String,
    pub web: String,
    pub endpoint: String,
    pub access_key_id: String,
    pub access_key_secret: String,
}

/// Stores blobs in an OSS bucket under a configured prefix.
#[derive(Debug)]
pub struct OssStore {
    op: Operator,
    bucket: String,
    prefix: String,
    web: String,
}

impl OssStore {
    /// Probes the bucket before returning, like [`S3Store`](crate::S3Store).
    pub async fn new(config: OssConfig) -> Result<Self, StorageError> {
        let store = Self::build(&config)?;
        store.op.check().await.map_err(|e| {
            StorageError::Construction(format!("bucket {:?} unreachable: {e}", config.bucket))
        })?;
        info!(bucket = %store.bucket, "initialised oss store");
        Ok(store)
    }

    fn build(config: &OssConfig) -> Result<Self, StorageError> {
        let builder = opendal::services::Oss::default()
            .bucket(&config.bucket)
            .endpoint(&config.endpoint)
            .access_key_id(&config.access_key_id)
            .access_key_secret(&config.access_key_secret);

        let op = Operator::new(builder)
            .map_err(|e| StorageError::Construction(e.to_string()))?
            .finish();
        Ok(Self {
            op,
            bucket: config.bucket.clone(),
            prefix: config.prefix.clone(),
            web: paths::trim_web_base(&config.web),
        })
    }

    #[cfg(test)]
    pub(crate) fn new_unchecked(config: OssConfig) -> Self {
        Self::build(&config).expect("operator should build")
    }

    fn key(&self, logical: &str) -> Result<String, StorageError> {
        paths::storage_path(&self.prefix, logical)
    }
}

#[async_trait]
impl BlobStore for OssStore {
    fn describe(&self) -> String {
        format!("oss://{}", self.bucket)
    }

    async fn put(&self, blob: Blob) -> Result<String, StorageError> {
        let key = self.key(&blob.path)?;
        self.op
            .write_with(&key, blob.content)
            .content_type(&blob.content_type)
            .await
            .map_err(|e| StorageError::transport("upload", e))?;
        Ok(blob.path)
    }

    async fn put_cancelable(
        &self,
        _token: &CancellationToken,
        _blob: Blob,
    ) -> Result<String, StorageError> {
        Err(StorageError::Unsupported {
            backend: "oss",
            op: "cancelable put",
        })
    }

    async fn get(&self, logical: &str, dest: &Path) -> Result<PathBuf, StorageError> {
        let key = self.key(logical)?;
        let buf = self.op.read(&key).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(logical.to_owned()),
            _ => StorageError::transport("download", e),
        })?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::transport("mkdir", e))?;
        }
        tokio::fs::write(dest, buf.to_vec())
            .await
            .map_err(|e| StorageError::transport("download", e))?;
        Ok(dest.to_path_buf())
    }

    /// Binary existence check; unlike the S3 backend there is no
    /// zero-length special case here.
    async fn info(&self, logical: &str) -> Result<String, StorageError> {
        let key = self.key(logical)?;
        let exists = self
            .op
            .exists(&key)
            .await
            .map_err(|e| StorageError::transport("stat", e))?;
        if !exists {
            return Err(StorageError::NotFound(logical.to_owned()));
        }
        Ok(String::new())
    }

    async fn rename(&self, _src: &str, _dest: &str) -> Result<(), StorageError> {
        Err(StorageError::Unsupported {
            backend: "oss",
            op: "rename",
        })
    }

    async fn delete(&self, logical: &str) -> Result<(), StorageError> {
        let key = self.key(logical)?;
        self.op
            .delete(&key)
            .await
            .map_err(|e| StorageError::transport("delete", e))
    }

    fn public_url(&self, logical: &str) -> String {
        paths::public_url(&self.web, logical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> OssStore {
        OssStore::new_unchecked(OssConfig {
            bucket: "media-upload".to_owned(),
            prefix: "video".to_owned(),
            web: "https://media-upload.oss-ap-southeast-1.aliyuncs.com/video".to_owned(),
            endpoint: "oss-ap-southeast-1.aliyuncs.com".to_owned(),
            access_key_id: "test-key".to_owned(),
            access_key_secret: "test-secret".to_owned(),
        })
    }

    #[tokio::test]
    async fn rename_is_unsupported_and_has_no_side_effect() {
        let store = store();
        let err = store.rename("a.jpg", "b.jpg").await.unwrap_err();
        assert!(matches!(err, StorageError::Unsupported { op: "rename", .. }));
    }

    #[tokio::test]
    async fn cancelable_put_is_unsupported() {
        let store = store();
        let token = CancellationToken::new();
        let err = store
            .put_cancelable(
                &token,
                Blob::new("img/test.txt", b"hello world".to_vec(), "text/plain"),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::Unsupported {
                op: "cancelable put",
                ..
            }
        ));
    }

    #[test]
    fn describe_names_the_bucket() {
        assert_eq!(store().describe(), "oss://media-upload");
    }

    #[test]
    fn public_url_uses_the_web_base_verbatim() {
        assert_eq!(
            store().public_url("img/test.txt"),
            "https://media-upload.oss-ap-southeast-1.aliyuncs.com/video/img/test.txt"
        );
    }
}
