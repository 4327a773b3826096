//! S3-compatible object-store backend.

use crate::paths;
use crate::traits::BlobStore;
use crate::types::{Blob, StorageError};
use async_trait::async_trait;
use opendal::{ErrorKind, Operator};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const DEFAULT_REGION: &str = "ap-southeast-1";

/// How the S3 backend obtains credentials.
///
/// `Static` pins explicit key material and disables ambient config loading.
/// `Ambient` leaves the SDK default chain in charge: environment variables,
/// the shared credentials file plus profile, or an instance role.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum S3Credentials {
    Static {
        access_key: String,
        secret_key: String,
        #[serde(default)]
        token: Option<String>,
    },
    #[default]
    Ambient,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    #[serde(default)]
    pub prefix: String,
    pub web: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub credentials: S3Credentials,
}

/// Stores blobs in an S3-compatible bucket under a configured prefix.
#[derive(Debug)]
pub struct S3Store {
    op: Operator,
    bucket: String,
    prefix: String,
    web: String,
}

impl S3Store {
    /// Probes the bucket before returning; an unreachable bucket is a
    /// construction failure, not a first-write surprise.
    pub async fn new(config: S3Config) -> Result<Self, StorageError> {
        let store = Self::build(&config)?;
        store.op.check().await.map_err(|e| {
            StorageError::Construction(format!("bucket {:?} unreachable: {e}", config.bucket))
        })?;
        info!(bucket = %store.bucket, "initialised s3 store");
        Ok(store)
    }

    fn build(config: &S3Config) -> Result<Self, StorageError> {
        let mut builder = opendal::services::S3::default()
            .bucket(&config.bucket)
            .region(config.region.as_deref().unwrap_or(DEFAULT_REGION));
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint(endpoint);
        }
        match &config.credentials {
            S3Credentials::Static {
                access_key,
                secret_key,
                token,
            } => {
                builder = builder
                    .access_key_id(access_key)
                    .secret_access_key(secret_key)
                    .disable_config_load()
                    .disable_ec2_metadata();
                if let Some(token) = token {
                    builder = builder.session_token(token);
                }
            }
            S3Credentials::Ambient => {}
        }

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
    pub(crate) fn new_unchecked(config: S3Config) -> Self {
        Self::build(&config).expect("operator should build")
    }

    fn key(&self, logical: &str) -> Result<String, StorageError> {
        paths::storage_path(&self.prefix, logical)
    }
}

/// Zero-length objects are treated as missing: a truncated upload must not
/// pass an existence check.
fn require_nonempty(logical: &str, len: u64) -> Result<u64, StorageError> {
    if len == 0 {
        return Err(StorageError::NotFound(format!(
            "zero-length object at {logical}"
        )));
    }
    Ok(len)
}

#[async_trait]
impl BlobStore for S3Store {
    fn describe(&self) -> String {
        format!("s3://{}", self.bucket)
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
        token: &CancellationToken,
        blob: Blob,
    ) -> Result<String, StorageError> {
        if token.is_cancelled() {
            return Err(StorageError::Canceled("upload"));
        }
        let key = self.key(&blob.path)?;
        // Dropping the in-flight write future aborts the request; that is
        // the transport's cancellable primitive.
        tokio::select! {
            _ = token.cancelled() => return Err(StorageError::Canceled("upload")),
            res = self
                .op
                .write_with(&key, blob.content)
                .content_type(&blob.content_type) =>
            {
                res.map_err(|e| StorageError::transport("upload", e))?;
            }
        };
        Ok(blob.path)
    }

    async fn get(&self, _logical: &str, _dest: &Path) -> Result<PathBuf, StorageError> {
        Err(StorageError::Unsupported {
            backend: "s3",
            op: "get",
        })
    }

    async fn info(&self, logical: &str) -> Result<String, StorageError> {
        let key = self.key(logical)?;
        let meta = self.op.stat(&key).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(logical.to_owned()),
            _ => StorageError::transport("stat", e),
        })?;
        let len = require_nonempty(logical, meta.content_length())?;
        Ok(format!("size={len}"))
    }

    async fn rename(&self, src: &str, dest: &str) -> Result<(), StorageError> {
        self.info(src).await?;
        let from = self.key(src)?;
        let to = self.key(dest)?;
        self.op
            .copy(&from, &to)
            .await
            .map_err(|e| StorageError::transport("copy", e))?;
        // Copy succeeded; if the delete below fails, both objects remain.
        if let Err(e) = self.op.delete(&from).await {
            warn!(src, dest, error = %e, "source left behind after copy");
            return Err(StorageError::transport("delete", e));
        }
        Ok(())
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

    fn config() -> S3Config {
        S3Config {
            bucket: "media-upload".to_owned(),
            prefix: "built".to_owned(),
            web: "https://cdn.example.com/built/".to_owned(),
            region: None,
            endpoint: None,
            credentials: S3Credentials::Static {
                access_key: "test-key".to_owned(),
                secret_key: "test-secret".to_owned(),
                token: None,
            },
        }
    }

    #[test]
    fn zero_length_objects_count_as_missing() {
        let err = require_nonempty("img/test.txt", 0).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(require_nonempty("img/test.txt", 11).unwrap(), 11);
    }

    #[test]
    fn describe_names_the_bucket() {
        let store = S3Store::new_unchecked(config());
        assert_eq!(store.describe(), "s3://media-upload");
    }

    #[test]
    fn public_url_trims_the_web_base() {
        let store = S3Store::new_unchecked(config());
        assert_eq!(
            store.public_url("img/test.txt"),
            "https://cdn.example.com/built/img/test.txt"
        );
    }

    #[test]
    fn keys_are_rooted_under_the_prefix() {
        let store = S3Store::new_unchecked(config());
        assert_eq!(store.key("img/test.txt").unwrap(), "built/img/test.txt");
        assert!(store.key("../escape").is_err());
    }

    #[test]
    fn credentials_default_to_ambient() {
        let config: S3Config = serde_json::from_str(
            r#"{"bucket":"b","web":"https://cdn.example.com"}"#,
        )
        .unwrap();
        assert!(matches!(config.credentials, S3Credentials::Ambient));
        assert_eq!(config.prefix, "");
    }
}
