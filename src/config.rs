//! Backend selection and construction.

use crate::fs::FsStore;
use crate::oss::{OssConfig, OssStore};
use crate::s3::{S3Config, S3Store};
use crate::traits::BlobStore;
use crate::types::StorageError;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Backend selection, tagged so it deserializes straight out of a config
/// file or environment layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    Fs { root: PathBuf, web: String },
    S3(S3Config),
    Oss(OssConfig),
}

impl StorageConfig {
    /// Constructs and validates the selected backend.
    ///
    /// Object-store backends probe the bucket here and return
    /// [`StorageError::Construction`] when it is unreachable; a misconfigured
    /// backend never reaches callers.
    pub async fn connect(self) -> Result<Arc<dyn BlobStore>, StorageError> {
        match self {
            Self::Fs { root, web } => Ok(Arc::new(FsStore::new(root, &web)?)),
            Self::S3(config) => Ok(Arc::new(S3Store::new(config).await?)),
            Self::Oss(config) => Ok(Arc::new(OssStore::new(config).await?)),
        }
    }
}
