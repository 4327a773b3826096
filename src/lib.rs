//! Uniform blob storage over interchangeable backends.
//!
//! Callers persist and fetch binary blobs (images, media) through one
//! capability set, [`BlobStore`], backed by the local filesystem, an
//! S3-compatible object store, or an Aliyun-OSS-compatible store. The
//! backend is selected once, at construction, via
//! [`StorageConfig::connect`]; after that the caller never learns which one
//! is active.
//!
//! ```no_run
//! use mediastore::{Blob, StorageConfig};
//!
//! # async fn demo() -> Result<(), mediastore::StorageError> {
//! let store = StorageConfig::Fs {
//!     root: "/tmp/test".into(),
//!     web: "https://host".into(),
//! }
//! .connect()
//! .await?;
//!
//! let path = store
//!     .put(Blob::new("img/test.txt", b"hello world".to_vec(), "text/plain"))
//!     .await?;
//! assert_eq!(store.public_url(&path), "https://host/img/test.txt");
//! # Ok(())
//! # }
//! ```
//!
//! This layer adds no retry, no consistency model and no locking of its
//! own; it wraps the underlying client's errors with operation context and
//! hands them straight back.

mod config;
mod fs;
mod mock;
mod oss;
mod paths;
mod s3;
mod traits;
mod types;

pub use config::StorageConfig;
pub use fs::FsStore;
pub use mock::MemoryStore;
pub use oss::{OssConfig, OssStore};
pub use s3::{S3Config, S3Credentials, S3Store};
pub use traits::BlobStore;
pub use types::{Blob, StorageError};

pub use tokio_util::sync::CancellationToken;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn roundtrip(store: &dyn BlobStore) -> Result<String, StorageError> {
        let path = store
            .put(Blob::new("img/test.txt", b"hello world".to_vec(), "text/plain"))
            .await?;
        store.info(&path).await?;
        Ok(store.public_url(&path))
    }

    #[tokio::test]
    async fn backends_are_interchangeable_behind_the_trait() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fs_store = StorageConfig::Fs {
            root: dir.path().to_path_buf(),
            web: "https://host".into(),
        }
        .connect()
        .await
        .unwrap();

        let stores: Vec<Arc<dyn BlobStore>> = vec![fs_store, Arc::new(MemoryStore::new())];
        for store in stores {
            let url = roundtrip(store.as_ref()).await.unwrap();
            assert!(url.ends_with("/img/test.txt"), "bad url {url}");
        }
    }

    #[tokio::test]
    async fn shared_instance_serves_concurrent_callers() {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .put(Blob::new(
                        format!("img/{i}.txt"),
                        vec![b'x'; i + 1],
                        "text/plain",
                    ))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
    }
}
