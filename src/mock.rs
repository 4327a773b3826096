//! In-memory backend for tests.

use crate::paths;
use crate::traits::BlobStore;
use crate::types::{Blob, StorageError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;

/// In-memory implementation of [`BlobStore`].
///
/// Follows object-store semantics (put always overwrites, rename is copy
/// then delete-source). [`fail_next_delete`](Self::fail_next_delete) injects
/// a delete failure so the rename partial-failure window can be exercised
/// without a network.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    objects: Arc<RwLock<HashMap<String, StoredBlob>>>,
    fail_delete: Arc<AtomicBool>,
    web: String,
}

#[derive(Clone, Debug)]
struct StoredBlob {
    content: Vec<u8>,
    content_type: String,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            web: "https://memory.invalid".to_owned(),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.objects.write().expect("lock poisoned").clear();
    }

    pub fn contains(&self, logical: &str) -> bool {
        let Ok(key) = paths::clean(logical) else {
            return false;
        };
        self.objects.read().expect("lock poisoned").contains_key(&key)
    }

    /// Makes the next delete fail with a transport error.
    pub fn fail_next_delete(&self) {
        self.fail_delete.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    fn describe(&self) -> String {
        "memory://".to_owned()
    }

    async fn put(&self, blob: Blob) -> Result<String, StorageError> {
        let key = paths::clean(&blob.path)?;
        self.objects.write().expect("lock poisoned").insert(
            key,
            StoredBlob {
                content: blob.content,
                content_type: blob.content_type,
            },
        );
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
        self.put(blob).await
    }

    async fn get(&self, logical: &str, dest: &Path) -> Result<PathBuf, StorageError> {
        let key = paths::clean(logical)?;
        let content = {
            let objects = self.objects.read().expect("lock poisoned");
            objects
                .get(&key)
                .map(|b| b.content.clone())
                .ok_or_else(|| StorageError::NotFound(logical.to_owned()))?
        };
        tokio::fs::write(dest, content)
            .await
            .map_err(|e| StorageError::transport("download", e))?;
        Ok(dest.to_path_buf())
    }

    async fn info(&self, logical: &str) -> Result<String, StorageError> {
        let key = paths::clean(logical)?;
        let objects = self.objects.read().expect("lock poisoned");
        objects
            .get(&key)
            .map(|b| format!("size={}", b.content.len()))
            .ok_or_else(|| StorageError::NotFound(logical.to_owned()))
    }

    async fn rename(&self, src: &str, dest: &str) -> Result<(), StorageError> {
        self.info(src).await?;
        let from = paths::clean(src)?;
        let to = paths::clean(dest)?;
        {
            let mut objects = self.objects.write().expect("lock poisoned");
            let blob = objects
                .get(&from)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(src.to_owned()))?;
            objects.insert(to, blob);
        }
        // Same copy-then-delete sequence as the object-store backends; an
        // injected delete failure leaves both objects present.
        self.delete(src).await
    }

    async fn delete(&self, logical: &str) -> Result<(), StorageError> {
        let key = paths::clean(logical)?;
        if self.fail_delete.swap(false, Ordering::SeqCst) {
            return Err(StorageError::Transport {
                op: "delete",
                message: "injected delete failure".to_owned(),
            });
        }
        self.objects.write().expect("lock poisoned").remove(&key);
        Ok(())
    }

    fn public_url(&self, logical: &str) -> String {
        paths::public_url(&self.web, logical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hello() -> Blob {
        Blob::new("img/test.txt", b"hello world".to_vec(), "text/plain")
    }

    #[tokio::test]
    async fn put_overwrites_existing_content() {
        let store = MemoryStore::new();
        store.put(hello()).await.unwrap();
        store
            .put(Blob::new("img/test.txt", b"replaced".to_vec(), "text/plain"))
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.info("img/test.txt").await.unwrap(), "size=8");
    }

    #[tokio::test]
    async fn info_reports_not_found() {
        let store = MemoryStore::new();
        assert!(store.info("missing.txt").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn rename_moves_the_object() {
        let store = MemoryStore::new();
        store.put(hello()).await.unwrap();
        store.rename("img/test.txt", "archive/test.txt").await.unwrap();

        assert!(!store.contains("img/test.txt"));
        assert!(store.contains("archive/test.txt"));
    }

    #[tokio::test]
    async fn rename_delete_failure_leaves_both_objects() {
        let store = MemoryStore::new();
        store.put(hello()).await.unwrap();

        store.fail_next_delete();
        let err = store
            .rename("img/test.txt", "archive/test.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Transport { op: "delete", .. }));

        // The partial-failure window: copy succeeded, source survives.
        assert!(store.contains("img/test.txt"));
        assert!(store.contains("archive/test.txt"));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new();
        store.put(hello()).await.unwrap();
        store.delete("img/test.txt").await.unwrap();
        store.delete("img/test.txt").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn get_downloads_into_a_local_file() {
        let store = MemoryStore::new();
        store.put(hello()).await.unwrap();

        let dir = tempfile::tempdir().expect("tempdir");
        let dest = dir.path().join("out.txt");
        let written = store.get("img/test.txt", &dest).await.unwrap();
        assert_eq!(written, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn canceled_put_stores_nothing() {
        let store = MemoryStore::new();
        let token = CancellationToken::new();
        token.cancel();

        let err = store.put_cancelable(&token, hello()).await.unwrap_err();
        assert!(matches!(err, StorageError::Canceled(_)));
        assert!(store.is_empty());
    }
}
