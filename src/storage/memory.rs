//! In-memory blob store.
//!
//! Blobs are held in a `tokio::sync::RwLock<HashMap<...>>` keyed by blob
//! key.  No persistence; intended for tests and ephemeral deployments.

use bytes::Bytes;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use super::client::{blob_url, BlobStore};

/// In-memory blob store.
pub struct MemoryBlobStore {
    /// Blob map: key -> data.
    blobs: tokio::sync::RwLock<HashMap<String, Bytes>>,
    /// Bucket name used for URL construction.
    bucket: String,
    /// Base URL under which blobs nominally resolve.
    public_url: String,
}

impl MemoryBlobStore {
    pub fn new(bucket: String, public_url: String) -> Self {
        Self {
            blobs: tokio::sync::RwLock::new(HashMap::new()),
            bucket,
            public_url,
        }
    }

    /// Number of blobs currently held.
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn url_for(&self, key: &str) -> String {
        blob_url(&self.public_url, &self.bucket, key)
    }

    fn provision(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move { Ok(()) })
    }

    fn put(
        &self,
        key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let mut blobs = self.blobs.write().await;
            blobs.insert(key.clone(), data);
            Ok(self.url_for(&key))
        })
    }

    fn get(&self, key: &str) -> Pin<Box<dyn Future<Output = anyhow::Result<Bytes>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let blobs = self.blobs.read().await;
            blobs
                .get(&key)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("blob not found at key: {key}"))
        })
    }

    fn delete(&self, key: &str) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let mut blobs = self.blobs.write().await;
            // Absent keys are a success so retries converge.
            blobs.remove(&key);
            Ok(())
        })
    }
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> MemoryBlobStore {
        MemoryBlobStore::new(
            "curio-objects".to_string(),
            "http://localhost:9000".to_string(),
        )
    }

    #[tokio::test]
    async fn test_put_and_get_roundtrip() {
        let store = test_store();
        let data = Bytes::from_static(b"png bytes");

        let url = store
            .put("objects/b.png", data.clone(), "image/png")
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:9000/curio-objects/objects/b.png");
        assert_eq!(store.get("objects/b.png").await.unwrap(), data);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_error() {
        let store = test_store();
        assert!(store.get("objects/nope.png").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = test_store();
        store
            .put("objects/b.png", Bytes::from_static(b"x"), "image/png")
            .await
            .unwrap();

        store.delete("objects/b.png").await.unwrap();
        store.delete("objects/b.png").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = test_store();
        store
            .put("objects/b.png", Bytes::from_static(b"v1"), "image/png")
            .await
            .unwrap();
        store
            .put("objects/b.png", Bytes::from_static(b"v2"), "image/png")
            .await
            .unwrap();
        assert_eq!(
            store.get("objects/b.png").await.unwrap(),
            Bytes::from_static(b"v2")
        );
    }
}
