//! Local filesystem blob store.
//!
//! Blobs are stored as flat files under `{root}/{bucket}/{key}`.  The
//! configured public URL is expected to be served by whatever fronts
//! that directory (nginx, a CDN, a dev file server).
//!
//! All writes follow the temp-fsync-rename pattern.

use bytes::Bytes;
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::pin::Pin;

use super::client::{blob_url, BlobStore};

/// Stores blobs on the local filesystem.
pub struct LocalBlobStore {
    /// Root directory for all stored blobs.
    root: PathBuf,
    /// Bucket subdirectory blobs live under.
    bucket: String,
    /// Base URL under which blobs resolve publicly.
    public_url: String,
}

impl LocalBlobStore {
    /// Create a new `LocalBlobStore` rooted at `root`.
    pub fn new(
        root: impl Into<PathBuf>,
        bucket: String,
        public_url: String,
    ) -> anyhow::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            bucket,
            public_url,
        })
    }

    /// Resolve a blob key to an absolute file path.
    ///
    /// Rejects keys containing `..` components so a key can never escape
    /// the bucket directory.
    fn resolve(&self, key: &str) -> anyhow::Result<PathBuf> {
        for component in std::path::Path::new(key).components() {
            if let std::path::Component::ParentDir = component {
                anyhow::bail!("path traversal detected in blob key: {}", key);
            }
        }
        Ok(self.root.join(&self.bucket).join(key))
    }

    /// Generate a temp file path under .tmp/ for atomic writes.
    fn temp_path(&self) -> PathBuf {
        let id = uuid::Uuid::new_v4();
        self.root.join(".tmp").join(format!("tmp-{}", id))
    }
}

impl BlobStore for LocalBlobStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn url_for(&self, key: &str) -> String {
        blob_url(&self.public_url, &self.bucket, key)
    }

    fn provision(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move {
            std::fs::create_dir_all(self.root.join(&self.bucket))?;
            std::fs::create_dir_all(self.root.join(".tmp"))?;
            Ok(())
        })
    }

    fn put(
        &self,
        key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let final_path = self.resolve(&key)?;

            // Ensure parent directory exists (handles keys with '/' separators).
            if let Some(parent) = final_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            // Temp-fsync-rename.
            let tmp_path = self.temp_path();
            if let Some(parent) = tmp_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let mut file = std::fs::File::create(&tmp_path)?;
            file.write_all(&data)?;
            file.sync_all()?;

            std::fs::rename(&tmp_path, &final_path)?;

            Ok(self.url_for(&key))
        })
    }

    fn get(&self, key: &str) -> Pin<Box<dyn Future<Output = anyhow::Result<Bytes>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let path = self.resolve(&key)?;
            if !path.exists() {
                anyhow::bail!("blob not found at key: {}", key);
            }
            Ok(Bytes::from(std::fs::read(&path)?))
        })
    }

    fn delete(&self, key: &str) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let path = self.resolve(&key)?;
            match std::fs::remove_file(&path) {
                Ok(()) => Ok(()),
                // Absent keys are a success so retries converge.
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(err.into()),
            }
        })
    }
}

// -- Tests --------------------------------------------------------------------
