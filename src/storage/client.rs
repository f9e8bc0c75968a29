//! Abstract blob store trait.
//!
//! Every blob backend must implement [`BlobStore`].  The trait works in
//! terms of opaque byte payloads keyed by name, so callers do not need
//! to know the underlying medium.  Errors are `anyhow::Result` at this
//! seam; the repository classifies them into the user-facing taxonomy.

use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;

/// Async blob storage contract.
pub trait BlobStore: Send + Sync + 'static {
    /// The bucket (namespace container) this store writes into.  Stored
    /// image URLs always contain `{bucket}/` and the repository relies
    /// on that prefix to recover blob keys.
    fn bucket(&self) -> &str;

    /// The publicly resolvable URL for the blob at `key`.
    fn url_for(&self, key: &str) -> String;

    /// Ensure the bucket exists and is publicly readable.  Called once at
    /// process startup, before any write.
    fn provision(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;

    /// Write `data` to `key` with the given content type, returning the
    /// blob's public URL.
    fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>>;

    /// Read the full blob at `key`.
    fn get(&self, key: &str) -> Pin<Box<dyn Future<Output = anyhow::Result<Bytes>> + Send + '_>>;

    /// Delete the blob at `key`.  Absent keys are treated as success so
    /// operator-driven retries converge.
    fn delete(&self, key: &str) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;
}

/// Join a public base URL, bucket, and key into a blob URL.
///
/// Shared by every backend so that URLs parse back identically no matter
/// where the bytes live.
pub fn blob_url(public_url: &str, bucket: &str, key: &str) -> String {
    format!("{}/{}/{}", public_url.trim_end_matches('/'), bucket, key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_url_joins_cleanly() {
        assert_eq!(
            blob_url("http://localhost:9000", "curio-objects", "objects/a.jpg"),
            "http://localhost:9000/curio-objects/objects/a.jpg"
        );
        // Trailing slash on the base does not double up.
        assert_eq!(
            blob_url("http://localhost:9000/", "curio-objects", "objects/a.jpg"),
            "http://localhost:9000/curio-objects/objects/a.jpg"
        );
    }
}
