//! Object repository -- the writer-of-record for object lifecycles.
//!
//! The repository is the only component that talks to both stores for a
//! single logical operation.  Ordering is deliberate and mirrored
//! between create and delete:
//!
//! - create: blob write, then metadata insert.  A failed blob write
//!   leaves nothing behind; a failed metadata insert after a successful
//!   blob write leaves an orphaned blob (logged, not compensated).
//! - delete: blob delete, then metadata delete.  A failed metadata
//!   delete after a successful blob delete leaves a dangling image URL
//!   (logged) rather than leaked storage, and the whole operation is
//!   safe for the caller to retry.
//!
//! No operation is retried or rolled back here.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::ObjectStoreError;
use crate::metadata::store::{MetadataStore, NewObjectRecord, ObjectRecord};
use crate::storage::client::BlobStore;

/// Key prefix grouping all object images inside the bucket.
pub const BLOB_NAMESPACE: &str = "objects";

/// Caller-supplied fields for a new object.
#[derive(Debug, Clone)]
pub struct NewObject {
    pub title: String,
    pub description: String,
}

/// An uploaded file as received by the request boundary.
///
/// Only the extension of `file_name` survives into storage; blob keys
/// are always freshly generated, never derived from user-supplied names.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Orchestrates the create/delete lifecycle across both stores.
#[derive(Clone)]
pub struct ObjectRepository {
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
}

impl ObjectRepository {
    pub fn new(metadata: Arc<dyn MetadataStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { metadata, blobs }
    }

    /// Generate a fresh blob key under the objects namespace, keeping
    /// the source filename's extension when it has one.
    fn blob_key(file_name: &str) -> String {
        let id = Uuid::new_v4();
        match Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
        {
            Some(ext) if !ext.is_empty() => format!("{BLOB_NAMESPACE}/{id}.{ext}"),
            _ => format!("{BLOB_NAMESPACE}/{id}"),
        }
    }

    /// Register a new object: write the blob, then insert the record.
    ///
    /// Either returns a complete persisted record or an error; no
    /// partial-success shape exists.
    pub async fn create(
        &self,
        new_object: NewObject,
        file: UploadedFile,
    ) -> Result<ObjectRecord, ObjectStoreError> {
        if new_object.title.trim().is_empty() {
            return Err(ObjectStoreError::InvalidArgument {
                message: "title must not be empty".to_string(),
            });
        }
        if new_object.description.trim().is_empty() {
            return Err(ObjectStoreError::InvalidArgument {
                message: "description must not be empty".to_string(),
            });
        }
        if file.data.is_empty() {
            return Err(ObjectStoreError::InvalidArgument {
                message: "file must not be empty".to_string(),
            });
        }

        let key = Self::blob_key(&file.file_name);

        let image_url = self
            .blobs
            .put(&key, file.data, &file.content_type)
            .await
            .map_err(|cause| ObjectStoreError::BlobWrite {
                key: key.clone(),
                cause,
            })?;

        let record = self
            .metadata
            .insert(NewObjectRecord {
                title: new_object.title,
                description: new_object.description,
                image_url,
            })
            .await
            .map_err(|cause| {
                // The blob is now orphaned; surface the key so an
                // operator or a reconciliation sweep can find it.
                warn!(blob_key = %key, "metadata insert failed after blob write; blob orphaned");
                ObjectStoreError::MetadataWrite { cause }
            })?;

        debug!(id = %record.id, blob_key = %key, "object created");
        Ok(record)
    }

    /// List every object, newest first.
    pub async fn find_all(&self) -> Result<Vec<ObjectRecord>, ObjectStoreError> {
        self.metadata
            .list_by_created_desc()
            .await
            .map_err(ObjectStoreError::Internal)
    }

    /// Look up one object by id.
    pub async fn find_one(&self, id: Uuid) -> Result<ObjectRecord, ObjectStoreError> {
        self.metadata
            .find_by_id(id)
            .await
            .map_err(ObjectStoreError::Internal)?
            .ok_or(ObjectStoreError::NotFound { id })
    }

    /// Remove an object: delete the blob, then the record.
    pub async fn delete(&self, id: Uuid) -> Result<(), ObjectStoreError> {
        let record = self.find_one(id).await?;

        let key = parse_blob_key(&record.image_url, self.blobs.bucket()).ok_or_else(|| {
            // Records created by this repository always carry the bucket
            // prefix; a mismatch is an invariant violation.
            warn!(id = %id, url = %record.image_url, "stored image URL missing bucket prefix");
            ObjectStoreError::InvalidLocator {
                url: record.image_url.clone(),
            }
        })?;

        self.blobs
            .delete(&key)
            .await
            .map_err(|cause| ObjectStoreError::BlobDelete {
                key: key.clone(),
                cause,
            })?;

        let deleted = self
            .metadata
            .delete_by_id(id)
            .await
            .map_err(|cause| {
                warn!(id = %id, "metadata delete failed after blob delete; image URL dangling");
                ObjectStoreError::MetadataDelete { id, cause }
            })?;
        if !deleted {
            // The row vanished between lookup and delete; the outcome the
            // caller asked for holds either way.
            debug!(id = %id, "metadata row already gone");
        }

        debug!(id = %id, blob_key = %key, "object deleted");
        Ok(())
    }
}

/// Recover a blob key from a stored image URL using the known bucket
/// prefix.  Returns `None` when the URL does not contain `{bucket}/`.
pub fn parse_blob_key(image_url: &str, bucket: &str) -> Option<String> {
    let marker = format!("{bucket}/");
    let (_, key) = image_url.split_once(&marker)?;
    if key.is_empty() {
        return None;
    }
    Some(key.to_string())
}

// -- Tests --------------------------------------------------------------------
