//! Abstract metadata store trait.
//!
//! Any metadata backend must implement [`MetadataStore`].  The trait
//! uses manually desugared async methods (pinned futures) so it can be
//! used as a trait object behind `Arc<dyn MetadataStore>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use uuid::Uuid;

// ── Record types ───────────────────────────────────────────────────────────

/// The durable record describing one registered object.
///
/// `id` and `created_at` are assigned by the store at insert time and are
/// immutable afterwards; no update operation exists anywhere in the
/// system.  The struct doubles as the response projection returned by the
/// request boundary and carried in change events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRecord {
    /// Store-assigned unique identifier, never reused.
    pub id: Uuid,
    /// Caller-supplied title, non-empty.
    pub title: String,
    /// Caller-supplied description, non-empty.
    pub description: String,
    /// Resolvable locator for the associated blob, set exactly once.
    pub image_url: String,
    /// Assigned at creation; the sole ordering key for listings.
    pub created_at: DateTime<Utc>,
}

/// The caller-supplied portion of a record, before the store assigns
/// `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewObjectRecord {
    pub title: String,
    pub description: String,
    pub image_url: String,
}

// ── Trait ──────────────────────────────────────────────────────────────────

/// Async metadata store contract.
///
/// Errors are reported as `anyhow::Result` at this seam; the repository
/// classifies them into the user-facing taxonomy.
pub trait MetadataStore: Send + Sync + 'static {
    /// Insert a new record, assigning `id` and `created_at`.  Returns the
    /// persisted record.
    fn insert(
        &self,
        record: NewObjectRecord,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ObjectRecord>> + Send + '_>>;

    /// Look up a record by id.
    fn find_by_id(
        &self,
        id: Uuid,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<ObjectRecord>>> + Send + '_>>;

    /// List every record, `created_at` descending, ties broken by
    /// insertion order.
    fn list_by_created_desc(
        &self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<ObjectRecord>>> + Send + '_>>;

    /// Delete a record by id.  Returns `false` when the row had already
    /// vanished, so caller-driven retries converge.
    fn delete_by_id(
        &self,
        id: Uuid,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + '_>>;
}
