//! In-memory metadata store.
//!
//! Stores records in insertion order with no persistence.  Useful for
//! testing and ephemeral deployments.  Uses `RwLock<Vec>` for
//! thread-safe access; the vector order doubles as the tie-break for
//! listings.

use std::future::Future;
use std::pin::Pin;
use std::sync::RwLock;

use chrono::Utc;
use uuid::Uuid;

use super::store::{MetadataStore, NewObjectRecord, ObjectRecord};

#[derive(Default)]
pub struct MemoryMetadataStore {
    records: RwLock<Vec<ObjectRecord>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn insert(
        &self,
        record: NewObjectRecord,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ObjectRecord>> + Send + '_>> {
        Box::pin(async move {
            let persisted = ObjectRecord {
                id: Uuid::new_v4(),
                title: record.title,
                description: record.description,
                image_url: record.image_url,
                created_at: Utc::now(),
            };
            let mut records = self.records.write().expect("rwlock poisoned");
            records.push(persisted.clone());
            Ok(persisted)
        })
    }

    fn find_by_id(
        &self,
        id: Uuid,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<ObjectRecord>>> + Send + '_>> {
        Box::pin(async move {
            let records = self.records.read().expect("rwlock poisoned");
            Ok(records.iter().find(|r| r.id == id).cloned())
        })
    }

    fn list_by_created_desc(
        &self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<ObjectRecord>>> + Send + '_>> {
        Box::pin(async move {
            let records = self.records.read().expect("rwlock poisoned");
            let mut listed = records.clone();
            // Stable sort keeps insertion order within a created_at tie.
            listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(listed)
        })
    }

    fn delete_by_id(
        &self,
        id: Uuid,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + '_>> {
        Box::pin(async move {
            let mut records = self.records.write().expect("rwlock poisoned");
            let before = records.len();
            records.retain(|r| r.id != id);
            Ok(records.len() < before)
        })
    }
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn new_record(title: &str) -> NewObjectRecord {
        NewObjectRecord {
            title: title.to_string(),
            description: format!("{title} description"),
            image_url: format!("http://localhost:9000/curio-objects/objects/{title}.png"),
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_roundtrip() {
        let store = MemoryMetadataStore::new();
        let record = store.insert(new_record("lamp")).await.unwrap();
        let found = store.find_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(found, record);
    }

    #[tokio::test]
    async fn test_list_orders_newest_first() {
        let store = MemoryMetadataStore::new();
        let mut ids = Vec::new();
        for title in ["a", "b", "c"] {
            ids.push(store.insert(new_record(title)).await.unwrap().id);
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let listed = store.list_by_created_desc().await.unwrap();
        let listed_ids: Vec<Uuid> = listed.iter().map(|r| r.id).collect();
        ids.reverse();
        assert_eq!(listed_ids, ids);
    }

    #[tokio::test]
    async fn test_delete_converges() {
        let store = MemoryMetadataStore::new();
        let record = store.insert(new_record("lamp")).await.unwrap();
        assert!(store.delete_by_id(record.id).await.unwrap());
        assert!(!store.delete_by_id(record.id).await.unwrap());
        assert!(store.find_by_id(record.id).await.unwrap().is_none());
    }
}
