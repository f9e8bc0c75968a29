//! Change notifier -- fan-out of object lifecycle events.
//!
//! Keeps an explicit registry of connected subscribers and pushes every
//! created/deleted event to each of them, fire-and-forget.  Events are
//! delivered at most once per connected subscriber; there is no backlog,
//! no replay, and no delivery verification.  The registry is the only
//! shared mutable state in the system and is guarded by a single
//! `RwLock` so a broadcast never iterates a set being mutated.
//!
//! Callers must broadcast only after the corresponding repository
//! operation has committed; announcing uncommitted objects is a bug.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::metadata::store::ObjectRecord;
use crate::metrics;

/// One object lifecycle event as sent to subscribers.
///
/// Serializes to `{"event": "created", "data": {...record...}}` and
/// `{"event": "deleted", "data": {"id": "..."}}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ChangeEvent {
    /// A new object was registered; carries the full record.
    Created(ObjectRecord),
    /// An object was removed; carries only its id.
    Deleted { id: Uuid },
}

/// Identifier handed out for each connected subscriber.
pub type SubscriberId = Uuid;

/// Fan-out broadcaster over an explicit subscriber registry.
///
/// Cheap to clone (inner Arc).
#[derive(Clone, Default)]
pub struct ChangeNotifier {
    subscribers: Arc<RwLock<HashMap<SubscriberId, mpsc::UnboundedSender<ChangeEvent>>>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber.  Returns its id and the receiving end
    /// of its event queue.  No past events are replayed.
    pub fn connect(&self) -> (SubscriberId, mpsc::UnboundedReceiver<ChangeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        let mut subscribers = self.subscribers.write().expect("rwlock poisoned");
        subscribers.insert(id, tx);
        metrics::gauge_subscribers(subscribers.len());
        tracing::debug!(subscriber = %id, total = subscribers.len(), "subscriber connected");
        (id, rx)
    }

    /// Deregister a subscriber.  A no-op for ids that were never
    /// registered or were already removed.
    pub fn disconnect(&self, id: SubscriberId) {
        let mut subscribers = self.subscribers.write().expect("rwlock poisoned");
        if subscribers.remove(&id).is_some() {
            tracing::debug!(subscriber = %id, total = subscribers.len(), "subscriber disconnected");
        }
        metrics::gauge_subscribers(subscribers.len());
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().expect("rwlock poisoned").len()
    }

    /// Announce a newly created object to every connected subscriber.
    pub fn broadcast_created(&self, record: &ObjectRecord) {
        self.broadcast(ChangeEvent::Created(record.clone()));
    }

    /// Announce a deleted object to every connected subscriber.
    pub fn broadcast_deleted(&self, id: Uuid) {
        self.broadcast(ChangeEvent::Deleted { id });
    }

    /// Push an event to every registered subscriber, fire-and-forget.
    /// A send to a subscriber whose receiver is gone is simply dropped;
    /// the socket task cleans the entry up on disconnect.
    fn broadcast(&self, event: ChangeEvent) {
        let subscribers = self.subscribers.read().expect("rwlock poisoned");
        for tx in subscribers.values() {
            let _ = tx.send(event.clone());
        }
        tracing::debug!(subscribers = subscribers.len(), "event broadcast");
    }
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record() -> ObjectRecord {
        ObjectRecord {
            id: Uuid::new_v4(),
            title: "Vase".to_string(),
            description: "Blue ceramic vase".to_string(),
            image_url: "http://localhost:9000/curio-objects/objects/v.jpg".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_connected_subscriber_receives_exactly_one_created() {
        let notifier = ChangeNotifier::new();
        let (_id, mut rx) = notifier.connect();

        let rec = record();
        notifier.broadcast_created(&rec);

        match rx.try_recv().unwrap() {
            ChangeEvent::Created(got) => assert_eq!(got.id, rec.id),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_late_subscriber_still_sees_pre_broadcast_event() {
        let notifier = ChangeNotifier::new();
        let rec = record();
        // Connected after the repository committed but before the
        // boundary broadcast: still receives the event, exactly once.
        let (_id, mut rx) = notifier.connect();
        notifier.broadcast_created(&rec);

        assert!(matches!(rx.try_recv().unwrap(), ChangeEvent::Created(_)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_disconnected_subscriber_receives_nothing() {
        let notifier = ChangeNotifier::new();
        let (id, mut rx) = notifier.connect();
        notifier.disconnect(id);

        notifier.broadcast_created(&record());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_all_connected_subscribers_receive_deleted() {
        let notifier = ChangeNotifier::new();
        let (_a, mut rx_a) = notifier.connect();
        let (_b, mut rx_b) = notifier.connect();
        assert_eq!(notifier.subscriber_count(), 2);

        let id = Uuid::new_v4();
        notifier.broadcast_deleted(id);

        for rx in [&mut rx_a, &mut rx_b] {
            match rx.try_recv().unwrap() {
                ChangeEvent::Deleted { id: got } => assert_eq!(got, id),
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_disconnect_unknown_id_is_noop() {
        let notifier = ChangeNotifier::new();
        notifier.disconnect(Uuid::new_v4());
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[test]
    fn test_event_wire_shape() {
        let rec = record();
        let created = serde_json::to_value(ChangeEvent::Created(rec.clone())).unwrap();
        assert_eq!(created["event"], "created");
        assert_eq!(created["data"]["title"], "Vase");
        assert!(created["data"]["imageUrl"].is_string());

        let deleted = serde_json::to_value(ChangeEvent::Deleted { id: rec.id }).unwrap();
        assert_eq!(deleted["event"], "deleted");
        assert_eq!(deleted["data"]["id"], rec.id.to_string());
    }
}
