// Dedup Store
//
// Remembers every delivery attempt keyed by AnalyticsEvent::identity so the
// dispatcher can tell whether an event was already sent, already failed, or
// is being sent right now, for a given actor and destination.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use useranalytics_core::AnalyticsEvent;

/// Storage for attempted deliveries
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Look up the last recorded attempt for `identity`
    async fn get(&self, identity: &str) -> Option<AnalyticsEvent>;

    /// Reserve the event's identity for a delivery attempt.
    ///
    /// Stores `event` as a pending attempt if nothing is recorded under its
    /// identity and returns true; returns false if the identity was already
    /// claimed. Check and insert must be atomic.
    async fn claim(&self, event: &AnalyticsEvent) -> bool;

    /// Record the outcome of an attempt, keyed by the event's identity
    async fn put(&self, event: AnalyticsEvent);

    /// Check if an attempt was recorded for `identity`
    async fn contains(&self, identity: &str) -> bool {
        self.get(identity).await.is_some()
    }
}

/// In-memory dedup store
#[derive(Debug, Default, Clone)]
pub struct InMemoryDedupStore {
    attempts: Arc<RwLock<HashMap<String, AnalyticsEvent>>>,
}

impl InMemoryDedupStore {
    pub fn new() -> Self {
        Self {
            attempts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of recorded attempts
    pub async fn len(&self) -> usize {
        self.attempts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.attempts.read().await.is_empty()
    }

    /// Attempts that were delivered
    pub async fn sent(&self) -> Vec<AnalyticsEvent> {
        self.attempts
            .read()
            .await
            .values()
            .filter(|e| e.is_sent())
            .cloned()
            .collect()
    }

    /// Attempts that failed
    pub async fn failed(&self) -> Vec<AnalyticsEvent> {
        self.attempts
            .read()
            .await
            .values()
            .filter(|e| e.error_message.is_some())
            .cloned()
            .collect()
    }

    /// Attempts claimed but not yet resolved
    pub async fn pending(&self) -> Vec<AnalyticsEvent> {
        self.attempts
            .read()
            .await
            .values()
            .filter(|e| !e.is_sent() && e.error_message.is_none())
            .cloned()
            .collect()
    }

    /// Forget all attempts
    pub async fn clear(&self) {
        self.attempts.write().await.clear();
    }
}

#[async_trait]
impl DedupStore for InMemoryDedupStore {
    async fn get(&self, identity: &str) -> Option<AnalyticsEvent> {
        self.attempts.read().await.get(identity).cloned()
    }

    async fn claim(&self, event: &AnalyticsEvent) -> bool {
        match self.attempts.write().await.entry(event.identity()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                let mut pending = event.clone();
                pending.sent_time = None;
                pending.error_message = None;
                slot.insert(pending);
                true
            }
        }
    }

    async fn put(&self, event: AnalyticsEvent) {
        self.attempts.write().await.insert(event.identity(), event);
    }

    async fn contains(&self, identity: &str) -> bool {
        self.attempts.read().await.contains_key(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use useranalytics_core::{KindRegistry, ObjectMeta, Pod, WatchEventType};

    fn event(name: &str) -> AnalyticsEvent {
        let pod = Pod::new(ObjectMeta::new(name, "default", "uid", Utc::now()));
        AnalyticsEvent::from_resource(&KindRegistry::with_defaults(), &pod, WatchEventType::Added)
            .unwrap()
            .for_destination("local")
    }

    #[tokio::test]
    async fn test_put_and_get_by_identity() {
        let store = InMemoryDedupStore::new();
        assert!(store.is_empty().await);

        let mut sent = event("web-1");
        sent.mark_sent(Utc::now());
        let key = sent.identity();
        store.put(sent).await;

        assert!(store.contains(&key).await);
        assert!(store.get(&key).await.unwrap().is_sent());
        assert!(!store.contains(&event("web-2").identity()).await);
    }

    #[tokio::test]
    async fn test_sent_and_failed_views() {
        let store = InMemoryDedupStore::new();

        let mut ok = event("web-1");
        ok.mark_sent(Utc::now());
        let mut bad = event("web-2");
        bad.mark_failed("timeout");

        store.put(ok).await;
        store.put(bad).await;

        assert_eq!(store.len().await, 2);
        assert_eq!(store.sent().await[0].object_name, "web-1");
        assert_eq!(store.failed().await[0].object_name, "web-2");

        store.clear().await;
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_claim_is_first_wins() {
        let store = InMemoryDedupStore::new();
        let event = event("web-1");

        assert!(store.claim(&event).await);
        assert!(!store.claim(&event).await);
        assert_eq!(store.pending().await.len(), 1);
        assert!(store.sent().await.is_empty());

        let mut done = event.clone();
        done.mark_sent(Utc::now());
        store.put(done).await;
        assert!(store.pending().await.is_empty());
        assert!(!store.claim(&event).await);
    }

    #[tokio::test]
    async fn test_concurrent_claims_admit_one() {
        let store = Arc::new(InMemoryDedupStore::new());
        let event = event("web-1");

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                let event = event.clone();
                tokio::spawn(async move { store.claim(&event).await })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_later_attempt_replaces_earlier() {
        let store = InMemoryDedupStore::new();
        let mut first = event("web-1");
        first.mark_failed("timeout");
        let key = first.identity();
        store.put(first).await;

        let mut second = event("web-1");
        second.mark_sent(Utc::now());
        store.put(second).await;

        assert_eq!(store.len().await, 1);
        assert!(store.get(&key).await.unwrap().is_sent());
    }
}
