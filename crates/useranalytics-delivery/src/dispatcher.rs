// Analytics Dispatcher
//
// Fans analytics events out to the configured destinations. Each destination
// gets its own copy of the event, keyed by identity against the dedup store.
// The identity is claimed before sending, so an identity that was already
// attempted (or is in flight on another worker) is skipped. The outcome of the
// single attempt is written back onto the copy and stored. Failures are
// logged, never retried.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, warn};
use useranalytics_core::{AnalyticsError, AnalyticsEvent, ResourceNotification, TypeResolver};

use crate::config::AnalyticsConfig;
use crate::dedup::{DedupStore, InMemoryDedupStore};
use crate::destination::Destination;

/// Result of handing one event to one destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Delivered on this call
    Sent { destination: String, identity: String },
    /// Already attempted, or in flight on another call; not sent again
    Duplicate { destination: String, identity: String },
    /// Attempted on this call and failed
    Failed {
        destination: String,
        identity: String,
        error: String,
    },
}

impl DeliveryOutcome {
    pub fn destination(&self) -> &str {
        match self {
            Self::Sent { destination, .. } => destination,
            Self::Duplicate { destination, .. } => destination,
            Self::Failed { destination, .. } => destination,
        }
    }

    pub fn identity(&self) -> &str {
        match self {
            Self::Sent { identity, .. } => identity,
            Self::Duplicate { identity, .. } => identity,
            Self::Failed { identity, .. } => identity,
        }
    }
}

/// Fans analytics events out to destinations with dedup
pub struct AnalyticsDispatcher {
    config: AnalyticsConfig,
    destinations: Vec<Arc<dyn Destination>>,
    store: Arc<dyn DedupStore>,
    /// Annotation holding the actor for events that have none
    actor_annotation: Option<String>,
}

impl AnalyticsDispatcher {
    /// Create a dispatcher with an in-memory dedup store
    pub fn new(config: AnalyticsConfig, destinations: Vec<Arc<dyn Destination>>) -> Self {
        Self::with_store(config, destinations, Arc::new(InMemoryDedupStore::new()))
    }

    /// Create a dispatcher backed by `store`
    pub fn with_store(
        config: AnalyticsConfig,
        destinations: Vec<Arc<dyn Destination>>,
        store: Arc<dyn DedupStore>,
    ) -> Self {
        Self {
            config,
            destinations,
            store,
            actor_annotation: None,
        }
    }

    /// Attribute events without an actor to the value of `annotation`
    pub fn with_actor_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.actor_annotation = Some(annotation.into());
        self
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn DedupStore> {
        &self.store
    }

    /// Build an event from `notification` and dispatch it.
    ///
    /// Construction errors are logged and returned; nothing is sent.
    pub async fn handle(
        &self,
        resolver: &dyn TypeResolver,
        notification: &ResourceNotification,
    ) -> Result<Vec<DeliveryOutcome>, AnalyticsError> {
        let event = AnalyticsEvent::from_notification(resolver, notification).map_err(|e| {
            warn!(
                event_type = %notification.event_type,
                object = notification.object.resource_type_name(),
                error = %e,
                "Failed to build analytics event"
            );
            e
        })?;

        Ok(self.dispatch(event).await)
    }

    /// Deliver `event` to every enabled destination at most once
    pub async fn dispatch(&self, event: AnalyticsEvent) -> Vec<DeliveryOutcome> {
        if !self.config.enabled {
            return vec![];
        }

        let event = self.enrich(event);
        let mut outcomes = Vec::with_capacity(self.destinations.len());

        for destination in &self.destinations {
            if !destination.is_enabled() {
                continue;
            }

            let mut targeted = event.for_destination(destination.name());
            let identity = targeted.identity();

            if !self.store.claim(&targeted).await {
                debug!(
                    destination = destination.name(),
                    identity = %identity,
                    "Skipping duplicate analytics event"
                );
                outcomes.push(DeliveryOutcome::Duplicate {
                    destination: destination.name().to_string(),
                    identity,
                });
                continue;
            }

            match destination.send(&targeted).await {
                Ok(()) => {
                    targeted.mark_sent(Utc::now());
                    outcomes.push(DeliveryOutcome::Sent {
                        destination: destination.name().to_string(),
                        identity,
                    });
                }
                Err(e) => {
                    warn!(
                        destination = destination.name(),
                        event_name = %targeted.event_name,
                        error = %e,
                        "Failed to deliver analytics event"
                    );
                    targeted.mark_failed(e.to_string());
                    outcomes.push(DeliveryOutcome::Failed {
                        destination: destination.name().to_string(),
                        identity,
                        error: e.to_string(),
                    });
                }
            }

            self.store.put(targeted).await;
        }

        outcomes
    }

    /// Flush all destinations
    pub async fn flush(&self) {
        for destination in &self.destinations {
            if let Err(e) = destination.flush().await {
                error!(destination = destination.name(), error = %e, "Failed to flush destination");
            }
        }
    }

    /// Fill origin and actor fields the constructor leaves empty
    fn enrich(&self, mut event: AnalyticsEvent) -> AnalyticsEvent {
        if event.cluster_name.is_empty() {
            event.cluster_name = self.config.cluster_name.clone();
        }
        if event.controller_id.is_empty() {
            event.controller_id = self.config.controller_id.clone();
        }
        if event.actor_id.is_empty() {
            let actor = self
                .actor_annotation
                .as_ref()
                .and_then(|key| event.annotations.get(key))
                .cloned();
            if let Some(actor) = actor {
                event.actor_id = actor;
            }
        }
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::{InMemoryDestination, NoopDestination};
    use useranalytics_core::{KindRegistry, ObjectMeta, Pod, WatchEventType};

    fn pod_event() -> AnalyticsEvent {
        let pod = Pod::new(
            ObjectMeta::new("web-1", "default", "uid-1", Utc::now())
                .with_annotation("openshift.io/requester", "alice"),
        );
        AnalyticsEvent::from_resource(&KindRegistry::with_defaults(), &pod, WatchEventType::Added)
            .unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_stamps_origin() {
        let local = InMemoryDestination::new("local");
        let dispatcher = AnalyticsDispatcher::new(
            AnalyticsConfig::new("cluster-a", "controller-1"),
            vec![Arc::new(local.clone())],
        );

        let outcomes = dispatcher.dispatch(pod_event()).await;
        assert!(matches!(outcomes[0], DeliveryOutcome::Sent { .. }));

        let delivered = local.events().await;
        assert_eq!(delivered[0].cluster_name, "cluster-a");
        assert_eq!(delivered[0].controller_id, "controller-1");
        assert_eq!(delivered[0].destination, "local");
        assert!(delivered[0].actor_id.is_empty());
    }

    #[tokio::test]
    async fn test_existing_origin_is_kept() {
        let local = InMemoryDestination::new("local");
        let dispatcher = AnalyticsDispatcher::new(
            AnalyticsConfig::new("cluster-a", "controller-1"),
            vec![Arc::new(local.clone())],
        );

        dispatcher
            .dispatch(pod_event().with_origin("cluster-b", "controller-9"))
            .await;

        let delivered = local.events().await;
        assert_eq!(delivered[0].cluster_name, "cluster-b");
        assert_eq!(delivered[0].controller_id, "controller-9");
    }

    #[tokio::test]
    async fn test_actor_from_annotation() {
        let local = InMemoryDestination::new("local");
        let dispatcher = AnalyticsDispatcher::new(
            AnalyticsConfig::new("cluster-a", "controller-1"),
            vec![Arc::new(local.clone())],
        )
        .with_actor_annotation("openshift.io/requester");

        let outcomes = dispatcher.dispatch(pod_event()).await;
        assert_eq!(
            outcomes[0].identity(),
            "alice,pod_added,pod,web-1,default,local"
        );
        assert_eq!(local.events().await[0].actor_id, "alice");

        // An explicit actor wins over the annotation
        dispatcher.dispatch(pod_event().with_actor("bob")).await;
        assert_eq!(local.events().await[1].actor_id, "bob");
    }

    #[tokio::test]
    async fn test_disabled_dispatcher_sends_nothing() {
        let local = InMemoryDestination::new("local");
        let mut config = AnalyticsConfig::new("cluster-a", "controller-1");
        config.enabled = false;
        let dispatcher = AnalyticsDispatcher::new(config, vec![Arc::new(local.clone())]);

        assert!(dispatcher.dispatch(pod_event()).await.is_empty());
        assert_eq!(local.count().await, 0);
    }

    #[tokio::test]
    async fn test_disabled_destination_is_skipped() {
        let local = InMemoryDestination::new("local");
        let destinations: Vec<Arc<dyn Destination>> =
            vec![Arc::new(NoopDestination), Arc::new(local.clone())];
        let dispatcher =
            AnalyticsDispatcher::new(AnalyticsConfig::new("cluster-a", "controller-1"), destinations);

        let outcomes = dispatcher.dispatch(pod_event()).await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].destination(), "local");
    }
}
