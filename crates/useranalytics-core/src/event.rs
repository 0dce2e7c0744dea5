// Analytics event record
//
// AnalyticsEvent is the canonical, delivery-ready form of a lifecycle
// notification. It is built once per notification by `from_notification`;
// afterwards only the delivery-state fields (destination, sent_time,
// error_message) change, and those are owned by the delivery layer.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AnalyticsError, Result};
use crate::kinds::TypeResolver;
use crate::resource::Resource;

/// Version of the `identity` key format.
///
/// Field order and delimiter decide which historical events compare equal.
/// Bump this whenever either changes.
pub const IDENTITY_FORMAT_VERSION: u32 = 1;

const IDENTITY_DELIMITER: &str = ",";

// ============================================================================
// WatchEventType / ResourceNotification
// ============================================================================

/// Lifecycle kind of a watch notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WatchEventType {
    Added,
    Modified,
    Deleted,
    Bookmark,
    Error,
}

impl WatchEventType {
    /// Wire name of the event type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "ADDED",
            Self::Modified => "MODIFIED",
            Self::Deleted => "DELETED",
            Self::Bookmark => "BOOKMARK",
            Self::Error => "ERROR",
        }
    }

    /// Lower-case verb used in event names (`added`, `deleted`, ...)
    pub fn verb(&self) -> String {
        self.as_str().to_lowercase()
    }
}

impl fmt::Display for WatchEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resource lifecycle notification as delivered by a watch feed
#[derive(Clone)]
pub struct ResourceNotification {
    pub event_type: WatchEventType,
    pub object: Arc<dyn Resource>,
}

impl ResourceNotification {
    pub fn new(event_type: WatchEventType, object: impl Resource) -> Self {
        Self {
            event_type,
            object: Arc::new(object),
        }
    }

    pub fn added(object: impl Resource) -> Self {
        Self::new(WatchEventType::Added, object)
    }

    pub fn deleted(object: impl Resource) -> Self {
        Self::new(WatchEventType::Deleted, object)
    }
}

impl fmt::Debug for ResourceNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceNotification")
            .field("event_type", &self.event_type)
            .field("object", &self.object.resource_type_name())
            .finish()
    }
}

// ============================================================================
// AnalyticsEvent
// ============================================================================

/// Canonical analytics event for one observed notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    /// Account the action is attributed to; filled in by callers
    /// with authorization context
    pub actor_id: String,
    /// `{kind}_{verb}`, e.g. `pod_added`
    pub event_name: String,
    /// Lower-case kind, e.g. `pod`
    pub object_kind: String,
    pub object_name: String,
    pub object_uid: String,
    pub object_namespace: String,
    /// Instance id of the emitting controller, to spot duplicates across restarts
    pub controller_id: String,
    pub cluster_name: String,
    pub properties: HashMap<String, String>,
    pub annotations: HashMap<String, String>,
    /// When the lifecycle event happened
    pub timestamp: DateTime<Utc>,
    /// Delivery sink this copy of the event targets
    pub destination: String,
    pub sent_time: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl AnalyticsEvent {
    /// Build an event from a notification
    pub fn from_notification(
        resolver: &dyn TypeResolver,
        notification: &ResourceNotification,
    ) -> Result<Self> {
        Self::from_resource(
            resolver,
            notification.object.as_ref(),
            notification.event_type,
        )
    }

    /// Build an event for `object` observed with `event_type`.
    ///
    /// The timestamp is the creation time for ADDED and the deletion time for
    /// DELETED. A DELETED object without a deletion timestamp gets the
    /// observation time: the feed will not redeliver the deletion, so this is
    /// the only chance to record it.
    pub fn from_resource(
        resolver: &dyn TypeResolver,
        object: &dyn Resource,
        event_type: WatchEventType,
    ) -> Result<Self> {
        let meta = object.metadata().ok_or_else(|| {
            AnalyticsError::metadata_access(format!(
                "unable to access object metadata for {}",
                object.resource_type_name()
            ))
        })?;

        let created_at = meta.creation_timestamp.ok_or_else(|| {
            AnalyticsError::metadata_access(format!(
                "object {}/{} has no creation timestamp",
                meta.namespace, meta.name
            ))
        })?;

        let kinds = resolver.object_kinds(object)?;
        let kind = kinds
            .first()
            .filter(|gvk| !gvk.kind.is_empty())
            .ok_or_else(|| {
                AnalyticsError::type_resolution(format!(
                    "no kind resolved for {}",
                    object.resource_type_name()
                ))
            })?;

        let timestamp = match event_type {
            WatchEventType::Added => created_at,
            WatchEventType::Deleted => match meta.deletion_timestamp {
                Some(deleted_at) => deleted_at,
                None => {
                    debug!(
                        name = %meta.name,
                        namespace = %meta.namespace,
                        "Deleted object has no deletion timestamp, using observation time"
                    );
                    Utc::now()
                }
            },
            other => return Err(AnalyticsError::unknown_event_kind(other.as_str())),
        };

        let object_kind = kind.kind.to_lowercase();
        let event_name = format!("{}_{}", object_kind, event_type.verb());

        Ok(Self {
            actor_id: String::new(),
            event_name,
            object_kind,
            object_name: meta.name.clone(),
            object_uid: meta.uid.clone(),
            object_namespace: meta.namespace.clone(),
            controller_id: String::new(),
            cluster_name: String::new(),
            properties: HashMap::new(),
            annotations: meta.annotations.clone(),
            timestamp,
            destination: String::new(),
            sent_time: None,
            error_message: None,
        })
    }

    /// Dedup key for this event.
    ///
    /// Covers actor, event name, kind, name, namespace and destination only.
    /// Two notifications that differ just in uid, timestamp or controller
    /// instance produce the same key.
    pub fn identity(&self) -> String {
        [
            self.actor_id.as_str(),
            self.event_name.as_str(),
            self.object_kind.as_str(),
            self.object_name.as_str(),
            self.object_namespace.as_str(),
            self.destination.as_str(),
        ]
        .join(IDENTITY_DELIMITER)
    }

    /// Attribute the event to an actor
    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = actor_id.into();
        self
    }

    /// Record the originating cluster and controller instance
    pub fn with_origin(
        mut self,
        cluster_name: impl Into<String>,
        controller_id: impl Into<String>,
    ) -> Self {
        self.cluster_name = cluster_name.into();
        self.controller_id = controller_id.into();
        self
    }

    /// Add a structured property
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Copy of this event targeting `destination`, with fresh delivery state
    pub fn for_destination(&self, destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            sent_time: None,
            error_message: None,
            ..self.clone()
        }
    }

    /// Record a successful delivery
    pub fn mark_sent(&mut self, at: DateTime<Utc>) {
        self.sent_time = Some(at);
        self.error_message = None;
    }

    /// Record a failed delivery
    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.sent_time = None;
        self.error_message = Some(message.into());
    }

    /// Check if the event was delivered
    pub fn is_sent(&self) -> bool {
        self.sent_time.is_some()
    }
}
