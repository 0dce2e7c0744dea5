// User Analytics Core
//
// Turns resource lifecycle notifications (ADDED / DELETED) into canonical
// analytics events and computes the key used to suppress duplicate delivery.
//
// Key design decisions:
// - Construction is synchronous, all-or-nothing and free of I/O
// - Kinds are resolved through the TypeResolver capability (KindRegistry by default)
// - Delivery state on the record is only written by the delivery layer
// - The identity key format is versioned (IDENTITY_FORMAT_VERSION)

pub mod error;
pub mod event;
pub mod kinds;
pub mod resource;

// Re-exports for convenience
pub use error::{AnalyticsError, Result};
pub use event::{AnalyticsEvent, ResourceNotification, WatchEventType, IDENTITY_FORMAT_VERSION};
pub use kinds::{KindRegistry, KindRegistryBuilder, TypeResolver};
pub use resource::{
    DynamicObject, GroupVersionKind, Namespace, ObjectMeta, Pod, ReplicationController, Resource,
    Secret, Service,
};
