// Analytics Delivery for User Analytics
//
// This crate is the delivery layer for events built by useranalytics-core.
// Key design decisions:
// - Supports multiple destinations via the Destination trait
// - Deduplicates by AnalyticsEvent::identity, per destination, via a DedupStore
// - Records sent_time / error_message on the stored copy; never retries
// - Configuration comes from environment variables (AnalyticsConfig::from_env)

pub mod config;
pub mod dedup;
pub mod destination;
pub mod dispatcher;
pub mod webhook;

// Re-exports
pub use config::{AnalyticsConfig, WebhookConfig};
pub use dedup::{DedupStore, InMemoryDedupStore};
pub use destination::{DeliveryError, Destination, InMemoryDestination, NoopDestination};
pub use dispatcher::{AnalyticsDispatcher, DeliveryOutcome};
pub use webhook::WebhookDestination;
