// Destination Trait
//
// Defines the interface for analytics destinations (webhook, in-memory, ...).
// A destination receives one event at a time, already targeted at it, and
// either accepts it or reports why not. Retrying is not a destination concern.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use useranalytics_core::AnalyticsEvent;

/// Trait for analytics destinations
#[async_trait]
pub trait Destination: Send + Sync {
    /// Name of this destination; becomes `AnalyticsEvent::destination`
    fn name(&self) -> &str;

    /// Check if the destination is enabled/configured
    fn is_enabled(&self) -> bool;

    /// Deliver a single event
    async fn send(&self, event: &AnalyticsEvent) -> Result<(), DeliveryError>;

    /// Flush any buffered events (called on shutdown)
    async fn flush(&self) -> Result<(), DeliveryError> {
        Ok(())
    }
}

/// Errors that can occur while delivering an event
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Rejected by destination: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ============================================================================
// NoopDestination
// ============================================================================

/// A destination that accepts and drops everything; used when analytics is disabled
pub struct NoopDestination;

#[async_trait]
impl Destination for NoopDestination {
    fn name(&self) -> &str {
        "noop"
    }

    fn is_enabled(&self) -> bool {
        false
    }

    async fn send(&self, _event: &AnalyticsEvent) -> Result<(), DeliveryError> {
        Ok(())
    }
}

// ============================================================================
// InMemoryDestination
// ============================================================================

/// In-memory destination
///
/// Keeps every delivered event. Can be switched into a failing mode where each
/// send is rejected with a fixed message.
#[derive(Debug, Clone)]
pub struct InMemoryDestination {
    name: String,
    events: Arc<RwLock<Vec<AnalyticsEvent>>>,
    failure: Arc<RwLock<Option<String>>>,
}

impl InMemoryDestination {
    /// Create a new in-memory destination
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            events: Arc::new(RwLock::new(Vec::new())),
            failure: Arc::new(RwLock::new(None)),
        }
    }

    /// Create a destination that rejects every event with `message`
    pub fn failing(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            failure: Arc::new(RwLock::new(Some(message.into()))),
            ..Self::new(name)
        }
    }

    /// Start or stop rejecting events
    pub async fn set_failure(&self, message: Option<String>) {
        *self.failure.write().await = message;
    }

    /// All delivered events
    pub async fn events(&self) -> Vec<AnalyticsEvent> {
        self.events.read().await.clone()
    }

    /// Number of delivered events
    pub async fn count(&self) -> usize {
        self.events.read().await.len()
    }

    /// Clear delivered events
    pub async fn clear(&self) {
        self.events.write().await.clear();
    }
}

#[async_trait]
impl Destination for InMemoryDestination {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        true
    }

    async fn send(&self, event: &AnalyticsEvent) -> Result<(), DeliveryError> {
        if let Some(message) = self.failure.read().await.as_ref() {
            return Err(DeliveryError::Connection(message.clone()));
        }
        self.events.write().await.push(event.clone());
        Ok(())
    }
}
