// Error types for event construction

use thiserror::Error;

/// Result type alias for event construction
pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Errors that can occur while turning a notification into an event.
///
/// Construction is all-or-nothing: any of these means no record was produced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    /// The object does not expose name/namespace/uid/annotation metadata
    #[error("Metadata access error: {0}")]
    MetadataAccess(String),

    /// The object's kind could not be determined
    #[error("Type resolution error: {0}")]
    TypeResolution(String),

    /// The watch event type is neither ADDED nor DELETED
    #[error("Unknown event kind: {0}")]
    UnknownEventKind(String),
}

impl AnalyticsError {
    /// Create a metadata access error
    pub fn metadata_access(msg: impl Into<String>) -> Self {
        AnalyticsError::MetadataAccess(msg.into())
    }

    /// Create a type resolution error
    pub fn type_resolution(msg: impl Into<String>) -> Self {
        AnalyticsError::TypeResolution(msg.into())
    }

    /// Create an unknown event kind error
    pub fn unknown_event_kind(kind: impl Into<String>) -> Self {
        AnalyticsError::UnknownEventKind(kind.into())
    }
}
