// Resource model
//
// The objects carried by lifecycle notifications. Every resource exposes its
// ObjectMeta through the `Resource` trait, which is the metadata accessor used
// by the event constructor. Typed variants (Pod, Secret, ...) have a static
// type identifier that a KindRegistry maps to kinds; DynamicObject carries its
// kind inline, the way untyped JSON objects from a watch feed do.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// ObjectMeta / GroupVersionKind
// ============================================================================

/// Identity and lifecycle metadata shared by all resources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    /// Unset only on objects that were never persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<DateTime<Utc>>,
}

impl ObjectMeta {
    /// Create metadata for a live object (no deletion timestamp)
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        uid: impl Into<String>,
        creation_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            uid: uid.into(),
            annotations: HashMap::new(),
            creation_timestamp: Some(creation_timestamp),
            deletion_timestamp: None,
        }
    }

    /// Add an annotation
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Set the deletion timestamp
    pub fn with_deletion_timestamp(mut self, deleted_at: DateTime<Utc>) -> Self {
        self.deletion_timestamp = Some(deleted_at);
        self
    }
}

/// A fully qualified resource kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupVersionKind {
    /// API group; empty for the core group
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl GroupVersionKind {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Kind in the core ("") group at version v1
    pub fn core_v1(kind: impl Into<String>) -> Self {
        Self::new("", "v1", kind)
    }

    /// Build from an `apiVersion` string (`v1` or `apps/v1`) and a kind
    pub fn from_api_version(api_version: &str, kind: impl Into<String>) -> Self {
        match api_version.split_once('/') {
            Some((group, version)) => Self::new(group, version, kind),
            None => Self::new("", api_version, kind),
        }
    }

    /// The `apiVersion` string for this kind
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}

// ============================================================================
// Resource trait
// ============================================================================

/// A managed resource that can appear in a lifecycle notification.
///
/// `metadata` is the metadata accessor: returning `None` means the object
/// does not expose identity metadata and no event can be built from it.
///
/// `resource_type` is the static type identifier a `KindRegistry` is keyed
/// by. Implementors should not override it.
pub trait Resource: Send + Sync + 'static {
    /// Object metadata, if the object exposes it
    fn metadata(&self) -> Option<&ObjectMeta>;

    /// Kind carried by the object itself, for self-describing objects
    fn declared_kind(&self) -> Option<GroupVersionKind> {
        None
    }

    /// Static type identifier of the concrete resource type
    fn resource_type(&self) -> TypeId {
        TypeId::of::<Self>()
    }

    /// Rust type name of the concrete resource type (for error messages)
    fn resource_type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

// ============================================================================
// Typed resources
// ============================================================================

macro_rules! typed_resource {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            pub metadata: ObjectMeta,
        }

        impl $name {
            pub fn new(metadata: ObjectMeta) -> Self {
                Self { metadata }
            }
        }

        impl Resource for $name {
            fn metadata(&self) -> Option<&ObjectMeta> {
                Some(&self.metadata)
            }
        }
    };
}

typed_resource!(
    /// A pod
    Pod
);
typed_resource!(
    /// A service
    Service
);
typed_resource!(
    /// A secret. Only metadata is tracked; secret data never enters an event.
    Secret
);
typed_resource!(
    /// A replication controller
    ReplicationController
);
typed_resource!(
    /// A namespace (project)
    Namespace
);

// ============================================================================
// DynamicObject
// ============================================================================

/// An untyped object decoded from JSON.
///
/// Kind information comes from the object's own `apiVersion`/`kind` fields.
/// Metadata is optional so that malformed objects can still be decoded and
/// then rejected by the event constructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ObjectMeta>,
    #[serde(flatten)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl DynamicObject {
    /// Create a dynamic object of the given kind
    pub fn new(gvk: &GroupVersionKind, metadata: ObjectMeta) -> Self {
        Self {
            api_version: Some(gvk.api_version()),
            kind: Some(gvk.kind.clone()),
            metadata: Some(metadata),
            data: serde_json::Map::new(),
        }
    }

    /// Decode from a JSON value
    pub fn from_json(value: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}

impl Resource for DynamicObject {
    fn metadata(&self) -> Option<&ObjectMeta> {
        self.metadata.as_ref()
    }

    fn declared_kind(&self) -> Option<GroupVersionKind> {
        let kind = self.kind.as_deref().filter(|k| !k.is_empty())?;
        let api_version = self.api_version.as_deref().unwrap_or_default();
        Some(GroupVersionKind::from_api_version(api_version, kind))
    }
}
