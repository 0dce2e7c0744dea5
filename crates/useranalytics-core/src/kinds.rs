// Kind resolution
//
// The event constructor needs a resource's kind name but resources do not
// carry it themselves (except self-describing DynamicObjects). A
// `TypeResolver` supplies it. `KindRegistry` is the standard resolver: it maps
// the static type identifier of each typed resource to the kinds it is known
// by, and falls back to the object's declared kind.

use std::any::TypeId;
use std::collections::HashMap;

use crate::error::{AnalyticsError, Result};
use crate::resource::{
    GroupVersionKind, Namespace, Pod, ReplicationController, Resource, Secret, Service,
};

// ============================================================================
// TypeResolver - capability for resolving kinds
// ============================================================================

/// Resolves the kinds of a resource, most preferred first.
///
/// Implementations must be safe to share between notification workers.
pub trait TypeResolver: Send + Sync {
    /// Return the kinds for `object`. An empty list is a resolution failure.
    fn object_kinds(&self, object: &dyn Resource) -> Result<Vec<GroupVersionKind>>;
}

impl<F> TypeResolver for F
where
    F: Fn(&dyn Resource) -> Result<Vec<GroupVersionKind>> + Send + Sync,
{
    fn object_kinds(&self, object: &dyn Resource) -> Result<Vec<GroupVersionKind>> {
        self(object)
    }
}

// ============================================================================
// KindRegistry
// ============================================================================

#[derive(Debug, Clone)]
struct RegisteredType {
    type_name: &'static str,
    kinds: Vec<GroupVersionKind>,
}

/// A registry mapping resource types to their kinds.
///
/// # Example
///
/// ```
/// use useranalytics_core::kinds::{KindRegistry, TypeResolver};
/// use useranalytics_core::resource::{GroupVersionKind, ObjectMeta, Pod};
///
/// let registry = KindRegistry::builder()
///     .kind::<Pod>(GroupVersionKind::core_v1("Pod"))
///     .build();
///
/// let pod = Pod::new(ObjectMeta::new("web-1", "default", "uid-1", chrono::Utc::now()));
/// let kinds = registry.object_kinds(&pod).unwrap();
/// assert_eq!(kinds[0].kind, "Pod");
/// ```
#[derive(Debug, Default, Clone)]
pub struct KindRegistry {
    types: HashMap<TypeId, RegisteredType>,
}

impl KindRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            types: HashMap::new(),
        }
    }

    /// Create a registry with the built-in typed resources.
    ///
    /// All of them are registered in the core group at version v1.
    pub fn with_defaults() -> Self {
        KindRegistry::builder()
            .kind::<Pod>(GroupVersionKind::core_v1("Pod"))
            .kind::<Service>(GroupVersionKind::core_v1("Service"))
            .kind::<Secret>(GroupVersionKind::core_v1("Secret"))
            .kind::<ReplicationController>(GroupVersionKind::core_v1("ReplicationController"))
            .kind::<Namespace>(GroupVersionKind::core_v1("Namespace"))
            .build()
    }

    /// Register `gvk` for resource type `T`.
    ///
    /// A type may be registered several times; kinds are returned in
    /// registration order. Registering the same kind twice is a no-op.
    pub fn register<T: Resource>(&mut self, gvk: GroupVersionKind) {
        let entry = self
            .types
            .entry(TypeId::of::<T>())
            .or_insert_with(|| RegisteredType {
                type_name: std::any::type_name::<T>(),
                kinds: Vec::new(),
            });
        if !entry.kinds.contains(&gvk) {
            entry.kinds.push(gvk);
        }
    }

    /// Kinds registered for resource type `T`
    pub fn kinds_of<T: Resource>(&self) -> &[GroupVersionKind] {
        self.types
            .get(&TypeId::of::<T>())
            .map(|t| t.kinds.as_slice())
            .unwrap_or_default()
    }

    /// Check if resource type `T` is registered
    pub fn is_registered<T: Resource>(&self) -> bool {
        self.types.contains_key(&TypeId::of::<T>())
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Names of all registered types
    pub fn type_names(&self) -> Vec<&'static str> {
        self.types.values().map(|t| t.type_name).collect()
    }

    /// Create a builder for fluent registration
    pub fn builder() -> KindRegistryBuilder {
        KindRegistryBuilder::new()
    }
}

impl TypeResolver for KindRegistry {
    fn object_kinds(&self, object: &dyn Resource) -> Result<Vec<GroupVersionKind>> {
        if let Some(registered) = self.types.get(&object.resource_type()) {
            if !registered.kinds.is_empty() {
                return Ok(registered.kinds.clone());
            }
        }

        match object.declared_kind() {
            Some(gvk) if !gvk.kind.is_empty() => Ok(vec![gvk]),
            _ => Err(AnalyticsError::type_resolution(format!(
                "no kind is registered for type {}",
                object.resource_type_name()
            ))),
        }
    }
}

// ============================================================================
// KindRegistryBuilder
// ============================================================================

/// Builder for creating a KindRegistry with a fluent API
pub struct KindRegistryBuilder {
    registry: KindRegistry,
}

impl KindRegistryBuilder {
    pub fn new() -> Self {
        Self {
            registry: KindRegistry::new(),
        }
    }

    /// Register a kind for resource type `T`
    pub fn kind<T: Resource>(mut self, gvk: GroupVersionKind) -> Self {
        self.registry.register::<T>(gvk);
        self
    }

    pub fn build(self) -> KindRegistry {
        self.registry
    }
}

impl Default for KindRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
