use crate::instance::Instance;
use crate::registry::{Registry, ScopeCache};
use rigger_core::{Error, Result};
use std::any::{type_name, Any};
use std::sync::Arc;

/// A child view of a [`Registry`] that caches `scoped` instances separately.
///
/// Singletons and descriptors are shared with the parent; dropping the scope
/// drops the instances it cached.
#[derive(Debug, Clone)]
pub struct ScopedRegistry {
    registry: Registry,
    cache: Arc<ScopeCache>,
}

impl ScopedRegistry {
    pub(crate) fn new(registry: Registry) -> Self {
        Self {
            registry,
            cache: Arc::new(ScopeCache::new()),
        }
    }

    /// The registry this scope was created from
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub async fn resolve<T: Any + Clone + Send + Sync>(&self, key: &str) -> Result<T> {
        let instance = self.resolve_instance(key).await?;
        instance.get::<T>().ok_or_else(|| mismatch::<T>(key, &instance))
    }

    pub async fn resolve_instance(&self, key: &str) -> Result<Instance> {
        self.registry.resolve_in(key, Some(&self.cache)).await
    }

    pub fn resolve_sync<T: Any + Clone>(&self, key: &str) -> Result<T> {
        let instance = self.registry.resolve_sync_in(key, Some(&self.cache))?;
        instance.get::<T>().ok_or_else(|| mismatch::<T>(key, &instance))
    }

    /// Number of scoped instances cached so far
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

fn mismatch<T>(key: &str, instance: &Instance) -> Error {
    Error::resolution(
        key,
        format!(
            "resolved a {} but a {} was requested",
            instance.type_name(),
            type_name::<T>()
        ),
    )
}
