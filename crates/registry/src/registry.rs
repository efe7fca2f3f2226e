//! The dependency registry: registration, lifetimes and resolution

use crate::catalog::Catalog;
use crate::descriptor::{Descriptor, DescriptorSpecs, Lifetime, Strategy, Target};
use crate::instance::{Construction, Dependencies, Factory, Instance};
use crate::loader::{load_module, LoadedExport};
use crate::rules::{AutoRule, RuleTable};
use crate::scope::ScopedRegistry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt};
use parking_lot::RwLock;
use rigger_core::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::any::{type_name, Any};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

pub(crate) type ScopeCache = DashMap<String, Instance>;

/// Counts reported by [`Registry::stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub descriptors: usize,
    pub singletons: usize,
    pub rules: usize,
    pub auto_registrations: usize,
}

struct Inner {
    descriptors: DashMap<String, Arc<Descriptor>>,
    singletons: ScopeCache,
    rules: RwLock<RuleTable>,
    catalog: Catalog,
    auto_registrations: AtomicUsize,
}

/// Key-addressed store of descriptors that constructs instances on demand.
///
/// Cloning yields another handle to the same registry. Resolution of a key
/// checks, in order: the singleton cache, the active scope's cache, the
/// registered descriptor, then auto-registration rules.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<Inner>,
}

enum Source {
    Factory { factory: Factory, module_args: Vec<Value> },
    Value(Instance),
}

impl Registry {
    pub fn new() -> Self {
        Self::with_catalog(Catalog::new())
    }

    /// Registry whose `Export` targets are looked up in `catalog`
    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            inner: Arc::new(Inner {
                descriptors: DashMap::new(),
                singletons: DashMap::new(),
                rules: RwLock::new(RuleTable::default()),
                catalog,
                auto_registrations: AtomicUsize::new(0),
            }),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Register descriptors in order; returns the key of each
    pub fn register<I>(&self, descriptors: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = Descriptor>,
    {
        descriptors
            .into_iter()
            .map(|descriptor| self.register_one(descriptor))
            .collect()
    }

    /// Register a keyed map of descriptors; map keys fill in absent keys
    pub fn register_map<I, K>(&self, entries: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = (K, Descriptor)>,
        K: Into<String>,
    {
        entries
            .into_iter()
            .map(|(key, mut descriptor)| {
                if descriptor.key.is_none() {
                    descriptor.key = Some(key.into());
                }
                self.register_one(descriptor)
            })
            .collect()
    }

    /// Register a parsed registration document
    pub fn register_specs(&self, specs: DescriptorSpecs) -> Result<Vec<String>> {
        self.register(specs.into_descriptors()?)
    }

    pub fn register_value<T: Any + Send + Sync>(
        &self,
        key: impl Into<String>,
        value: T,
    ) -> Result<String> {
        self.register_one(Descriptor::value(key, value))
    }

    /// Register one descriptor and, depth-first, its nested dependencies.
    ///
    /// Registering a key that is already present is a no-op.
    pub fn register_one(&self, descriptor: Descriptor) -> Result<String> {
        self.insert(descriptor).map(|(key, _)| key)
    }

    fn insert(&self, descriptor: Descriptor) -> Result<(String, bool)> {
        if descriptor.strategy == Strategy::Auto {
            return self.insert_rule(descriptor);
        }

        let key = descriptor.inferred_key().ok_or_else(|| {
            Error::configuration(format!(
                "{} descriptor has no key and its target does not name one",
                descriptor.strategy
            ))
        })?;

        if self.inner.descriptors.contains_key(&key) {
            tracing::debug!(key = %key, "Already registered, skipping");
            return Ok((key, false));
        }
        if descriptor.target.is_none() {
            return Err(Error::configuration(format!(
                "descriptor '{key}' has no target"
            )));
        }

        for dependency in &descriptor.dependencies {
            self.insert(dependency.clone())?;
        }

        tracing::debug!(
            key = %key,
            strategy = %descriptor.strategy,
            lifetime = ?descriptor.lifetime,
            "Registered descriptor"
        );
        let mut inserted = false;
        self.inner
            .descriptors
            .entry(key.clone())
            .or_insert_with(|| {
                inserted = true;
                Arc::new(descriptor)
            });
        Ok((key, inserted))
    }

    fn insert_rule(&self, descriptor: Descriptor) -> Result<(String, bool)> {
        let key = descriptor
            .key
            .clone()
            .unwrap_or_else(|| format!("auto-{}", Uuid::new_v4()));

        for dependency in &descriptor.dependencies {
            self.insert(dependency.clone())?;
        }

        let rule = AutoRule::new(&key, descriptor)?;
        let pattern = rule.pattern.as_str().to_string();
        let inserted = self.inner.rules.write().push(rule);
        if inserted {
            tracing::debug!(key = %key, pattern = %pattern, "Registered auto-registration rule");
        }
        Ok((key, inserted))
    }

    /// Remove descriptors, rules and cached singletons; returns how many keys were known
    pub fn unregister<I, K>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut removed = 0;
        for key in keys {
            let key = key.as_ref();
            let had_descriptor = self.inner.descriptors.remove(key).is_some();
            self.inner.singletons.remove(key);
            let had_rule = self.inner.rules.write().remove(key);
            if had_descriptor || had_rule {
                tracing::debug!(key = %key, "Unregistered");
                removed += 1;
            }
        }
        removed
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.descriptors.contains_key(key) || self.inner.rules.read().contains(key)
    }

    pub fn descriptor(&self, key: &str) -> Option<Arc<Descriptor>> {
        self.inner
            .descriptors
            .get(key)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Every registered key, rules included, sorted
    pub fn descriptors(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .inner
            .descriptors
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        keys.extend(self.inner.rules.read().keys().map(str::to_string));
        keys.sort();
        keys.dedup();
        keys
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            descriptors: self.inner.descriptors.len(),
            singletons: self.inner.singletons.len(),
            rules: self.inner.rules.read().len(),
            auto_registrations: self.inner.auto_registrations.load(Ordering::Relaxed),
        }
    }

    /// A child view with its own cache for scoped lifetimes
    pub fn scope(&self) -> ScopedRegistry {
        ScopedRegistry::new(self.clone())
    }

    /// Resolve `key` and take the instance out as `T`
    pub async fn resolve<T: Any + Clone + Send + Sync>(&self, key: &str) -> Result<T> {
        let instance = self.resolve_instance(key).await?;
        downcast(key, &instance)
    }

    pub async fn resolve_instance(&self, key: &str) -> Result<Instance> {
        self.resolve_in(key, None).await
    }

    /// Resolve without awaiting; fails for keys that need module loading or auto-registration
    pub fn resolve_sync<T: Any + Clone>(&self, key: &str) -> Result<T> {
        let instance = self.resolve_instance_sync(key)?;
        downcast(key, &instance)
    }

    pub fn resolve_instance_sync(&self, key: &str) -> Result<Instance> {
        self.resolve_sync_in(key, None)
    }

    pub(crate) async fn resolve_in(&self, key: &str, scope: Option<&ScopeCache>) -> Result<Instance> {
        let mut stack = Vec::new();
        self.resolve_with(key, scope, &mut stack).await
    }

    pub(crate) fn resolve_sync_in(&self, key: &str, scope: Option<&ScopeCache>) -> Result<Instance> {
        let mut stack = Vec::new();
        self.resolve_sync_with(key, scope, &mut stack)
    }

    fn resolve_with<'a>(
        &'a self,
        key: &'a str,
        scope: Option<&'a ScopeCache>,
        stack: &'a mut Vec<String>,
    ) -> BoxFuture<'a, Result<Instance>> {
        async move {
            if let Some(instance) = self.cached(key, scope) {
                return Ok(instance);
            }
            check_cycle(key, stack)?;

            match self.descriptor(key) {
                Some(descriptor) => {
                    stack.push(key.to_string());
                    let built = self.construct(key, &descriptor, scope, stack).await;
                    stack.pop();
                    built.map(|instance| self.retain(key, &descriptor, instance, scope))
                }
                None => self.auto_register(key, scope, stack).await,
            }
        }
        .boxed()
    }

    fn resolve_sync_with(
        &self,
        key: &str,
        scope: Option<&ScopeCache>,
        stack: &mut Vec<String>,
    ) -> Result<Instance> {
        if let Some(instance) = self.cached(key, scope) {
            return Ok(instance);
        }
        check_cycle(key, stack)?;

        let Some(descriptor) = self.descriptor(key) else {
            if self.inner.rules.read().matching(key).is_empty() {
                return Err(not_registered(key));
            }
            return Err(Error::resolution(
                key,
                "this key needs auto-registration, which requires async resolution",
            ));
        };

        stack.push(key.to_string());
        let built = self.construct_sync(key, &descriptor, scope, stack);
        stack.pop();
        built.map(|instance| self.retain(key, &descriptor, instance, scope))
    }

    async fn construct(
        &self,
        key: &str,
        descriptor: &Descriptor,
        scope: Option<&ScopeCache>,
        stack: &mut Vec<String>,
    ) -> Result<Instance> {
        if let (Strategy::Alias, Some(Target::Key(target))) =
            (descriptor.strategy, &descriptor.target)
        {
            return self.resolve_with(target, scope, stack).await;
        }

        let source = match self.locate_static(key, descriptor)? {
            Some(source) => source,
            None => self.load(key, descriptor).await?,
        };

        let mut dependencies = Dependencies::new();
        for dependency in &descriptor.dependencies {
            let dependency_key = dependency_key(key, dependency)?;
            let instance = self
                .resolve_with(&dependency_key, scope, stack)
                .await
                .map_err(|e| dependency_error(key, &dependency_key, e))?;
            dependencies.insert(dependency_key, instance);
        }

        self.finish(key, descriptor, source, dependencies)
    }

    fn construct_sync(
        &self,
        key: &str,
        descriptor: &Descriptor,
        scope: Option<&ScopeCache>,
        stack: &mut Vec<String>,
    ) -> Result<Instance> {
        if let (Strategy::Alias, Some(Target::Key(target))) =
            (descriptor.strategy, &descriptor.target)
        {
            return self.resolve_sync_with(target, scope, stack);
        }

        let source = self.locate_static(key, descriptor)?.ok_or_else(|| {
            Error::resolution(
                key,
                format!(
                    "loading the module at {} requires async resolution",
                    descriptor.location.module_path(key).display()
                ),
            )
        })?;

        let mut dependencies = Dependencies::new();
        for dependency in &descriptor.dependencies {
            let dependency_key = dependency_key(key, dependency)?;
            let instance = self
                .resolve_sync_with(&dependency_key, scope, stack)
                .map_err(|e| dependency_error(key, &dependency_key, e))?;
            dependencies.insert(dependency_key, instance);
        }

        self.finish(key, descriptor, source, dependencies)
    }

    /// Locate the target without I/O; `None` means the module loader is needed
    fn locate_static(&self, key: &str, descriptor: &Descriptor) -> Result<Option<Source>> {
        match &descriptor.target {
            Some(Target::Instance(instance)) => Ok(Some(Source::Value(instance.clone()))),
            Some(Target::Factory(factory)) => Ok(Some(Source::Factory {
                factory: factory.clone(),
                module_args: Vec::new(),
            })),
            Some(Target::Export(_)) if descriptor.location.is_dynamic() => Ok(None),
            Some(Target::Export(name)) => self
                .inner
                .catalog
                .get(name)
                .map(|factory| {
                    Some(Source::Factory {
                        factory,
                        module_args: Vec::new(),
                    })
                })
                .ok_or_else(|| {
                    Error::resolution(key, format!("no export named '{name}' is in the catalog"))
                }),
            Some(Target::Key(_)) | None => Err(Error::configuration(format!(
                "descriptor '{key}' has no constructible target"
            ))),
        }
    }

    async fn load(&self, key: &str, descriptor: &Descriptor) -> Result<Source> {
        let export = match &descriptor.target {
            Some(Target::Export(name)) => name.as_str(),
            _ => key,
        };
        let module = load_module(export, &descriptor.location, &self.inner.catalog).await?;
        tracing::debug!(
            key = %key,
            path = %module.path.display(),
            format = %module.format,
            "Loaded module"
        );
        Ok(match module.export {
            LoadedExport::Factory(factory) => Source::Factory {
                factory,
                module_args: module.args,
            },
            LoadedExport::Value(value) => Source::Value(Instance::json(value)),
        })
    }

    fn finish(
        &self,
        key: &str,
        descriptor: &Descriptor,
        source: Source,
        dependencies: Dependencies,
    ) -> Result<Instance> {
        match (descriptor.strategy, source) {
            (Strategy::Class, Source::Factory { factory, module_args }) => {
                let args = if descriptor.args.is_empty() {
                    module_args
                } else {
                    descriptor.args.clone()
                };
                factory
                    .build(Construction {
                        key: key.to_string(),
                        args,
                        dependencies,
                    })
                    .map_err(|e| {
                        Error::resolution_with_source(
                            key,
                            format!("factory '{}' failed", factory.name()),
                            e,
                        )
                    })
            }
            (Strategy::Value | Strategy::Function, Source::Factory { factory, .. }) => {
                Ok(Instance::new(factory))
            }
            (Strategy::Class | Strategy::Value | Strategy::Function, Source::Value(instance)) => {
                Ok(instance)
            }
            (strategy @ (Strategy::Alias | Strategy::Auto), _) => Err(Error::configuration(
                format!("descriptor '{key}' cannot be constructed with the {strategy} strategy"),
            )),
        }
    }

    /// Apply the descriptor's lifetime; the first cached instance wins races
    fn retain(
        &self,
        key: &str,
        descriptor: &Descriptor,
        instance: Instance,
        scope: Option<&ScopeCache>,
    ) -> Instance {
        if descriptor.strategy == Strategy::Alias {
            return instance;
        }
        let cache = match (descriptor.lifetime, scope) {
            (Lifetime::Singleton, _) => &self.inner.singletons,
            (Lifetime::Scoped, Some(scope)) => scope,
            (Lifetime::Scoped, None) | (Lifetime::Transient, _) => return instance,
        };
        cache
            .entry(key.to_string())
            .or_insert(instance)
            .value()
            .clone()
    }

    fn cached(&self, key: &str, scope: Option<&ScopeCache>) -> Option<Instance> {
        self.inner
            .singletons
            .get(key)
            .map(|entry| entry.value().clone())
            .or_else(|| scope.and_then(|cache| cache.get(key).map(|entry| entry.value().clone())))
    }

    async fn auto_register(
        &self,
        key: &str,
        scope: Option<&ScopeCache>,
        stack: &mut Vec<String>,
    ) -> Result<Instance> {
        let candidates = self.inner.rules.read().matching(key);
        let mut last_error = None;

        for rule in candidates {
            let inserted = match self.insert(rule.synthesize(key)) {
                Ok((_, inserted)) => inserted,
                Err(error) => {
                    tracing::warn!(key = %key, rule = %rule.key, error = %error, "Auto-registration rule produced an invalid descriptor");
                    last_error = Some(error);
                    continue;
                }
            };

            match self.resolve_with(key, scope, stack).await {
                Ok(instance) => {
                    if inserted {
                        self.inner.auto_registrations.fetch_add(1, Ordering::Relaxed);
                        tracing::info!(key = %key, rule = %rule.key, "Auto-registered");
                    }
                    return Ok(instance);
                }
                Err(error) => {
                    tracing::warn!(
                        key = %key,
                        rule = %rule.key,
                        error = %error,
                        "Auto-registration failed, trying the next pattern"
                    );
                    if inserted {
                        self.unregister([key]);
                    }
                    last_error = Some(error);
                }
            }
        }

        match last_error {
            Some(error) => Err(Error::resolution_with_source(
                key,
                "no matching auto-registration pattern could construct this key",
                error,
            )),
            None => Err(not_registered(key)),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("stats", &self.stats())
            .field("catalog", &self.inner.catalog.names())
            .finish()
    }
}

fn downcast<T: Any + Clone>(key: &str, instance: &Instance) -> Result<T> {
    instance.get::<T>().ok_or_else(|| {
        Error::resolution(
            key,
            format!(
                "resolved a {} but a {} was requested",
                instance.type_name(),
                type_name::<T>()
            ),
        )
    })
}

fn check_cycle(key: &str, stack: &[String]) -> Result<()> {
    if stack.iter().any(|entry| entry == key) {
        return Err(Error::resolution(
            key,
            format!("circular dependency: {} -> {key}", stack.join(" -> ")),
        ));
    }
    Ok(())
}

fn dependency_key(owner: &str, dependency: &Descriptor) -> Result<String> {
    dependency.inferred_key().ok_or_else(|| {
        Error::configuration(format!(
            "a dependency of '{owner}' has no key and its target does not name one"
        ))
    })
}

fn dependency_error(owner: &str, dependency: &str, error: Error) -> Error {
    Error::resolution_with_source(
        owner,
        format!("dependency '{dependency}' could not be resolved"),
        error,
    )
}

fn not_registered(key: &str) -> Error {
    Error::resolution(
        key,
        "nothing is registered under this key and no auto-registration pattern matches",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_value_resolution() {
        let registry = Registry::new();
        registry.register_value("region", json!("eu-west-1")).unwrap();

        let region: Value = registry.resolve("region").await.unwrap();
        assert_eq!(region, json!("eu-west-1"));
        assert!(registry.resolve::<String>("region").await.is_err());
    }

    #[test]
    fn test_keyless_descriptor_is_rejected() {
        let registry = Registry::new();
        let descriptor = Descriptor {
            key: None,
            ..Descriptor::instance("x", Instance::new(1u8))
        };
        assert!(matches!(
            registry.register_one(descriptor),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn test_cycles_are_reported() {
        let catalog = Catalog::new()
            .with(Factory::of("A", |_: Construction| Ok(())))
            .with(Factory::of("B", |_: Construction| Ok(())));
        let registry = Registry::with_catalog(catalog);
        registry
            .register([
                Descriptor::export("A").with_dependency(Descriptor::export("B")),
                Descriptor::export("B").with_dependency(Descriptor::export("A")),
            ])
            .unwrap();

        let err = registry.resolve_instance_sync("A").unwrap_err();
        let chain = format!("{err:?}");
        assert!(chain.contains("circular dependency"), "{chain}");
    }

    #[test]
    fn test_scoped_outside_scope_is_transient() {
        let catalog = Catalog::new().with(Factory::of("Session", |_: Construction| Ok(0u8)));
        let registry = Registry::with_catalog(catalog);
        registry
            .register_one(Descriptor::export("Session").scoped())
            .unwrap();

        let a = registry.resolve_instance_sync("Session").unwrap();
        let b = registry.resolve_instance_sync("Session").unwrap();
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn test_alias_follows_target_lifetime() {
        let catalog = Catalog::new().with(Factory::of("Conn", |_: Construction| Ok(0u8)));
        let registry = Registry::with_catalog(catalog);
        registry
            .register([
                Descriptor::export("Conn").transient(),
                Descriptor::alias("db", "Conn"),
            ])
            .unwrap();

        let a = registry.resolve_instance_sync("db").unwrap();
        let b = registry.resolve_instance_sync("db").unwrap();
        assert!(!a.ptr_eq(&b));
        assert_eq!(registry.stats().singletons, 0);
    }
}
