//! Type-erased instances, named factories and the injected dependency object

use rigger_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::{type_name, Any};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A resolved registry entry.
///
/// Cloning is cheap and keeps identity: two clones of the same instance are
/// [`ptr_eq`](Instance::ptr_eq).
#[derive(Clone)]
pub struct Instance {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Instance {
    /// Wrap a value
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            type_name: type_name::<T>(),
        }
    }

    /// Wrap a JSON value (what the `value` strategy produces from documents)
    pub fn json(value: Value) -> Self {
        Self::new(value)
    }

    /// Clone the inner value out as `T`, if that is what this instance holds.
    ///
    /// Trait objects are registered as `Arc<dyn Trait>` and retrieved the same
    /// way, so the clone shares the underlying object.
    #[must_use]
    pub fn get<T: Any + Clone>(&self) -> Option<T> {
        self.value.downcast_ref::<T>().cloned()
    }

    /// Borrow the inner value as `T`
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Check the held type
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Name of the held type, for diagnostics
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether both handles point at the same constructed object
    #[must_use]
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.type_name)
            .finish()
    }
}

type BuildFn = dyn Fn(Construction) -> Result<Instance> + Send + Sync;

/// A named constructor.
///
/// Factories receive positional `args` followed by one explicit
/// [`Dependencies`] object holding every injected dependency by key.
#[derive(Clone)]
pub struct Factory {
    name: Arc<str>,
    build: Arc<BuildFn>,
}

impl Factory {
    /// Create a factory returning an already type-erased instance
    pub fn new<F>(name: impl Into<String>, build: F) -> Self
    where
        F: Fn(Construction) -> Result<Instance> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name.into()),
            build: Arc::new(build),
        }
    }

    /// Create a factory returning a concrete value that is wrapped for you
    pub fn of<T, F>(name: impl Into<String>, build: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(Construction) -> Result<T> + Send + Sync + 'static,
    {
        Self::new(name, move |construction| build(construction).map(Instance::new))
    }

    /// Name the factory was exported under
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the constructor
    pub fn build(&self, construction: Construction) -> Result<Instance> {
        (self.build)(construction)
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Factory").field(&self.name).finish()
    }
}

/// Everything a factory is called with
#[derive(Debug, Clone)]
pub struct Construction {
    /// Registry key being constructed
    pub key: String,
    /// Literal constructor arguments, in declaration order
    pub args: Vec<Value>,
    /// Injected dependencies keyed by their registry key
    pub dependencies: Dependencies,
}

impl Construction {
    /// Construction with no arguments or dependencies
    pub fn bare(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            args: Vec::new(),
            dependencies: Dependencies::default(),
        }
    }

    /// Deserialize the positional argument at `index`
    pub fn arg<T: DeserializeOwned>(&self, index: usize) -> Result<T> {
        let value = self.args.get(index).ok_or_else(|| {
            Error::resolution(
                &self.key,
                format!("missing constructor argument #{index}"),
            )
        })?;
        serde_json::from_value(value.clone()).map_err(|e| {
            Error::resolution_with_source(
                &self.key,
                format!("constructor argument #{index} has the wrong shape"),
                e,
            )
        })
    }

    /// Deserialize the positional argument at `index`, if present
    pub fn arg_opt<T: DeserializeOwned>(&self, index: usize) -> Result<Option<T>> {
        match self.args.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.arg(index).map(Some),
        }
    }
}

/// The single object carrying injected dependencies
#[derive(Debug, Clone, Default)]
pub struct Dependencies {
    entries: BTreeMap<String, Instance>,
}

impl Dependencies {
    /// Create an empty dependency object
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an injected dependency
    pub fn insert(&mut self, key: impl Into<String>, instance: Instance) {
        self.entries.insert(key.into(), instance);
    }

    /// Fetch a dependency as `T`
    pub fn get<T: Any + Clone>(&self, key: &str) -> Result<T> {
        let instance = self
            .entries
            .get(key)
            .ok_or_else(|| Error::resolution(key, "dependency was not injected"))?;
        instance.get::<T>().ok_or_else(|| {
            Error::resolution(
                key,
                format!(
                    "injected dependency is a {} but a {} was requested",
                    instance.type_name(),
                    type_name::<T>()
                ),
            )
        })
    }

    /// Raw access to an injected instance
    #[must_use]
    pub fn instance(&self, key: &str) -> Option<&Instance> {
        self.entries.get(key)
    }

    /// Whether a dependency was injected under `key`
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Injected keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    #[test]
    fn test_trait_objects_round_trip_through_instances() {
        let greeter: Arc<dyn Greeter> = Arc::new(English);
        let instance = Instance::new(greeter);

        let back = instance.get::<Arc<dyn Greeter>>().unwrap();
        assert_eq!(back.greet(), "hello");
        assert!(instance.get::<String>().is_none());
    }

    #[test]
    fn test_clones_share_identity() {
        let a = Instance::new(5u32);
        let b = a.clone();
        let c = Instance::new(5u32);

        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
    }

    #[test]
    fn test_construction_args_deserialize() {
        let mut construction = Construction::bare("Docker");
        construction.args = vec![json!("eu-west-1"), json!({ "replicas": 3 }), Value::Null];

        assert_eq!(construction.arg::<String>(0).unwrap(), "eu-west-1");
        assert_eq!(construction.arg::<Value>(1).unwrap()["replicas"], 3);
        assert_eq!(construction.arg_opt::<String>(2).unwrap(), None);
        assert!(construction.arg::<u32>(0).is_err());
        assert!(construction.arg::<String>(5).is_err());
    }

    #[test]
    fn test_dependencies_report_type_mismatch() {
        let mut deps = Dependencies::new();
        deps.insert("region", Instance::json(json!("eu")));

        assert_eq!(deps.get::<Value>("region").unwrap(), json!("eu"));
        let err = deps.get::<u64>("region").unwrap_err();
        assert!(err.to_string().contains("was requested"));
        assert!(deps.get::<Value>("missing").is_err());
    }

    #[test]
    fn test_factory_of_wraps_result() {
        let factory = Factory::of("Counter", |c: Construction| Ok(c.args.len()));
        let mut construction = Construction::bare("Counter");
        construction.args = vec![json!(1), json!(2)];

        let instance = factory.build(construction).unwrap();
        assert_eq!(instance.get::<usize>(), Some(2));
        assert_eq!(factory.name(), "Counter");
    }
}
