//! Registration descriptors and their JSON document form

use crate::instance::{Factory, Instance};
use crate::loader::ModuleFormat;
use indexmap::IndexMap;
use rigger_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

/// How a descriptor's target becomes an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Call the target factory with args and injected dependencies
    #[default]
    Class,
    /// Return the target unchanged
    Value,
    /// Return the target factory itself, uncalled
    Function,
    /// Resolve another key and return its instance
    #[serde(alias = "reference")]
    Alias,
    /// Store a pattern rule used to synthesize descriptors on a miss
    #[serde(alias = "auto-pattern", alias = "pattern")]
    Auto,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Class => "class",
            Strategy::Value => "value",
            Strategy::Function => "function",
            Strategy::Alias => "alias",
            Strategy::Auto => "auto",
        };
        f.write_str(name)
    }
}

/// How long a constructed instance is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifetime {
    /// One instance per registry, created on first resolve
    #[default]
    Singleton,
    /// A new instance on every resolve
    Transient,
    /// One instance per [`ScopedRegistry`](crate::ScopedRegistry); transient outside a scope
    Scoped,
}

/// What a descriptor points at
#[derive(Debug, Clone)]
pub enum Target {
    /// A factory supplied directly
    Factory(Factory),
    /// A named export, found in the catalog or loaded from the descriptor's module location
    Export(String),
    /// A ready value
    Instance(Instance),
    /// Another registry key
    Key(String),
}

/// Where a dynamically loaded module lives
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleLocation {
    pub path: Option<PathBuf>,
    pub file: Option<String>,
    pub format: Option<ModuleFormat>,
}

impl ModuleLocation {
    /// Whether resolving this descriptor needs the module loader
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.path.is_some() || self.file.is_some()
    }

    /// Path a module exporting `export` is loaded from
    #[must_use]
    pub fn module_path(&self, export: &str) -> PathBuf {
        let base = self.path.clone().unwrap_or_else(|| PathBuf::from("."));
        base.join(self.file.as_deref().unwrap_or(export))
    }
}

/// A registration entry
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub key: Option<String>,
    /// Absent only for auto-registration templates
    pub target: Option<Target>,
    pub strategy: Strategy,
    pub lifetime: Lifetime,
    pub args: Vec<Value>,
    pub dependencies: Vec<Descriptor>,
    pub location: ModuleLocation,
    /// Regular expression for auto-registration rules
    pub pattern: Option<String>,
}

impl Descriptor {
    fn with_target(target: Option<Target>, strategy: Strategy) -> Self {
        Self {
            key: None,
            target,
            strategy,
            lifetime: Lifetime::default(),
            args: Vec::new(),
            dependencies: Vec::new(),
            location: ModuleLocation::default(),
            pattern: None,
        }
    }

    /// Construct by calling `factory`; the key defaults to the factory name
    pub fn class(factory: Factory) -> Self {
        Self::with_target(Some(Target::Factory(factory)), Strategy::Class)
    }

    /// Construct by calling a named export
    pub fn export(name: impl Into<String>) -> Self {
        Self::with_target(Some(Target::Export(name.into())), Strategy::Class)
    }

    /// Register a ready value under `key`
    pub fn value<T: std::any::Any + Send + Sync>(key: impl Into<String>, value: T) -> Self {
        Self::instance(key, Instance::new(value))
    }

    /// Register an already wrapped instance under `key`
    pub fn instance(key: impl Into<String>, instance: Instance) -> Self {
        Self::with_target(Some(Target::Instance(instance)), Strategy::Value).with_key(key)
    }

    /// Register the factory itself rather than what it builds
    pub fn function(factory: Factory) -> Self {
        Self::with_target(Some(Target::Factory(factory)), Strategy::Function)
    }

    /// Make `key` resolve to whatever `target_key` resolves to
    pub fn alias(key: impl Into<String>, target_key: impl Into<String>) -> Self {
        Self::with_target(Some(Target::Key(target_key.into())), Strategy::Alias).with_key(key)
    }

    /// A rule synthesizing a class descriptor for any missing key matching `pattern`
    pub fn auto(pattern: impl Into<String>) -> Self {
        let mut descriptor = Self::with_target(None, Strategy::Auto);
        descriptor.pattern = Some(pattern.into());
        descriptor
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    #[must_use]
    pub fn transient(self) -> Self {
        self.with_lifetime(Lifetime::Transient)
    }

    #[must_use]
    pub fn scoped(self) -> Self {
        self.with_lifetime(Lifetime::Scoped)
    }

    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = Value>) -> Self {
        self.args = args.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_dependency(mut self, dependency: Descriptor) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Load the target from `path` when resolved
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.location.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.location.file = Some(file.into());
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: ModuleFormat) -> Self {
        self.location.format = Some(format);
        self
    }

    /// Key this descriptor registers under: explicit, or derived from the target's name
    #[must_use]
    pub fn inferred_key(&self) -> Option<String> {
        if let Some(key) = &self.key {
            return Some(key.clone());
        }
        match (&self.strategy, &self.target) {
            (Strategy::Alias, _) | (Strategy::Auto, _) => None,
            (_, Some(Target::Factory(factory))) => Some(factory.name().to_string()),
            (_, Some(Target::Export(name))) => Some(name.clone()),
            _ => None,
        }
    }

    /// Build a descriptor from its document form
    pub fn from_spec(spec: DescriptorSpec) -> Result<Self> {
        let DescriptorSpec {
            key,
            target,
            strategy,
            lifetime,
            args,
            dependencies,
            path,
            file,
            regex,
            format,
        } = spec;

        let label = key.clone().unwrap_or_else(|| "<unnamed>".to_string());
        let target = match strategy {
            Strategy::Value => {
                if key.is_none() {
                    return Err(Error::configuration(
                        "value descriptors need an explicit key",
                    ));
                }
                Some(Target::Instance(Instance::json(target.unwrap_or(Value::Null))))
            }
            Strategy::Class | Strategy::Function => {
                let name = match target {
                    Some(Value::String(name)) => name,
                    None => key.clone().ok_or_else(|| {
                        Error::configuration("descriptor needs a key or a target export name")
                    })?,
                    Some(other) => {
                        return Err(Error::configuration(format!(
                            "descriptor '{label}': target must be an export name, got {other}"
                        )))
                    }
                };
                Some(Target::Export(name))
            }
            Strategy::Alias => match target {
                Some(Value::String(name)) => Some(Target::Key(name)),
                _ => {
                    return Err(Error::configuration(format!(
                        "alias descriptor '{label}' needs a target key"
                    )))
                }
            },
            Strategy::Auto => {
                if regex.is_none() {
                    return Err(Error::configuration(format!(
                        "auto descriptor '{label}' needs a regex"
                    )));
                }
                None
            }
        };

        let dependencies = dependencies
            .into_specs()
            .into_iter()
            .map(Descriptor::from_spec)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            key,
            target,
            strategy,
            lifetime,
            args,
            dependencies,
            location: ModuleLocation { path, file, format },
            pattern: regex,
        })
    }
}

/// Document form of a descriptor as written in registration JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DescriptorSpec {
    pub key: Option<String>,
    pub target: Option<Value>,
    #[serde(rename = "type")]
    pub strategy: Strategy,
    pub lifetime: Lifetime,
    pub args: Vec<Value>,
    pub dependencies: DescriptorSpecs,
    pub path: Option<PathBuf>,
    pub file: Option<String>,
    pub regex: Option<String>,
    pub format: Option<ModuleFormat>,
}

/// A registration document: either a list of descriptors or a map keyed by registry key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DescriptorSpecs {
    List(Vec<DescriptorSpec>),
    Map(IndexMap<String, DescriptorSpec>),
}

impl Default for DescriptorSpecs {
    fn default() -> Self {
        DescriptorSpecs::List(Vec::new())
    }
}

impl DescriptorSpecs {
    /// Flatten into a list; map keys fill in an absent `key`
    pub fn into_specs(self) -> Vec<DescriptorSpec> {
        match self {
            DescriptorSpecs::List(specs) => specs,
            DescriptorSpecs::Map(map) => map
                .into_iter()
                .map(|(key, mut spec)| {
                    spec.key.get_or_insert(key);
                    spec
                })
                .collect(),
        }
    }

    /// Convert every entry into a [`Descriptor`]
    pub fn into_descriptors(self) -> Result<Vec<Descriptor>> {
        self.into_specs()
            .into_iter()
            .map(Descriptor::from_spec)
            .collect()
    }

    pub fn len(&self) -> usize {
        match self {
            DescriptorSpecs::List(specs) => specs.len(),
            DescriptorSpecs::Map(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
