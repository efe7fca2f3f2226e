//! Dependency registry for rigger.
//!
//! Components, services and values are registered as [`Descriptor`]s and
//! constructed on first resolve. A descriptor names its target (a factory, a
//! catalog export, a ready value or another key), a construction
//! [`Strategy`], a [`Lifetime`], constructor args and nested dependencies.
//!
//! Targets with a module location are loaded through the [`loader`] module.
//! Keys nobody registered can still resolve through `auto` rules, which match
//! the key against a regular expression and synthesize a descriptor for it.

pub mod catalog;
pub mod descriptor;
pub mod instance;
pub mod loader;
pub mod registry;
pub mod rules;
pub mod scope;

pub use catalog::Catalog;
pub use descriptor::{
    Descriptor, DescriptorSpec, DescriptorSpecs, Lifetime, ModuleLocation, Strategy, Target,
};
pub use instance::{Construction, Dependencies, Factory, Instance};
pub use loader::{detect_format, load_module, ModuleFormat, ModuleLoader};
pub use registry::{Registry, RegistryStats};
pub use rules::AutoRule;
pub use scope::ScopedRegistry;
