//! Compiled-in exports that descriptors and native modules refer to by name

use crate::instance::Factory;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared table of named factories
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    exports: Arc<RwLock<HashMap<String, Factory>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`export`](Catalog::export)
    #[must_use]
    pub fn with(self, factory: Factory) -> Self {
        self.export(factory);
        self
    }

    /// Publish a factory under its own name, replacing any previous export
    pub fn export(&self, factory: Factory) {
        let name = factory.name().to_string();
        if self.exports.write().insert(name.clone(), factory).is_some() {
            tracing::debug!(export = %name, "Replaced catalog export");
        }
    }

    pub fn get(&self, name: &str) -> Option<Factory> {
        self.exports.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.exports.read().contains_key(name)
    }

    /// Export names in sorted order
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.exports.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.exports.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.exports.read().is_empty()
    }
}
