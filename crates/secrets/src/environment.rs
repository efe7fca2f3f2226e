use crate::backend::{SecretBackend, SecretOptions};
use async_trait::async_trait;
use parking_lot::RwLock;
use rigger_core::Result;
use std::collections::HashMap;

/// Reads secrets from the process environment.
///
/// Saved values go into an in-process overlay that shadows the environment;
/// the process environment itself is never modified.
#[derive(Debug, Default)]
pub struct EnvironmentBackend {
    overlay: RwLock<HashMap<String, String>>,
}

impl EnvironmentBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Variable name for `key`, prefixed with the namespace when one is given
    pub fn variable_name(key: &str, options: &SecretOptions) -> String {
        match options.namespace.as_deref() {
            Some(namespace) if !namespace.is_empty() => format!("{namespace}_{key}"),
            _ => key.to_string(),
        }
    }

    /// Synchronous lookup shared with the manager's fallback path
    pub fn lookup(&self, key: &str, options: &SecretOptions) -> Option<String> {
        let name = Self::variable_name(key, options);
        if let Some(value) = self.overlay.read().get(&name) {
            return Some(value.clone());
        }
        std::env::var(&name).ok().filter(|value| !value.is_empty())
    }
}

#[async_trait]
impl SecretBackend for EnvironmentBackend {
    fn name(&self) -> &'static str {
        "env"
    }

    async fn resolve(&self, key: &str, options: &SecretOptions) -> Result<Option<String>> {
        Ok(self.lookup(key, options))
    }

    async fn save(&self, key: &str, value: &str, options: &SecretOptions) -> Result<bool> {
        let name = Self::variable_name(key, options);
        self.overlay.write().insert(name, value.to_string());
        Ok(true)
    }
}
