//! Concurrent resolution of variable descriptors against a scope

use crate::descriptor::{VariableDescriptor, VariableKind};
use futures::future::join_all;
use rigger_core::{Error, Result, Scope};
use rigger_secrets::{SecretBackend, SecretManager, SecretOptions};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Output of [`VariableResolver::process`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedVariables {
    pub values: Map<String, Value>,
    /// Names whose value came from the secret manager
    pub secret_names: BTreeSet<String>,
}

impl ResolvedVariables {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn is_secret(&self, name: &str) -> bool {
        self.secret_names.contains(name)
    }

    /// Copy of the values with every secret replaced by a mask
    pub fn redacted(&self) -> Map<String, Value> {
        self.values
            .iter()
            .map(|(name, value)| {
                let value = if self.is_secret(name) {
                    Value::String(rigger_core::MASK.to_string())
                } else {
                    value.clone()
                };
                (name.clone(), value)
            })
            .collect()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.values
    }
}

struct Resolved {
    value: Option<Value>,
    from_secret: bool,
}

/// Turns variable descriptors into a flat map
#[derive(Clone)]
pub struct VariableResolver {
    secrets: Arc<dyn SecretBackend>,
    options: SecretOptions,
}

impl VariableResolver {
    pub fn new(secrets: Arc<dyn SecretBackend>) -> Self {
        Self {
            secrets,
            options: SecretOptions::default(),
        }
    }

    /// Options passed with every secret lookup
    #[must_use]
    pub fn with_secret_options(mut self, options: SecretOptions) -> Self {
        self.options = options;
        self
    }

    /// Resolve every descriptor concurrently and merge in input order.
    ///
    /// Later descriptors with the same name overwrite earlier ones. Secret
    /// lookups that fail degrade to the descriptor's default. A name that
    /// resolves to nothing and has no default is left out.
    pub async fn process(
        &self,
        descriptors: &[VariableDescriptor],
        scope: &Scope,
    ) -> Result<ResolvedVariables> {
        let lookups = descriptors
            .iter()
            .map(|descriptor| self.resolve_one(descriptor, scope));
        let results = join_all(lookups).await;

        let mut resolved = ResolvedVariables::default();
        for (descriptor, result) in descriptors.iter().zip(results) {
            let Resolved { value, from_secret } = result?;
            let Some(value) = value else {
                tracing::debug!(name = %descriptor.name, kind = %descriptor.kind, "Variable resolved to nothing");
                continue;
            };
            if from_secret {
                resolved.secret_names.insert(descriptor.name.clone());
            } else {
                resolved.secret_names.remove(&descriptor.name);
            }
            resolved.values.insert(descriptor.name.clone(), value);
        }
        Ok(resolved)
    }

    async fn resolve_one(&self, descriptor: &VariableDescriptor, scope: &Scope) -> Result<Resolved> {
        let fallback = || Resolved {
            value: descriptor.default.clone(),
            from_secret: false,
        };
        let found = |value: Value| Resolved {
            value: Some(value),
            from_secret: false,
        };

        match descriptor.kind {
            VariableKind::Value => Ok(descriptor.value.clone().map(found).unwrap_or_else(fallback)),
            VariableKind::Environment => {
                let variable = source_key(descriptor)?;
                Ok(std::env::var(variable)
                    .map(|value| found(Value::String(value)))
                    .unwrap_or_else(|_| fallback()))
            }
            VariableKind::Reference => {
                let key = source_key(descriptor)?;
                Ok(scope.lookup(key).cloned().map(found).unwrap_or_else(fallback))
            }
            VariableKind::Secret | VariableKind::Protected => {
                let key = source_key(descriptor)?;
                match self.secrets.resolve(key, &self.options).await {
                    Ok(Some(secret)) => Ok(Resolved {
                        value: Some(Value::String(secret)),
                        from_secret: true,
                    }),
                    Ok(None) => Ok(fallback()),
                    Err(error) => {
                        tracing::warn!(
                            name = %descriptor.name,
                            key,
                            error = %error,
                            "Secret lookup failed, using default"
                        );
                        Ok(fallback())
                    }
                }
            }
        }
    }
}

fn source_key(descriptor: &VariableDescriptor) -> Result<&str> {
    descriptor.source_key().ok_or_else(|| {
        Error::configuration(format!(
            "{} variable '{}' needs a string value naming its source",
            descriptor.kind, descriptor.name
        ))
    })
}

impl Default for VariableResolver {
    fn default() -> Self {
        Self::new(Arc::new(SecretManager::new()))
    }
}

impl std::fmt::Debug for VariableResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableResolver")
            .field("secrets", &self.secrets.name())
            .field("options", &self.options)
            .finish()
    }
}
