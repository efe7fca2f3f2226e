//! The secret manager facade
//!
//! Callers ask one question: give me this secret. The manager delegates to
//! the configured backend and falls back to the process environment when the
//! backend has nothing. Every value handed out is remembered so output can
//! be masked later.

use crate::backend::{parse_endpoint, SecretBackend, SecretOptions};
use crate::encrypted::{EncryptedStoreBackend, KmsProvider};
use crate::environment::EnvironmentBackend;
use crate::settings::{SecretBackendKind, SecretSettings, SecretSource};
use crate::vault::VaultBackend;
use async_trait::async_trait;
use parking_lot::Mutex;
use rigger_core::{Error, Result, SecretValues};

const DEFAULT_STORE_FILE: &str = ".rigger/secrets.json";
const DEFAULT_MASTER_KEY_FILE: &str = ".rigger/master.key";

pub struct SecretManager {
    backend: Box<dyn SecretBackend>,
    environment: EnvironmentBackend,
    values: Mutex<SecretValues>,
}

impl SecretManager {
    /// Manager reading only the environment
    pub fn new() -> Self {
        Self::with_backend(Box::new(EnvironmentBackend::new()))
    }

    pub fn with_backend(backend: Box<dyn SecretBackend>) -> Self {
        Self {
            backend,
            environment: EnvironmentBackend::new(),
            values: Mutex::new(SecretValues::new()),
        }
    }

    /// Build the backend named by `settings.kind`
    pub fn from_settings(settings: &SecretSettings) -> Result<Self> {
        let backend: Box<dyn SecretBackend> = match settings.kind {
            SecretBackendKind::Env => Box::new(EnvironmentBackend::new()),
            SecretBackendKind::Vault => {
                let endpoint = settings.vault_endpoint.as_deref().ok_or_else(|| {
                    Error::configuration("vault secrets need 'vault_endpoint'")
                })?;
                Box::new(VaultBackend::new(endpoint, settings.vault_token_env.clone())?)
            }
            SecretBackendKind::Encrypted => {
                let provider = match settings.secret_source {
                    SecretSource::Local => KmsProvider::Local {
                        master_key_path: settings
                            .master_key_path
                            .clone()
                            .unwrap_or_else(|| DEFAULT_MASTER_KEY_FILE.into()),
                    },
                    SecretSource::Cloud => {
                        let endpoint = settings.kms_endpoint.as_deref().ok_or_else(|| {
                            Error::configuration("cloud secret source needs 'kms_endpoint'")
                        })?;
                        KmsProvider::Cloud {
                            endpoint: parse_endpoint(endpoint).map_err(|e| {
                                Error::configuration(format!(
                                    "invalid KMS endpoint '{endpoint}': {e}"
                                ))
                            })?,
                        }
                    }
                };
                let store_path = settings
                    .store_path
                    .clone()
                    .unwrap_or_else(|| DEFAULT_STORE_FILE.into());
                Box::new(EncryptedStoreBackend::new(
                    store_path,
                    settings.key_vault_namespace.clone(),
                    provider,
                ))
            }
        };

        tracing::debug!(backend = backend.name(), "Configured secret manager");
        Ok(Self::with_backend(backend))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Resolve through the backend, then the environment.
    ///
    /// The environment fallback reads `<namespace>_<key>` when a namespace
    /// is given, then the bare `key`. A backend error is returned only when
    /// the environment has no value either.
    pub async fn resolve(&self, key: &str, options: &SecretOptions) -> Result<Option<String>> {
        let resolved = match self.backend.resolve(key, options).await {
            Ok(Some(value)) => Some(value),
            Ok(None) => self.environment_fallback(key, options),
            Err(error) => match self.environment_fallback(key, options) {
                Some(value) => {
                    tracing::warn!(
                        key,
                        backend = self.backend.name(),
                        error = %error,
                        "Secret backend failed, using environment value"
                    );
                    Some(value)
                }
                None => return Err(error),
            },
        };

        if let Some(value) = &resolved {
            self.values.lock().insert(value.clone());
        }
        Ok(resolved)
    }

    fn environment_fallback(&self, key: &str, options: &SecretOptions) -> Option<String> {
        self.environment.lookup(key, options).or_else(|| {
            options
                .namespace
                .as_ref()
                .and_then(|_| self.environment.lookup(key, &SecretOptions::default()))
        })
    }

    pub async fn save(&self, key: &str, value: &str, options: &SecretOptions) -> Result<bool> {
        let saved = self.backend.save(key, value, options).await?;
        if saved {
            self.values.lock().insert(value);
        }
        Ok(saved)
    }

    /// Close backend connections
    pub async fn close(&self) -> Result<()> {
        self.backend.close().await
    }

    /// Replace every secret handed out so far with a mask
    pub fn mask(&self, text: &str) -> String {
        self.values.lock().mask(text)
    }

    /// How many distinct secret values have been handed out
    pub fn resolved_count(&self) -> usize {
        self.values.lock().len()
    }
}

impl Default for SecretManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretBackend for SecretManager {
    fn name(&self) -> &'static str {
        self.backend.name()
    }

    async fn resolve(&self, key: &str, options: &SecretOptions) -> Result<Option<String>> {
        SecretManager::resolve(self, key, options).await
    }

    async fn save(&self, key: &str, value: &str, options: &SecretOptions) -> Result<bool> {
        SecretManager::save(self, key, value, options).await
    }

    async fn close(&self) -> Result<()> {
        SecretManager::close(self).await
    }
}
