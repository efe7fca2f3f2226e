//! Secrets kept in a local document store with encrypted values

mod context;
mod store;

pub use context::{EncryptionContext, KmsProvider, DATA_KEY_LENGTH};
pub use store::{DocumentStore, SecretDocument};

use crate::backend::{SecretBackend, SecretOptions};
use async_trait::async_trait;
use chrono::Utc;
use rigger_core::Result;
use rigger_utils::RetryConfig;
use std::path::PathBuf;
use tokio::sync::OnceCell;

/// Backend whose documents carry AES-256-GCM encrypted values.
///
/// The encryption context is created on the first read or write and reused
/// for the lifetime of the backend.
#[derive(Debug)]
pub struct EncryptedStoreBackend {
    store: DocumentStore,
    key_vault_namespace: String,
    provider: KmsProvider,
    retry: RetryConfig,
    context: OnceCell<EncryptionContext>,
}

impl EncryptedStoreBackend {
    pub fn new(
        store_path: impl Into<PathBuf>,
        key_vault_namespace: impl Into<String>,
        provider: KmsProvider,
    ) -> Self {
        Self {
            store: DocumentStore::new(store_path),
            key_vault_namespace: key_vault_namespace.into(),
            provider,
            retry: RetryConfig::network(),
            context: OnceCell::new(),
        }
    }

    /// Retry policy for fetching the data key from a cloud KMS
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub async fn context(&self) -> Result<&EncryptionContext> {
        self.context
            .get_or_try_init(|| {
                EncryptionContext::initialize_with_retry(
                    &self.key_vault_namespace,
                    &self.provider,
                    self.retry.clone(),
                )
            })
            .await
    }

    /// Whether the encryption context has been created yet
    pub fn is_initialized(&self) -> bool {
        self.context.initialized()
    }
}

#[async_trait]
impl SecretBackend for EncryptedStoreBackend {
    fn name(&self) -> &'static str {
        "encrypted"
    }

    async fn resolve(&self, key: &str, options: &SecretOptions) -> Result<Option<String>> {
        let namespace = options.namespace.as_deref();
        let Some(document) = self.store.find(key, namespace).await? else {
            return Ok(None);
        };
        let context = self.context().await?;
        let binding = SecretDocument::binding(key, namespace);
        context.decrypt(&binding, &document.value).map(Some)
    }

    async fn save(&self, key: &str, value: &str, options: &SecretOptions) -> Result<bool> {
        let context = self.context().await?;
        let namespace = options.namespace.as_deref();
        let binding = SecretDocument::binding(key, namespace);

        self.store
            .upsert(SecretDocument {
                key: key.to_string(),
                namespace: options.namespace.clone(),
                value: context.encrypt(&binding, value)?,
                metadata: options.metadata.clone(),
                updated_at: Utc::now(),
            })
            .await?;
        tracing::debug!(key, store = %self.store.path().display(), "Saved encrypted secret");
        Ok(true)
    }
}
