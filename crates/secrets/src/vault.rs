//! HTTP client for vault-style secret services speaking the KV v2 layout

use crate::backend::{parse_endpoint, SecretBackend, SecretOptions};
use async_trait::async_trait;
use parking_lot::Mutex;
use rigger_core::{Error, Result};
use rigger_utils::{retry_async, RetryConfig};
use serde::Deserialize;
use serde_json::json;
use url::Url;

const DEFAULT_MOUNT: &str = "secret";

#[derive(Deserialize)]
struct ReadResponse {
    data: ReadData,
}

#[derive(Deserialize)]
struct ReadData {
    data: serde_json::Map<String, serde_json::Value>,
}

/// Reads and writes `{"value": ...}` entries at `<endpoint>/v1/<mount>/data/<key>`
pub struct VaultBackend {
    endpoint: Url,
    token_env: String,
    retry: RetryConfig,
    client: Mutex<Option<reqwest::Client>>,
}

impl VaultBackend {
    pub fn new(endpoint: &str, token_env: impl Into<String>) -> Result<Self> {
        let endpoint = parse_endpoint(endpoint).map_err(|e| {
            Error::configuration(format!("invalid vault endpoint '{endpoint}': {e}"))
        })?;
        Ok(Self {
            endpoint,
            token_env: token_env.into(),
            retry: RetryConfig::network(),
            client: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// The HTTP client, created on first use
    fn client(&self) -> reqwest::Client {
        self.client
            .lock()
            .get_or_insert_with(|| {
                tracing::debug!(endpoint = %self.endpoint, "Opening vault client");
                reqwest::Client::new()
            })
            .clone()
    }

    fn token(&self) -> Result<String> {
        std::env::var(&self.token_env)
            .map_err(|_| Error::environment(&self.token_env, "vault token is not set"))
    }

    fn secret_url(&self, key: &str, options: &SecretOptions) -> Result<Url> {
        let mount = options.namespace.as_deref().unwrap_or(DEFAULT_MOUNT);
        self.endpoint
            .join(&format!("v1/{mount}/data/{key}"))
            .map_err(|e| Error::configuration(format!("invalid vault path for '{key}': {e}")))
    }
}

#[async_trait]
impl SecretBackend for VaultBackend {
    fn name(&self) -> &'static str {
        "vault"
    }

    async fn resolve(&self, key: &str, options: &SecretOptions) -> Result<Option<String>> {
        let url = self.secret_url(key, options)?;
        let token = self.token()?;
        let client = self.client();

        let body = retry_async(self.retry.clone(), || {
            let request = client.get(url.clone()).bearer_auth(&token);
            let endpoint = url.to_string();
            async move {
                let response = request
                    .send()
                    .await
                    .map_err(|e| Error::network(&endpoint, e.to_string()))?;
                match response.status() {
                    reqwest::StatusCode::NOT_FOUND => Ok(None),
                    status if status.is_success() => response
                        .json::<ReadResponse>()
                        .await
                        .map(Some)
                        .map_err(|e| Error::network(&endpoint, format!("malformed response: {e}"))),
                    status if status.is_server_error() => {
                        Err(Error::network(&endpoint, format!("server returned {status}")))
                    }
                    status => Err(Error::secret_resolution(
                        key,
                        format!("vault returned {status}"),
                    )),
                }
            }
        })
        .await?;

        Ok(body.and_then(|body| match body.data.data.get("value") {
            Some(serde_json::Value::String(value)) => Some(value.clone()),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        }))
    }

    async fn save(&self, key: &str, value: &str, options: &SecretOptions) -> Result<bool> {
        let url = self.secret_url(key, options)?;
        let token = self.token()?;
        let client = self.client();
        let payload = json!({ "data": { "value": value }, "options": { "metadata": options.metadata } });

        let status = retry_async(self.retry.clone(), || {
            let request = client.post(url.clone()).bearer_auth(&token).json(&payload);
            let endpoint = url.to_string();
            async move {
                let response = request
                    .send()
                    .await
                    .map_err(|e| Error::network(&endpoint, e.to_string()))?;
                let status = response.status();
                if status.is_server_error() {
                    return Err(Error::network(&endpoint, format!("server returned {status}")));
                }
                Ok(status)
            }
        })
        .await?;

        if !status.is_success() {
            tracing::warn!(key, %status, "Vault rejected secret write");
        }
        Ok(status.is_success())
    }

    async fn close(&self) -> Result<()> {
        if self.client.lock().take().is_some() {
            tracing::debug!(endpoint = %self.endpoint, "Closed vault client");
        }
        Ok(())
    }
}
