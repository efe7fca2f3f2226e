use async_trait::async_trait;
use rigger_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Per-call options passed through to a backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretOptions {
    /// Collection, mount or prefix the key lives under
    pub namespace: Option<String>,
    /// Stored alongside saved values where the backend supports it
    pub metadata: BTreeMap<String, String>,
}

impl SecretOptions {
    pub fn namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..Self::default()
        }
    }
}

/// A storage technology secrets can be read from and written to
///
/// `resolve` returns `Ok(None)` when the backend has no value for the key;
/// errors are reserved for backends that could not be asked.
#[async_trait]
pub trait SecretBackend: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn resolve(&self, key: &str, options: &SecretOptions) -> Result<Option<String>>;

    /// Store a value; `Ok(false)` means the backend does not accept writes
    async fn save(&self, key: &str, value: &str, options: &SecretOptions) -> Result<bool>;

    /// Release connections; later calls may reopen them
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Parse a service endpoint so relative paths join below it.
///
/// `Url::join` replaces the last path segment unless the base ends in `/`,
/// so `https://host/vault` is stored as `https://host/vault/`.
pub fn parse_endpoint(raw: &str) -> std::result::Result<Url, url::ParseError> {
    Url::parse(raw).map(base_endpoint)
}

/// Append a trailing `/` to the endpoint's path when it is missing
pub fn base_endpoint(mut endpoint: Url) -> Url {
    if !endpoint.path().ends_with('/') {
        let path = format!("{}/", endpoint.path());
        endpoint.set_path(&path);
    }
    endpoint
}
