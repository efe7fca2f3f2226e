//! Secret backend selection settings

use rigger_core::{Error, DEFAULT_KEY_VAULT_NAMESPACE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Which backend the secret manager delegates to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretBackendKind {
    #[default]
    #[serde(alias = "environment")]
    Env,
    Vault,
    #[serde(alias = "store", alias = "database")]
    Encrypted,
}

impl FromStr for SecretBackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "env" | "environment" => Ok(Self::Env),
            "vault" => Ok(Self::Vault),
            "encrypted" | "store" | "database" => Ok(Self::Encrypted),
            other => Err(Error::configuration(format!(
                "unknown secret backend type '{other}' (expected env, vault or encrypted)"
            ))),
        }
    }
}

impl fmt::Display for SecretBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Env => f.write_str("env"),
            Self::Vault => f.write_str("vault"),
            Self::Encrypted => f.write_str("encrypted"),
        }
    }
}

/// Where the encrypted store gets its data key from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretSource {
    /// A master key file on local disk
    #[default]
    Local,
    /// A remote key management service
    Cloud,
}

impl FromStr for SecretSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "cloud" | "kms" => Ok(Self::Cloud),
            other => Err(Error::configuration(format!(
                "unknown secret source '{other}' (expected local or cloud)"
            ))),
        }
    }
}

/// Settings for the secret manager and its backends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretSettings {
    #[serde(rename = "type")]
    pub kind: SecretBackendKind,
    pub key_vault_namespace: String,
    pub secret_source: SecretSource,
    pub master_key_path: Option<PathBuf>,
    pub kms_endpoint: Option<String>,
    pub vault_endpoint: Option<String>,
    /// Environment variable holding the vault bearer token
    pub vault_token_env: String,
    pub store_path: Option<PathBuf>,
}

impl Default for SecretSettings {
    fn default() -> Self {
        Self {
            kind: SecretBackendKind::default(),
            key_vault_namespace: DEFAULT_KEY_VAULT_NAMESPACE.to_string(),
            secret_source: SecretSource::default(),
            master_key_path: None,
            kms_endpoint: None,
            vault_endpoint: None,
            vault_token_env: "VAULT_TOKEN".to_string(),
            store_path: None,
        }
    }
}
