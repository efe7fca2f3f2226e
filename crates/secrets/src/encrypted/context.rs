//! Data key acquisition and AES-256-GCM field encryption

use crate::backend::base_endpoint;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::Rng;
use rigger_core::{Error, Result};
use rigger_utils::{retry_async, write_atomic_private, RetryConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;
use zeroize::Zeroizing;

/// Length of the data key in bytes
pub const DATA_KEY_LENGTH: usize = 32;
const NONCE_LENGTH: usize = 12;

/// Where the data key comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KmsProvider {
    /// Raw key bytes in a local file, generated on first use
    Local { master_key_path: PathBuf },
    /// A key service that hands out the data key for a key-vault namespace
    Cloud { endpoint: Url },
}

impl KmsProvider {
    pub fn name(&self) -> &'static str {
        match self {
            KmsProvider::Local { .. } => "local",
            KmsProvider::Cloud { .. } => "cloud",
        }
    }
}

#[derive(Serialize)]
struct DataKeyRequest<'a> {
    key_vault_namespace: &'a str,
}

#[derive(Deserialize)]
struct DataKeyResponse {
    /// Base64 encoded key bytes
    key: String,
}

/// Cipher bound to one key-vault namespace
pub struct EncryptionContext {
    namespace: String,
    provider: &'static str,
    cipher: Aes256Gcm,
}

impl fmt::Debug for EncryptionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionContext")
            .field("namespace", &self.namespace)
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

impl EncryptionContext {
    /// Fetch or create the data key and build the cipher
    pub async fn initialize(namespace: &str, provider: &KmsProvider) -> Result<Self> {
        Self::initialize_with_retry(namespace, provider, RetryConfig::network()).await
    }

    /// Like [`initialize`](Self::initialize), with explicit retries for the cloud provider
    pub async fn initialize_with_retry(
        namespace: &str,
        provider: &KmsProvider,
        retry: RetryConfig,
    ) -> Result<Self> {
        let key = match provider {
            KmsProvider::Local { master_key_path } => load_or_create_master_key(master_key_path)?,
            KmsProvider::Cloud { endpoint } => fetch_data_key(endpoint, namespace, retry).await?,
        };
        let context = Self::from_key(namespace, provider.name(), &key)?;
        tracing::info!(namespace, provider = provider.name(), "Initialized encryption context");
        Ok(context)
    }

    fn from_key(namespace: &str, provider: &'static str, key: &[u8]) -> Result<Self> {
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| {
            Error::encryption(format!(
                "data key must be {DATA_KEY_LENGTH} bytes, got {}",
                key.len()
            ))
        })?;
        Ok(Self {
            namespace: namespace.to_string(),
            provider,
            cipher,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Encrypt `plaintext`, binding it to `binding` (usually the document's key).
    ///
    /// Output is base64 of nonce followed by ciphertext.
    pub fn encrypt(&self, binding: &str, plaintext: &str) -> Result<String> {
        let mut nonce = [0u8; NONCE_LENGTH];
        rand::thread_rng().fill(&mut nonce[..]);

        let ciphertext = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: binding.as_bytes(),
                },
            )
            .map_err(|_| Error::encryption(format!("failed to encrypt '{binding}'")))?;

        let mut sealed = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(sealed))
    }

    /// Reverse of [`encrypt`](Self::encrypt); fails if the binding differs
    pub fn decrypt(&self, binding: &str, sealed: &str) -> Result<String> {
        let bytes = STANDARD
            .decode(sealed)
            .map_err(|e| Error::encryption(format!("'{binding}' is not valid base64: {e}")))?;
        if bytes.len() <= NONCE_LENGTH {
            return Err(Error::encryption(format!("'{binding}' ciphertext is truncated")));
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_LENGTH);

        let plaintext = Zeroizing::new(
            self.cipher
                .decrypt(
                    Nonce::from_slice(nonce),
                    Payload {
                        msg: ciphertext,
                        aad: binding.as_bytes(),
                    },
                )
                .map_err(|_| {
                    Error::encryption(format!(
                        "failed to decrypt '{binding}': wrong key or tampered value"
                    ))
                })?,
        );

        String::from_utf8(plaintext.to_vec())
            .map_err(|_| Error::encryption(format!("'{binding}' decrypted to invalid UTF-8")))
    }
}

fn load_or_create_master_key(path: &Path) -> Result<Zeroizing<Vec<u8>>> {
    if path.exists() {
        let key = Zeroizing::new(
            std::fs::read(path).map_err(|e| Error::file_system(path, "read master key", e))?,
        );
        if key.len() != DATA_KEY_LENGTH {
            return Err(Error::encryption(format!(
                "master key at {} must be {DATA_KEY_LENGTH} bytes",
                path.display()
            )));
        }
        return Ok(key);
    }

    let mut key = Zeroizing::new(vec![0u8; DATA_KEY_LENGTH]);
    rand::thread_rng().fill(&mut key[..]);
    write_atomic_private(path, &key)?;
    tracing::info!(path = %path.display(), "Generated new master key");
    Ok(key)
}

async fn fetch_data_key(
    endpoint: &Url,
    namespace: &str,
    retry: RetryConfig,
) -> Result<Zeroizing<Vec<u8>>> {
    let url = base_endpoint(endpoint.clone())
        .join("datakey")
        .map_err(|e| Error::configuration(format!("invalid KMS endpoint: {e}")))?;
    let client = reqwest::Client::new();

    let response = retry_async(retry, || {
        let request = client.post(url.clone()).json(&DataKeyRequest {
            key_vault_namespace: namespace,
        });
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
            if !status.is_success() {
                return Err(Error::encryption(format!("KMS refused data key: {status}")));
            }
            response
                .json::<DataKeyResponse>()
                .await
                .map_err(|e| Error::network(&endpoint, format!("malformed response: {e}")))
        }
    })
    .await?;

    STANDARD
        .decode(response.key.as_bytes())
        .map(Zeroizing::new)
        .map_err(|e| Error::encryption(format!("KMS returned an invalid key: {e}")))
}
