//! JSON file holding encrypted secret documents

use chrono::{DateTime, Utc};
use rigger_core::{Error, Result};
use rigger_utils::write_atomic_private;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// One stored secret; only `value` is encrypted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretDocument {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub value: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    pub updated_at: DateTime<Utc>,
}

impl SecretDocument {
    /// Identity used as associated data when encrypting `value`
    pub fn binding(key: &str, namespace: Option<&str>) -> String {
        match namespace {
            Some(namespace) => format!("{namespace}/{key}"),
            None => key.to_string(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    secrets: Vec<SecretDocument>,
}

/// File-backed collection of [`SecretDocument`]s
#[derive(Debug)]
pub struct DocumentStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl DocumentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<StoreFile> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => serde_json::from_str(&content).map_err(|e| Error::Json {
                message: format!("secret store {} is corrupt", self.path.display()),
                source: e,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoreFile::default()),
            Err(e) => Err(Error::file_system(&self.path, "read secret store", e)),
        }
    }

    pub async fn find(&self, key: &str, namespace: Option<&str>) -> Result<Option<SecretDocument>> {
        let file = self.read().await?;
        Ok(file
            .secrets
            .into_iter()
            .find(|doc| doc.key == key && doc.namespace.as_deref() == namespace))
    }

    /// Insert or replace the document with the same key and namespace
    pub async fn upsert(&self, document: SecretDocument) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.read().await?;

        match file
            .secrets
            .iter_mut()
            .find(|doc| doc.key == document.key && doc.namespace == document.namespace)
        {
            Some(existing) => *existing = document,
            None => file.secrets.push(document),
        }

        let content = serde_json::to_vec_pretty(&file)?;
        write_atomic_private(&self.path, &content)
    }

    pub async fn len(&self) -> Result<usize> {
        Ok(self.read().await?.secrets.len())
    }
}
