//! Orchestrator settings and their environment overrides

use rigger_core::{
    Result, DEFAULT_TEMPLATES_DIR, RIGGER_SECRET_SOURCE_VAR, RIGGER_SECRET_TYPE_VAR,
    RIGGER_TEMPLATES_DIR_VAR,
};
use rigger_registry::DescriptorSpecs;
use rigger_secrets::SecretSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything the orchestrator needs before its first run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorSettings {
    /// Directory the file template store reads from
    pub templates_dir: PathBuf,
    pub secrets: SecretSettings,
    /// Registration document applied on configure
    pub registry: DescriptorSpecs,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            templates_dir: PathBuf::from(DEFAULT_TEMPLATES_DIR),
            secrets: SecretSettings::default(),
            registry: DescriptorSpecs::default(),
        }
    }
}

impl OrchestratorSettings {
    /// Apply `RIGGER_TEMPLATES_DIR`, `RIGGER_SECRET_TYPE` and `RIGGER_SECRET_SOURCE`
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(dir) = non_empty_var(RIGGER_TEMPLATES_DIR_VAR) {
            self.templates_dir = PathBuf::from(dir);
        }
        if let Some(kind) = non_empty_var(RIGGER_SECRET_TYPE_VAR) {
            self.secrets.kind = kind.parse()?;
        }
        if let Some(source) = non_empty_var(RIGGER_SECRET_SOURCE_VAR) {
            self.secrets.secret_source = source.parse()?;
        }
        Ok(())
    }

    /// Make relative paths relative to `base` instead of the working directory
    pub fn resolve_paths(&mut self, base: &Path) {
        rebase(&mut self.templates_dir, base);
        for path in [
            self.secrets.master_key_path.as_mut(),
            self.secrets.store_path.as_mut(),
        ]
        .into_iter()
        .flatten()
        {
            rebase(path, base);
        }
    }
}

fn rebase(path: &mut PathBuf, base: &Path) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}
