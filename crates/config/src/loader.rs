//! Settings discovery and loading
//!
//! The loader looks for `rigger.json`, `rigger.yaml` or `rigger.yml` in the
//! working directory and its parents, applies environment overrides and
//! resolves relative paths against the directory the file was found in.

use crate::document::read_document;
use crate::settings::OrchestratorSettings;
use rigger_core::{Error, Result, SETTINGS_FILENAMES};
use rigger_registry::DescriptorSpecs;
use std::path::{Path, PathBuf};

/// Loaded settings plus where they came from
#[derive(Debug, Clone)]
pub struct LoadedSettings {
    pub settings: OrchestratorSettings,
    /// `None` when no settings file was found and defaults were used
    pub source: Option<PathBuf>,
}

pub struct SettingsLoader {
    directory: Option<PathBuf>,
    file: Option<PathBuf>,
    env_overrides: bool,
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self {
            directory: None,
            file: None,
            env_overrides: true,
        }
    }

    /// Directory to start the search from (defaults to the current directory)
    pub fn directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.directory = Some(dir.into());
        self
    }

    /// Load this file instead of searching
    pub fn file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn env_overrides(mut self, enabled: bool) -> Self {
        self.env_overrides = enabled;
        self
    }

    pub async fn load(self) -> Result<LoadedSettings> {
        let working_dir = self
            .directory
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .ok_or_else(|| Error::configuration("failed to determine working directory"))?;

        let source = match self.file {
            Some(file) => Some(file),
            None => find_settings_file(&working_dir),
        };

        let mut settings = match &source {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading settings");
                let mut settings: OrchestratorSettings = read_document(path).await?;
                let base = path.parent().unwrap_or(&working_dir).to_path_buf();
                settings.resolve_paths(&base);
                settings
            }
            None => {
                tracing::debug!(dir = %working_dir.display(), "No settings file found, using defaults");
                let mut settings = OrchestratorSettings::default();
                settings.resolve_paths(&working_dir);
                settings
            }
        };

        if self.env_overrides {
            settings.apply_env_overrides()?;
        }

        Ok(LoadedSettings { settings, source })
    }
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Nearest settings file in `start` or its parents
pub fn find_settings_file(start: &Path) -> Option<PathBuf> {
    start.ancestors().find_map(|dir| {
        SETTINGS_FILENAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}

/// Read a standalone registration document (JSON or YAML, list or map)
pub async fn load_registration(path: &Path) -> Result<DescriptorSpecs> {
    let specs: DescriptorSpecs = read_document(path).await?;
    tracing::debug!(path = %path.display(), entries = specs.len(), "Loaded registration document");
    Ok(specs)
}
