use super::{LoadFailure, LoadRequest, LoadedExport, LoadedModule, ModuleFormat, ModuleLoader};
use async_trait::async_trait;
use rigger_core::{Error, MODULE_MANIFEST_FILENAME};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// On-disk manifest module
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleManifest {
    /// Format marker, also read by format detection
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub format: Option<ModuleFormat>,
    /// Catalog export to construct; defaults to the requested name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Value>,
    /// Literal value the module stands for, in place of an export
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Loads JSON manifest modules from disk
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestLoader;

fn manifest_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(MODULE_MANIFEST_FILENAME)
    } else if path.extension().is_some_and(|ext| ext == "json") {
        path.to_path_buf()
    } else {
        path.with_extension("json")
    }
}

#[async_trait]
impl ModuleLoader for ManifestLoader {
    fn format(&self) -> ModuleFormat {
        ModuleFormat::Manifest
    }

    async fn load(&self, request: LoadRequest<'_>) -> Result<LoadedModule, LoadFailure> {
        let path = manifest_path(request.path);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LoadFailure::NotFound(format!(
                    "no manifest at {}",
                    path.display()
                )))
            }
            Err(e) => {
                return Err(LoadFailure::Failed(Error::file_system(
                    &path,
                    "read module manifest",
                    e,
                )))
            }
        };

        let manifest: ModuleManifest = serde_json::from_str(&content).map_err(|e| {
            LoadFailure::FormatMismatch(format!("{} is not a module manifest: {e}", path.display()))
        })?;

        let export = match manifest.value {
            Some(value) => LoadedExport::Value(value),
            None => {
                let name = manifest.export.as_deref().unwrap_or(request.export);
                let factory = request.catalog.get(name).ok_or_else(|| {
                    LoadFailure::Failed(Error::resolution(
                        name,
                        format!("manifest {} names an unknown export", path.display()),
                    ))
                })?;
                LoadedExport::Factory(factory)
            }
        };

        Ok(LoadedModule {
            path,
            format: ModuleFormat::Manifest,
            export,
            args: manifest.args,
        })
    }
}
