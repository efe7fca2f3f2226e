//! Module loading for descriptors that carry a `path` or `file`.
//!
//! Two conventions exist. A *native* module is compiled into the binary and
//! published in the [`Catalog`]; its file stem names the export. A *manifest*
//! module is a JSON document on disk naming an export, default args or a
//! literal value.
//!
//! The convention is picked by [`detect_format`]. When the chosen loader
//! reports that the module is missing or is in the other format, the other
//! loader is tried once before giving up.

mod manifest;
mod native;

pub use manifest::{ManifestLoader, ModuleManifest};
pub use native::NativeLoader;

use crate::catalog::Catalog;
use crate::descriptor::ModuleLocation;
use crate::instance::Factory;
use async_trait::async_trait;
use rigger_core::{Error, Result, MODULE_MANIFEST_FILENAME};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Module loading convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    Native,
    Manifest,
}

impl ModuleFormat {
    /// The format tried when this one reports a fallback signature
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            ModuleFormat::Native => ModuleFormat::Manifest,
            ModuleFormat::Manifest => ModuleFormat::Native,
        }
    }
}

impl fmt::Display for ModuleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleFormat::Native => f.write_str("native"),
            ModuleFormat::Manifest => f.write_str("manifest"),
        }
    }
}

/// Pick a loading convention: explicit hint, then extension, then the
/// `type` field of the nearest `module.json`, then native.
pub fn detect_format(path: &Path, hint: Option<ModuleFormat>) -> ModuleFormat {
    if let Some(format) = hint {
        return format;
    }
    if let Some(format) = format_from_extension(path) {
        return format;
    }
    format_from_nearest_manifest(path).unwrap_or(ModuleFormat::Native)
}

fn format_from_extension(path: &Path) -> Option<ModuleFormat> {
    match path.extension()?.to_str()? {
        "json" => Some(ModuleFormat::Manifest),
        "native" | "so" | "dylib" | "dll" => Some(ModuleFormat::Native),
        _ => None,
    }
}

fn format_from_nearest_manifest(path: &Path) -> Option<ModuleFormat> {
    #[derive(Deserialize)]
    struct TypeField {
        #[serde(rename = "type")]
        format: Option<ModuleFormat>,
    }

    let start = if path.is_dir() { Some(path) } else { path.parent() };
    for dir in start.into_iter().flat_map(Path::ancestors) {
        let candidate = dir.join(MODULE_MANIFEST_FILENAME);
        let Ok(content) = std::fs::read_to_string(&candidate) else {
            continue;
        };
        // The nearest manifest decides, even without a type field
        return serde_json::from_str::<TypeField>(&content)
            .ok()
            .and_then(|field| field.format);
    }
    None
}

/// What a loader produced
#[derive(Debug, Clone)]
pub struct LoadedModule {
    pub path: PathBuf,
    pub format: ModuleFormat,
    pub export: LoadedExport,
    /// Default constructor args declared by the module
    pub args: Vec<Value>,
}

#[derive(Debug, Clone)]
pub enum LoadedExport {
    Factory(Factory),
    Value(Value),
}

/// Why a loader could not produce a module
#[derive(Debug)]
pub enum LoadFailure {
    /// Nothing at the path in this loader's convention
    NotFound(String),
    /// Something is there but in the other convention
    FormatMismatch(String),
    /// The module was found but is broken
    Failed(Error),
}

impl LoadFailure {
    /// Whether the other loader should be tried
    #[must_use]
    pub fn is_fallback_signature(&self) -> bool {
        matches!(self, LoadFailure::NotFound(_) | LoadFailure::FormatMismatch(_))
    }
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadFailure::NotFound(message) => write!(f, "not found: {message}"),
            LoadFailure::FormatMismatch(message) => write!(f, "format mismatch: {message}"),
            LoadFailure::Failed(error) => write!(f, "{error}"),
        }
    }
}

/// Inputs to a single load attempt
#[derive(Debug, Clone, Copy)]
pub struct LoadRequest<'a> {
    pub export: &'a str,
    pub path: &'a Path,
    pub catalog: &'a Catalog,
}

/// One loading convention
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    fn format(&self) -> ModuleFormat;

    async fn load(&self, request: LoadRequest<'_>) -> std::result::Result<LoadedModule, LoadFailure>;
}

fn loader_for(format: ModuleFormat) -> Box<dyn ModuleLoader> {
    match format {
        ModuleFormat::Native => Box::new(NativeLoader),
        ModuleFormat::Manifest => Box::new(ManifestLoader),
    }
}

/// Load `export` from `location`, falling back to the other convention once
pub async fn load_module(
    export: &str,
    location: &ModuleLocation,
    catalog: &Catalog,
) -> Result<LoadedModule> {
    let path = location.module_path(export);
    let request = LoadRequest {
        export,
        path: &path,
        catalog,
    };

    let primary = detect_format(&path, location.format);
    debug!(export, path = %path.display(), format = %primary, "Loading module");

    match loader_for(primary).load(request).await {
        Ok(module) => Ok(module),
        Err(LoadFailure::Failed(error)) => Err(Error::module_load_with_source(
            &path,
            format!("{primary} module failed to load"),
            error,
        )),
        Err(first) => {
            let secondary = primary.other();
            debug!(
                export,
                path = %path.display(),
                reason = %first,
                fallback = %secondary,
                "Retrying module load with the other format"
            );
            loader_for(secondary).load(request).await.map_err(|second| {
                Error::module_load(
                    &path,
                    format!("{primary}: {first}; {secondary}: {second}"),
                )
            })
        }
    }
}
