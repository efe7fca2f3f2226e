use super::{LoadFailure, LoadRequest, LoadedExport, LoadedModule, ModuleFormat, ModuleLoader};
use async_trait::async_trait;

/// Loads modules compiled into the binary.
///
/// The file stem of the module path names the catalog export; the requested
/// export name is tried second.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeLoader;

#[async_trait]
impl ModuleLoader for NativeLoader {
    fn format(&self) -> ModuleFormat {
        ModuleFormat::Native
    }

    async fn load(&self, request: LoadRequest<'_>) -> Result<LoadedModule, LoadFailure> {
        let stem = request.path.file_stem().and_then(|stem| stem.to_str());

        let factory = stem
            .and_then(|stem| request.catalog.get(stem))
            .or_else(|| request.catalog.get(request.export));

        match factory {
            Some(factory) => Ok(LoadedModule {
                path: request.path.to_path_buf(),
                format: ModuleFormat::Native,
                export: LoadedExport::Factory(factory),
                args: Vec::new(),
            }),
            None if request.path.extension().is_some_and(|ext| ext == "json")
                && request.path.is_file() =>
            {
                Err(LoadFailure::FormatMismatch(format!(
                    "{} is a manifest",
                    request.path.display()
                )))
            }
            None => Err(LoadFailure::NotFound(format!(
                "no native export named '{}'",
                stem.unwrap_or(request.export)
            ))),
        }
    }
}
