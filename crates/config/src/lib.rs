//! Configuration for rigger.
//!
//! - **`settings`** / **`loader`**: orchestrator settings, discovered from
//!   `rigger.json` or `rigger.yaml` and overridable from the environment.
//! - **`template`**: pipeline templates and their component entries.
//! - **`store`**: the template store service the orchestrator resolves from
//!   its registry.

pub mod document;
pub mod loader;
pub mod settings;
pub mod store;
pub mod template;

pub use document::{read_document, DocumentFormat};
pub use loader::{find_settings_file, load_registration, LoadedSettings, SettingsLoader};
pub use settings::OrchestratorSettings;
pub use store::{FileTemplateStore, InMemoryTemplateStore, TemplateStore};
pub use template::{ComponentSpec, PipelineTemplate};
