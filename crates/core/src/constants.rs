//! Constants used throughout the rigger codebase

// Well-known registry keys
pub const TEMPLATE_SERVICE_KEY: &str = "template";
pub const SECRET_SERVICE_KEY: &str = "secret";
pub const EVENTS_SERVICE_KEY: &str = "events";
pub const PASSTHROUGH_COMPONENT_KEY: &str = "Passthrough";

// Environment variable names
pub const RIGGER_LOG_VAR: &str = "RIGGER_LOG";
pub const RIGGER_TEMPLATES_DIR_VAR: &str = "RIGGER_TEMPLATES_DIR";
pub const RIGGER_SECRET_TYPE_VAR: &str = "RIGGER_SECRET_TYPE";
pub const RIGGER_SECRET_SOURCE_VAR: &str = "RIGGER_SECRET_SOURCE";

// Configuration files
pub const SETTINGS_FILENAMES: [&str; 3] = ["rigger.json", "rigger.yaml", "rigger.yml"];

// Module loading
pub const MODULE_MANIFEST_FILENAME: &str = "module.json";

// Defaults
pub const DEFAULT_TEMPLATES_DIR: &str = "templates";
pub const DEFAULT_KEY_VAULT_NAMESPACE: &str = "encryption.__keyVault";
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;
