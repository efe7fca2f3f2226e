//! Core error type definitions

use std::path::PathBuf;

/// Result type alias for rigger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed source error carried by variants that wrap a lower-level failure
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Core error type for rigger operations using thiserror
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or invalid descriptors, settings or template fields
    Configuration { message: String },

    /// A registry key could not be turned into an instance
    Resolution {
        key: String,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// A module could not be loaded from its location
    ModuleLoad {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Secret resolution errors
    SecretResolution {
        reference: String,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Template loading or validation errors
    Template { name: String, message: String },

    /// A component action raised instead of reporting failure as data
    ComponentAction {
        component: String,
        action: String,
        message: String,
    },

    /// Environment variable related errors
    Environment { variable: String, message: String },

    /// File system operations
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization errors
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// Network-related errors
    Network { endpoint: String, message: String },

    /// Encryption and key management errors
    Encryption { message: String },

    /// Unsupported operation errors
    Unsupported { feature: String, message: String },
}
