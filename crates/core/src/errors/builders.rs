//! Builder methods for creating errors with context

use super::types::{BoxedSource, Error};
use std::path::PathBuf;

// Helper methods for creating errors with context
impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a resolution error for a registry key
    #[must_use]
    pub fn resolution(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Resolution {
            key: key.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a resolution error caused by another failure
    #[must_use]
    pub fn resolution_with_source(
        key: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<BoxedSource>,
    ) -> Self {
        Error::Resolution {
            key: key.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a module load error for the attempted path
    #[must_use]
    pub fn module_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::ModuleLoad {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a module load error with a source error
    #[must_use]
    pub fn module_load_with_source(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: impl Into<BoxedSource>,
    ) -> Self {
        Error::ModuleLoad {
            path: path.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a secret resolution error
    #[must_use]
    pub fn secret_resolution(reference: impl Into<String>, message: impl Into<String>) -> Self {
        Error::SecretResolution {
            reference: reference.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a secret resolution error with a source error
    #[must_use]
    pub fn secret_resolution_with_source(
        reference: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<BoxedSource>,
    ) -> Self {
        Error::SecretResolution {
            reference: reference.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a template error
    #[must_use]
    pub fn template(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Template {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a component action error
    #[must_use]
    pub fn component_action(
        component: impl Into<String>,
        action: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::ComponentAction {
            component: component.into(),
            action: action.into(),
            message: message.into(),
        }
    }

    /// Create an environment variable error
    #[must_use]
    pub fn environment(variable: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Environment {
            variable: variable.into(),
            message: message.into(),
        }
    }

    /// Create a file system error with context
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Create a network error
    #[must_use]
    pub fn network(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Network {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create an encryption error
    #[must_use]
    pub fn encryption(message: impl Into<String>) -> Self {
        Error::Encryption {
            message: message.into(),
        }
    }

    /// Create an unsupported feature error
    #[must_use]
    pub fn unsupported(feature: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Unsupported {
            feature: feature.into(),
            message: message.into(),
        }
    }

    /// Whether this error must abort a pipeline run.
    ///
    /// Secret resolution failures are the only tolerated class: the variable
    /// resolver degrades them to the descriptor default.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::SecretResolution { .. })
    }
}
