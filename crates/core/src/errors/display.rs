//! Display implementations for error types

use super::types::Error;
use std::fmt;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Configuration { message } => {
                write!(f, "configuration error: {message}")
            }
            Error::Resolution { key, message, .. } => {
                write!(f, "failed to resolve '{key}': {message}")
            }
            Error::ModuleLoad { path, message, .. } => {
                write!(
                    f,
                    "failed to load module '{}': {}",
                    path.display(),
                    message
                )
            }
            Error::SecretResolution {
                reference, message, ..
            } => {
                write!(f, "failed to resolve secret '{reference}': {message}")
            }
            Error::Template { name, message } => {
                write!(f, "template '{name}' error: {message}")
            }
            Error::ComponentAction {
                component,
                action,
                message,
            } => {
                write!(f, "component '{component}' failed during {action}: {message}")
            }
            Error::Environment { variable, message } => {
                write!(f, "environment variable '{variable}' error: {message}")
            }
            Error::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "file system {} operation failed for '{}': {}",
                    operation,
                    path.display(),
                    source
                )
            }
            Error::Json { message, .. } => {
                write!(f, "JSON error: {message}")
            }
            Error::Network { endpoint, message } => {
                write!(f, "network error for '{endpoint}': {message}")
            }
            Error::Encryption { message } => {
                write!(f, "encryption error: {message}")
            }
            Error::Unsupported { feature, message } => {
                write!(f, "unsupported feature '{feature}': {message}")
            }
        }
    }
}
