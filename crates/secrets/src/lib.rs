//! Secret storage for rigger.
//!
//! [`SecretBackend`] is the resolve/save contract every storage technology
//! implements. [`SecretManager`] picks one from [`SecretSettings`] and is the
//! only type the rest of the workspace talks to.

pub mod backend;
pub mod encrypted;
pub mod environment;
pub mod manager;
pub mod settings;
pub mod vault;

pub use backend::{base_endpoint, parse_endpoint, SecretBackend, SecretOptions};
pub use encrypted::{EncryptedStoreBackend, EncryptionContext, KmsProvider, DATA_KEY_LENGTH};
pub use environment::EnvironmentBackend;
pub use manager::SecretManager;
pub use settings::{SecretBackendKind, SecretSettings, SecretSource};
pub use vault::VaultBackend;
