//! Security-related types for secret handling

use std::collections::HashSet;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Placeholder written in place of secret values when masking output
pub const MASK: &str = "***";

/// Set of resolved secret values, zeroized when dropped
#[derive(Debug, Default, Zeroize, ZeroizeOnDrop)]
pub struct SecretValues(#[zeroize(skip)] HashSet<SecretString>);

/// Secure string type that zeroizes on drop
#[derive(Debug, Clone, PartialEq, Eq, Hash, Zeroize, ZeroizeOnDrop)]
struct SecretString(String);

impl SecretValues {
    /// Create new empty secret values
    #[must_use]
    pub fn new() -> Self {
        Self(HashSet::new())
    }

    /// Insert a secret value; empty strings are ignored since they cannot be masked
    pub fn insert(&mut self, secret: impl Into<String>) {
        let secret = secret.into();
        if !secret.is_empty() {
            self.0.insert(SecretString(secret));
        }
    }

    /// Check if a value is a secret
    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|s| s.0 == value)
    }

    /// Get the number of secrets
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no secrets
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Replace every occurrence of a known secret in `text` with [`MASK`].
    ///
    /// Longer secrets are replaced first so a secret that contains another
    /// is not left partially visible.
    #[must_use]
    pub fn mask(&self, text: &str) -> String {
        let mut secrets: Vec<&str> = self.0.iter().map(|s| s.0.as_str()).collect();
        secrets.sort_by_key(|s| std::cmp::Reverse(s.len()));

        secrets
            .into_iter()
            .fold(text.to_string(), |acc, secret| acc.replace(secret, MASK))
    }

    /// Clear all secrets securely
    pub fn clear(&mut self) {
        // Drained values are zeroized via drop
        let _ = self.0.drain();
    }
}
