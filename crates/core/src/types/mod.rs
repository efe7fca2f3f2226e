//! Core domain types shared across the rigger crates.
//!
//! - **`scope`**: the accumulating output scope threaded through a pipeline run
//! - **`security`**: secret value tracking and masking

pub mod scope;
pub mod security;

pub use scope::*;
pub use security::*;
