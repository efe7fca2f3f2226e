//! Shared utilities for rigger
//!
//! Logging setup, retry with backoff for remote calls, and atomic file writes.

pub mod atomic_file;
pub mod retry;
pub mod tracing;

pub use atomic_file::*;
pub use retry::*;
