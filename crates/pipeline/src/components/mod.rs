//! Components shipped with the orchestrator

pub mod passthrough;

pub use passthrough::PassthroughComponent;
