//! Core domain types, errors, and constants for rigger.
//!
//! ## Key Components
//!
//! - **`errors`**: the primary `Error` enum and `Result` alias shared by every
//!   crate in the workspace.
//! - **`events`**: the event emitter used to report pipeline progress.
//! - **`types`**: the output `Scope` and secret tracking types.
//! - **`constants`**: well-known registry keys and environment variable names.

pub mod constants;
pub mod errors;
pub mod events;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, Result, ResultExt},
    events::{ComponentEvent, EventEmitter, PipelineEvent, SystemEvent},
    types::*,
};
