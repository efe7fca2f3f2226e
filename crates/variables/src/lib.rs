//! Component input resolution.
//!
//! A component declares its inputs as a list of [`VariableDescriptor`]s. The
//! [`VariableResolver`] turns that list into one flat map, reading literals,
//! environment variables, earlier components' outputs and secrets.

pub mod descriptor;
pub mod resolver;

pub use descriptor::{VariableDescriptor, VariableKind};
pub use resolver::{ResolvedVariables, VariableResolver};
