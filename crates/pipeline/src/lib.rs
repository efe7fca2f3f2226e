//! Pipeline orchestration for rigger.
//!
//! A pipeline template lists components by registry key. For each action
//! (`deploy`, `undeploy`, `destroy`, `validate`, `status`) the
//! [`Orchestrator`] resolves every component, resolves its input variables
//! against the outputs of the components before it, and invokes the action.
//!
//! Components implement [`Component`]. A component that returns an error
//! stops the run; one that returns a result with `success: false` is
//! recorded and the run moves on.

pub mod action;
pub mod component;
pub mod components;
pub mod context;
pub mod orchestrator;
pub mod result;

pub use action::Action;
pub use component::{
    component_descriptor, component_factory, component_instance, Component, ComponentRef,
};
pub use components::PassthroughComponent;
pub use context::{PipelineContext, RunArgs};
pub use orchestrator::{Orchestrator, OrchestratorState};
pub use result::{ComponentResult, ComponentRun, PipelineRunResult};
