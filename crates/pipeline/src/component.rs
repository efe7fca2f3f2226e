//! The contract every pipeline component implements

use crate::action::Action;
use crate::context::PipelineContext;
use crate::result::ComponentResult;
use async_trait::async_trait;
use rigger_config::ComponentSpec;
use rigger_core::Result;
use rigger_registry::{Construction, Descriptor, Factory, Instance};
use serde_json::{Map, Value};
use std::sync::Arc;

/// A pluggable unit the orchestrator drives through lifecycle actions.
///
/// Components are shared through the registry, so every method takes
/// `&self`; a component that keeps state from `configure` uses interior
/// mutability.
#[async_trait]
pub trait Component: Send + Sync {
    /// Receive the template entry before any action runs
    async fn configure(&self, spec: &ComponentSpec) -> Result<()> {
        let _ = spec;
        Ok(())
    }

    /// Whether `action` is implemented. Unsupported actions are skipped
    fn supports(&self, action: Action) -> bool;

    /// Run one action.
    ///
    /// An `Err` aborts the run. Return a result with `success: false` to
    /// report a failure and let later components continue.
    async fn invoke(
        &self,
        action: Action,
        input: &Map<String, Value>,
        context: &PipelineContext,
    ) -> Result<Option<ComponentResult>>;
}

/// How components are stored in and resolved from the registry
pub type ComponentRef = Arc<dyn Component>;

/// Wrap a component so `Registry::resolve::<ComponentRef>` finds it
pub fn component_instance<C: Component + 'static>(component: C) -> Instance {
    Instance::new(Arc::new(component) as ComponentRef)
}

/// Register an already-built component under `key`
pub fn component_descriptor<C: Component + 'static>(
    key: impl Into<String>,
    component: C,
) -> Descriptor {
    Descriptor::instance(key, component_instance(component))
}

/// A catalog factory producing components from a construction request
pub fn component_factory<C, F>(name: impl Into<String>, build: F) -> Factory
where
    C: Component + 'static,
    F: Fn(Construction) -> Result<C> + Send + Sync + 'static,
{
    Factory::of(name, move |construction| {
        build(construction).map(|component| Arc::new(component) as ComponentRef)
    })
}
