use crate::action::Action;
use crate::component::Component;
use crate::context::PipelineContext;
use crate::result::ComponentResult;
use async_trait::async_trait;
use rigger_config::ComponentSpec;
use rigger_core::Result;
use serde_json::{Map, Value};
use tracing::debug;

/// Echoes its resolved input back as output for every action.
///
/// Useful for dry runs, and for surfacing values (stack settings, secrets
/// from setup) to later components through the scope.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughComponent;

impl PassthroughComponent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Component for PassthroughComponent {
    async fn configure(&self, spec: &ComponentSpec) -> Result<()> {
        debug!(component = %spec.name, inputs = spec.input.len(), "Passthrough configured");
        Ok(())
    }

    fn supports(&self, _action: Action) -> bool {
        true
    }

    async fn invoke(
        &self,
        action: Action,
        input: &Map<String, Value>,
        _context: &PipelineContext,
    ) -> Result<Option<ComponentResult>> {
        Ok(Some(
            ComponentResult::ok(action)
                .with_message(format!("passed through {} value(s)", input.len()))
                .with_output(input.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> PipelineContext {
        PipelineContext {
            run_id: "run".into(),
            action: Action::Validate,
            template: "web".into(),
            engine: Some("terraform".into()),
            stack: None,
            project: None,
            config: Map::new(),
            stack_settings: Map::new(),
        }
    }

    #[tokio::test]
    async fn test_output_equals_input() {
        let mut input = Map::new();
        input.insert("region".into(), json!("eu-west-1"));

        let result = PassthroughComponent::new()
            .invoke(Action::Validate, &input, &context())
            .await
            .unwrap()
            .unwrap();

        assert!(result.success);
        assert_eq!(result.action, Action::Validate);
        assert_eq!(result.output, Some(input));
    }
}
