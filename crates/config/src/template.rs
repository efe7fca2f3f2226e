//! Pipeline templates: an ordered list of components plus stack settings

use rigger_core::{Error, Result};
use rigger_variables::VariableDescriptor;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One component entry of a template
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    /// Registry key of the component
    pub name: String,
    /// Variables resolved before the main action
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input: Vec<VariableDescriptor>,
    /// Variables resolved before the deploy setup phase
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub setup: Vec<VariableDescriptor>,
    /// Everything else, passed to the component untouched
    #[serde(flatten)]
    pub config: Map<String, Value>,
}

impl ComponentSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_input(mut self, input: Vec<VariableDescriptor>) -> Self {
        self.input = input;
        self
    }

    #[must_use]
    pub fn with_setup(mut self, setup: Vec<VariableDescriptor>) -> Self {
        self.setup = setup;
        self
    }

    #[must_use]
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }
}

/// A named, versioned pipeline definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineTemplate {
    pub name: String,
    /// Provisioning engine the template targets; required
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Stack-level provisioning settings
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub stack: Map<String, Value>,
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
}

impl PipelineTemplate {
    pub fn new(name: impl Into<String>, engine: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            engine: Some(engine.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_component(mut self, component: ComponentSpec) -> Self {
        self.components.push(component);
        self
    }

    /// Check the fields every run depends on
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::configuration("template has no name"));
        }
        match self.engine.as_deref() {
            Some(engine) if !engine.trim().is_empty() => {}
            _ => {
                return Err(Error::configuration(format!(
                    "template '{}' does not declare an engine",
                    self.name
                )))
            }
        }
        if let Some(index) = self.components.iter().position(|c| c.name.trim().is_empty()) {
            return Err(Error::template(
                &self.name,
                format!("component #{index} has no name"),
            ));
        }
        Ok(())
    }

    pub fn component_names(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentFormat;
    use rigger_variables::VariableKind;
    use serde_json::json;

    const TEMPLATE: &str = r#"
name: web
engine: pulumi
version: "1.2"
stack:
  region: eu-west-1
components:
  - name: Network
    cidr: 10.0.0.0/16
    setup:
      - name: vpc_name
        value: main
  - name: Cluster
    input:
      - name: vpc
        type: reference
        value: vpc_id
"#;

    #[test]
    fn test_yaml_template_with_freeform_config() {
        let template: PipelineTemplate = DocumentFormat::Yaml.parse(TEMPLATE, "web.yaml").unwrap();

        template.validate().unwrap();
        assert_eq!(template.component_names(), vec!["Network", "Cluster"]);
        assert_eq!(template.stack["region"], json!("eu-west-1"));

        let network = &template.components[0];
        assert_eq!(network.config["cidr"], json!("10.0.0.0/16"));
        assert_eq!(network.setup.len(), 1);
        assert!(network.input.is_empty());
        assert_eq!(template.components[1].input[0].kind, VariableKind::Reference);
    }

    #[test]
    fn test_missing_engine_is_configuration_error() {
        let template: PipelineTemplate =
            serde_json::from_value(json!({ "name": "web", "components": [] })).unwrap();
        assert!(matches!(template.validate(), Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_unnamed_component_is_template_error() {
        let template = PipelineTemplate::new("web", "pulumi").with_component(ComponentSpec::new(""));
        assert!(matches!(template.validate(), Err(Error::Template { .. })));
    }
}
