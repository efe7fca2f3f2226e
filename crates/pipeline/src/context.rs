use crate::action::Action;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Arguments every pipeline action accepts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunArgs {
    /// Template name, looked up in the template store
    pub template: String,
    pub stack: Option<String>,
    pub project: Option<String>,
    /// Free-form run configuration handed to every component
    pub config: Map<String, Value>,
}

impl RunArgs {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    #[must_use]
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: Map<String, Value>) -> Self {
        self.config = config;
        self
    }
}

/// Read-only run information passed to every component invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineContext {
    pub run_id: String,
    pub action: Action,
    pub template: String,
    pub engine: Option<String>,
    pub stack: Option<String>,
    pub project: Option<String>,
    pub config: Map<String, Value>,
    /// Stack-level settings declared by the template
    pub stack_settings: Map<String, Value>,
}
