//! Per-component and per-run results

use crate::action::Action;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What a component reports back from one action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentResult {
    pub success: bool,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Merged into the run's scope; later components can reference it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentResult {
    pub fn ok(action: Action) -> Self {
        Self {
            success: true,
            action,
            message: None,
            output: None,
            error: None,
        }
    }

    /// A failure reported as data; the run continues with the next component
    pub fn failed(action: Action, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::ok(action)
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_output(mut self, output: Map<String, Value>) -> Self {
        self.output = Some(output);
        self
    }
}

/// One entry of a run's result list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRun {
    pub component: String,
    /// `setup` for the deploy pre-phase, otherwise the run's action
    pub phase: Action,
    /// `None` when the component does not implement the action
    pub result: Option<ComponentResult>,
    pub duration_ms: u64,
}

/// Aggregate result of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRunResult {
    pub run_id: String,
    pub action: Action,
    pub template: String,
    pub success: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    /// The merged scope after the last component that ran
    pub output: Map<String, Value>,
    pub results: Vec<ComponentRun>,
    pub errors: Vec<String>,
}

impl PipelineRunResult {
    /// Results of one phase, in execution order
    pub fn phase(&self, phase: Action) -> impl Iterator<Item = &ComponentRun> {
        self.results.iter().filter(move |run| run.phase == phase)
    }

    /// Components whose action ran, in execution order
    pub fn invoked(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|run| run.result.is_some())
            .map(|run| run.component.as_str())
            .collect()
    }
}
