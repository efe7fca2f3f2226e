use rigger_core::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A lifecycle action a component can be driven through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Deploy,
    Undeploy,
    Destroy,
    Validate,
    Status,
    /// Pre-provisioning phase run before `deploy`
    Setup,
}

impl Action {
    /// Actions a pipeline run can be started with
    pub const RUNNABLE: [Action; 5] = [
        Action::Deploy,
        Action::Undeploy,
        Action::Destroy,
        Action::Validate,
        Action::Status,
    ];

    /// Action a component is invoked with; `destroy` drives `undeploy`
    pub fn component_action(self) -> Action {
        match self {
            Action::Destroy => Action::Undeploy,
            other => other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Deploy => "deploy",
            Action::Undeploy => "undeploy",
            Action::Destroy => "destroy",
            Action::Validate => "validate",
            Action::Status => "status",
            Action::Setup => "setup",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "deploy" => Ok(Action::Deploy),
            "undeploy" => Ok(Action::Undeploy),
            "destroy" => Ok(Action::Destroy),
            "validate" => Ok(Action::Validate),
            "status" => Ok(Action::Status),
            "setup" => Ok(Action::Setup),
            other => Err(Error::configuration(format!("unknown action '{other}'"))),
        }
    }
}
