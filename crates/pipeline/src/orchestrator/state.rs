use parking_lot::Mutex;
use rigger_core::{Error, Result};
use serde::Serialize;
use std::fmt;

/// Where the orchestrator is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrchestratorState {
    Idle,
    Configured,
    Executing,
    Completed,
    Failed,
}

impl OrchestratorState {
    /// State after a run has been claimed
    pub(crate) fn begin(self) -> Result<Self> {
        match self {
            OrchestratorState::Idle => Err(Error::configuration(
                "orchestrator is not configured; call configure first",
            )),
            OrchestratorState::Executing => {
                Err(Error::configuration("a pipeline run is already in progress"))
            }
            OrchestratorState::Configured
            | OrchestratorState::Completed
            | OrchestratorState::Failed => Ok(OrchestratorState::Executing),
        }
    }

    pub(crate) fn finish(success: bool) -> Self {
        if success {
            OrchestratorState::Completed
        } else {
            OrchestratorState::Failed
        }
    }

    pub fn is_configured(self) -> bool {
        !matches!(self, OrchestratorState::Idle)
    }
}

/// Holds the orchestrator in `Executing` for one run.
///
/// A claim dropped without [`release`](RunClaim::release), as happens when
/// the run future is cancelled, leaves the state `Failed`.
pub(crate) struct RunClaim<'a> {
    state: &'a Mutex<OrchestratorState>,
    released: bool,
}

impl<'a> RunClaim<'a> {
    pub(crate) fn acquire(state: &'a Mutex<OrchestratorState>) -> Result<Self> {
        let mut guard = state.lock();
        *guard = guard.begin()?;
        Ok(Self {
            state,
            released: false,
        })
    }

    pub(crate) fn release(mut self, success: bool) {
        *self.state.lock() = OrchestratorState::finish(success);
        self.released = true;
    }
}

impl Drop for RunClaim<'_> {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!("Pipeline run was cancelled before it finished");
            *self.state.lock() = OrchestratorState::Failed;
        }
    }
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrchestratorState::Idle => "idle",
            OrchestratorState::Configured => "configured",
            OrchestratorState::Executing => "executing",
            OrchestratorState::Completed => "completed",
            OrchestratorState::Failed => "failed",
        };
        f.write_str(name)
    }
}
