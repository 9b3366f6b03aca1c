//! Terminal result of one pipeline run.

use serde::{Deserialize, Serialize};

use super::{StateContainer, Verdict};
use crate::error::PipelineError;

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
  /// Reached a terminal node without recoverable failures.
  Succeeded,
  /// Reached the fallback terminal after a recoverable failure.
  Degraded,
  /// Stopped on a fatal error.
  Failed,
}

impl RunStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      RunStatus::Succeeded => "succeeded",
      RunStatus::Degraded => "degraded",
      RunStatus::Failed => "failed",
    }
  }
}

/// Error that ended (or degraded) a run, with the node that raised it.
#[derive(Debug, Clone, PartialEq)]
pub struct RunFailure {
  pub node: String,
  pub error: PipelineError,
}

/// Final (or partial) state of a run plus how it ended.
#[derive(Debug, Clone)]
pub struct RunOutcome {
  pub status: RunStatus,
  /// Partial state when the run failed; never discarded.
  pub state: StateContainer,
  pub failure: Option<RunFailure>,
}

impl RunOutcome {
  pub fn verdict(&self) -> Option<Verdict> {
    self.state.verdict().map(|v| v.verdict)
  }

  pub fn patient_id(&self) -> Option<&str> {
    self.state.patient_profile().map(|p| p.patient_id.as_str())
  }

  /// Node ids in traversal order, as recorded in the audit log.
  pub fn visited_nodes(&self) -> Vec<&str> {
    self
      .state
      .audit_log()
      .iter()
      .map(|e| e.node.as_str())
      .collect()
  }
}
