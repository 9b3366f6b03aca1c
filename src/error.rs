//! Error taxonomy for pipeline runs and graph construction.

use thiserror::Error;

use crate::types::Field;

/// Failure raised while a run walks the pipeline graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
  /// Input is missing something the run cannot default (patient identity, trial text).
  #[error("malformed input: {0}")]
  MalformedInput(String),
  /// A node was reached before the fields it reads were written.
  #[error("precondition not met for '{node}': field '{field}' is unset")]
  PreconditionNotMet { node: String, field: Field },
  /// A write broke the append-only rule or a stage broke its postcondition.
  #[error("invariant violation: {0}")]
  InvariantViolation(String),
  /// The reasoning collaborator failed or answered with garbage.
  #[error("reasoning unavailable: {0}")]
  ReasoningUnavailable(String),
  /// The reasoning collaborator did not answer in time.
  #[error("reasoning timed out after {after_ms} ms")]
  ReasoningTimeout { after_ms: u64 },
  /// A trial clause could not be turned into a structured predicate.
  #[error("unparseable rule: {clause}")]
  UnparseableRule { clause: String },
  /// The run was cancelled before `node` started.
  #[error("run cancelled before '{node}'")]
  Cancelled { node: String },
  /// The executor was pointed at a node the graph does not contain.
  #[error("node not found: {0}")]
  UnknownNode(String),
}

impl PipelineError {
  /// Recoverable failures are absorbed by the fallback terminal and mark the run degraded.
  pub fn is_recoverable(&self) -> bool {
    matches!(
      self,
      PipelineError::ReasoningUnavailable(_) | PipelineError::ReasoningTimeout { .. }
    )
  }

  /// Short machine-readable name used in audit entries and run records.
  pub fn kind(&self) -> &'static str {
    match self {
      PipelineError::MalformedInput(_) => "malformed_input",
      PipelineError::PreconditionNotMet { .. } => "precondition_not_met",
      PipelineError::InvariantViolation(_) => "invariant_violation",
      PipelineError::ReasoningUnavailable(_) => "reasoning_unavailable",
      PipelineError::ReasoningTimeout { .. } => "reasoning_timeout",
      PipelineError::UnparseableRule { .. } => "unparseable_rule",
      PipelineError::Cancelled { .. } => "cancelled",
      PipelineError::UnknownNode(_) => "unknown_node",
    }
  }
}

/// Failure raised by [crate::PipelineGraphBuilder::build].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  #[error("graph has no entry node")]
  MissingEntry,
  #[error("node '{0}' registered twice")]
  DuplicateNode(String),
  #[error("node '{0}' is referenced but never registered")]
  UnknownNode(String),
  #[error("stage '{0}' has more than one unconditional successor")]
  MultipleSuccessors(String),
  #[error("router '{0}' cannot have unconditional edges")]
  RouterWithEdge(String),
  #[error("router '{0}' has no label map")]
  RouterWithoutRoutes(String),
  #[error("conditional edges registered on '{0}', which is not a router")]
  RoutesOnStage(String),
  #[error("router '{router}' can return '{label}' but no successor is mapped")]
  UnmappedLabel { router: String, label: String },
  #[error("router '{router}' never returns mapped label '{label}'")]
  UnknownLabel { router: String, label: String },
  #[error("cycle detected through '{0}'")]
  Cycle(String),
  #[error("node '{0}' is unreachable from the entry node")]
  Unreachable(String),
  #[error("fallback '{0}' must be a terminal stage")]
  InvalidFallback(String),
}

/// Failure loading or validating a [crate::PipelineConfig].
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("reading config: {0}")]
  Io(#[from] std::io::Error),
  #[error("parsing config: {0}")]
  Parse(#[from] serde_json::Error),
  #[error("invalid config: {0}")]
  Invalid(String),
}
