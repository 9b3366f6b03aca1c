//! Fallback terminal reached after a recoverable failure.

use async_trait::async_trait;
use tracing::warn;

use super::stage::{Stage, StageContext, StageOutcome};
use crate::error::PipelineError;
use crate::types::{EligibilityVerdict, Field, FieldValue, StateContainer, Verdict};

/// Writes an indeterminate, degraded verdict explaining what failed.
pub struct IndeterminateStage {
  name: String,
}

impl IndeterminateStage {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into() }
  }
}

#[async_trait]
impl Stage for IndeterminateStage {
  fn name(&self) -> &str {
    &self.name
  }

  fn requires(&self) -> &[Field] {
    &[Field::Degradation]
  }

  fn writes(&self) -> &[Field] {
    &[Field::Verdict]
  }

  async fn execute(
    &self,
    state: &StateContainer,
    _ctx: &StageContext,
  ) -> Result<StageOutcome, PipelineError> {
    let degradation = state.degradation().ok_or_else(|| {
      PipelineError::InvariantViolation(format!("'{}' reached without a degradation", self.name))
    })?;
    warn!(
      node = %degradation.node,
      error_kind = %degradation.error_kind,
      "verdict downgraded to indeterminate"
    );
    let verdict = EligibilityVerdict {
      verdict: Verdict::Indeterminate,
      rationale: vec![format!(
        "{} failed ({}): {}",
        degradation.node, degradation.error_kind, degradation.message
      )],
      cited_predicates: Vec::new(),
      confidence: None,
      decided_by: self.name.clone(),
      degraded: true,
    };
    let summary = format!("indeterminate after {} in {}", degradation.error_kind, degradation.node);
    Ok(StageOutcome::new(summary).with(FieldValue::Verdict(verdict)))
  }
}
