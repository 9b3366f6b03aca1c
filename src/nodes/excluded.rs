//! Terminal stage for patients short-circuited by a confident exclusion flag.

use async_trait::async_trait;

use super::exclusion_router::decisive_flags;
use super::stage::{Stage, StageContext, StageOutcome};
use crate::error::PipelineError;
use crate::types::{EligibilityVerdict, Field, FieldValue, StateContainer, Verdict};

pub struct ExcludedStage {
  name: String,
  threshold: f64,
}

impl ExcludedStage {
  pub fn new(name: impl Into<String>, threshold: f64) -> Self {
    Self {
      name: name.into(),
      threshold,
    }
  }
}

#[async_trait]
impl Stage for ExcludedStage {
  fn name(&self) -> &str {
    &self.name
  }

  fn requires(&self) -> &[Field] {
    &[Field::ExclusionFlags]
  }

  fn writes(&self) -> &[Field] {
    &[Field::Verdict]
  }

  async fn execute(
    &self,
    state: &StateContainer,
    _ctx: &StageContext,
  ) -> Result<StageOutcome, PipelineError> {
    let flags = decisive_flags(state.exclusion_flags().unwrap_or_default(), self.threshold);
    if flags.is_empty() {
      return Err(PipelineError::InvariantViolation(format!(
        "'{}' reached without an exclusion flag above {}",
        self.name, self.threshold
      )));
    }
    let verdict = EligibilityVerdict {
      verdict: Verdict::Ineligible,
      rationale: flags
        .iter()
        .map(|f| format!("{} excludes (confidence {:.2}): {}", f.predicate_id, f.confidence, f.detail))
        .collect(),
      cited_predicates: flags.iter().map(|f| f.predicate_id.clone()).collect(),
      confidence: flags.iter().map(|f| f.confidence).reduce(f64::max),
      decided_by: self.name.clone(),
      degraded: false,
    };
    let summary = format!("ineligible: excluded by {}", verdict.cited_predicates.join(", "));
    Ok(StageOutcome::new(summary).with(FieldValue::Verdict(verdict)))
  }
}
