//! Rule extraction: trial text to structured predicates.

use async_trait::async_trait;
use tracing::info;

use super::stage::{Stage, StageContext, StageOutcome};
use crate::error::PipelineError;
use crate::trial_text;
use crate::types::{Field, FieldValue, StateContainer};

/// Stage parsing the trial text into inclusion/exclusion predicates.
pub struct RuleExtractionStage {
  name: String,
}

impl RuleExtractionStage {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into() }
  }
}

#[async_trait]
impl Stage for RuleExtractionStage {
  fn name(&self) -> &str {
    &self.name
  }

  fn requires(&self) -> &[Field] {
    &[Field::TrialText]
  }

  fn writes(&self) -> &[Field] {
    &[Field::Predicates]
  }

  async fn execute(
    &self,
    state: &StateContainer,
    _ctx: &StageContext,
  ) -> Result<StageOutcome, PipelineError> {
    let text = state.trial_text().unwrap_or("");
    if text.trim().is_empty() {
      return Err(PipelineError::MalformedInput(
        "trial eligibility text is empty".to_string(),
      ));
    }
    let clauses = trial_text::segment(text);
    if clauses.is_empty() {
      return Err(PipelineError::MalformedInput(
        "trial text has no inclusion or exclusion criteria".to_string(),
      ));
    }
    let predicates = trial_text::extract_predicates(&clauses);
    let low = predicates.iter().filter(|p| p.is_low_confidence()).count();
    info!(
      clauses = clauses.len(),
      predicates = predicates.len(),
      low_confidence = low,
      "rules extracted"
    );
    let summary = format!(
      "{} predicates from {} clauses ({} low-confidence)",
      predicates.len(),
      clauses.len(),
      low
    );
    Ok(StageOutcome::new(summary).with(FieldValue::Predicates(predicates)))
  }
}
