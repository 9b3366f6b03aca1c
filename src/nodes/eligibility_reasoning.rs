//! Eligibility reasoning: delegate the final decision to a [Reasoner] under a timeout.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use super::stage::{Stage, StageContext, StageOutcome};
use crate::error::PipelineError;
use crate::reasoning::{Reasoner, ReasoningRequest, ReasoningResponse};
use crate::types::{
  DurationClass, EligibilityVerdict, Field, FieldValue, PredicateEvaluation, Satisfaction,
  StateContainer, Verdict,
};

/// Slow stage calling the configured reasoner.
pub struct EligibilityReasoningStage {
  name: String,
  reasoner: Arc<dyn Reasoner>,
}

impl EligibilityReasoningStage {
  pub fn new(name: impl Into<String>, reasoner: Arc<dyn Reasoner>) -> Self {
    Self {
      name: name.into(),
      reasoner,
    }
  }
}

/// Predicates that drove `verdict`.
pub(crate) fn cited_for(verdict: Verdict, evaluations: &[PredicateEvaluation]) -> Vec<&PredicateEvaluation> {
  evaluations
    .iter()
    .filter(|e| match verdict {
      Verdict::Eligible => e.is_satisfied(),
      Verdict::Ineligible => e.is_blocking(),
      Verdict::Indeterminate => e.satisfaction == Satisfaction::Unknown,
    })
    .collect()
}

/// True when `line` names predicate `id` as a whole token (`inc-1` is not `inc-10`).
fn mentions(line: &str, id: &str) -> bool {
  line
    .split(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
    .any(|token| token.eq_ignore_ascii_case(id))
}

/// Reasoner rationale, completed with a line for each cited predicate it did not mention.
#[instrument(level = "trace", skip(response, evaluations))]
pub(crate) fn build_verdict(
  decided_by: &str,
  response: ReasoningResponse,
  evaluations: &[PredicateEvaluation],
) -> EligibilityVerdict {
  let cited = cited_for(response.verdict, evaluations);
  let mut rationale = response.rationale;
  for e in &cited {
    if !rationale.iter().any(|line| mentions(line, &e.predicate_id)) {
      rationale.push(format!("{}: {}", e.predicate_id, e.detail));
    }
  }
  EligibilityVerdict {
    verdict: response.verdict,
    rationale,
    cited_predicates: cited.iter().map(|e| e.predicate_id.clone()).collect(),
    confidence: response.confidence,
    decided_by: decided_by.to_string(),
    degraded: false,
  }
}

#[async_trait]
impl Stage for EligibilityReasoningStage {
  fn name(&self) -> &str {
    &self.name
  }

  fn requires(&self) -> &[Field] {
    &[Field::PatientProfile, Field::Predicates, Field::Features]
  }

  fn writes(&self) -> &[Field] {
    &[Field::Verdict]
  }

  fn duration_class(&self) -> DurationClass {
    DurationClass::Slow
  }

  async fn execute(
    &self,
    state: &StateContainer,
    ctx: &StageContext,
  ) -> Result<StageOutcome, PipelineError> {
    let (Some(profile), Some(predicates), Some(evaluations)) =
      (state.patient_profile(), state.predicates(), state.features())
    else {
      return Err(PipelineError::InvariantViolation(
        "reasoning needs profile, predicates and features".to_string(),
      ));
    };
    let request = ReasoningRequest {
      profile: profile.clone(),
      predicates: predicates.to_vec(),
      evaluations: evaluations.to_vec(),
    };

    let timeout = ctx.config.reasoning_timeout();
    let call = tokio::time::timeout(timeout, self.reasoner.reason(&request));
    let response = tokio::select! {
      biased;
      _ = ctx.cancel.cancelled() => {
        warn!(node = %self.name, "reasoning call abandoned on cancellation");
        return Err(PipelineError::Cancelled { node: self.name.clone() });
      }
      result = call => match result {
        Err(_) => {
          return Err(PipelineError::ReasoningTimeout {
            after_ms: ctx.config.reasoning_timeout_ms,
          });
        }
        Ok(Err(e)) => return Err(PipelineError::ReasoningUnavailable(e.to_string())),
        Ok(Ok(response)) => response,
      },
    };

    let verdict = build_verdict(&self.name, response, evaluations);
    info!(
      patient_id = %profile.patient_id,
      reasoner = self.reasoner.name(),
      verdict = %verdict.verdict,
      "reasoning complete"
    );
    let summary = format!(
      "{} via {} citing {} predicates",
      verdict.verdict,
      self.reasoner.name(),
      verdict.cited_predicates.len()
    );
    Ok(StageOutcome::new(summary).with(FieldValue::Verdict(verdict)))
  }
}
