//! Deterministic local reasoner over predicate evaluations.

use async_trait::async_trait;
use tracing::instrument;

use super::{Reasoner, ReasoningError, ReasoningRequest, ReasoningResponse};
use crate::types::{PredicateEvaluation, RuleKind, Satisfaction, Verdict};

/// Decides from the evaluations alone:
/// any failed inclusion or met exclusion makes the patient ineligible, all
/// inclusions met with no exclusion met makes them eligible, anything else is
/// indeterminate.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleReasoner;

impl RuleReasoner {
  pub fn new() -> Self {
    Self
  }
}

fn line(e: &PredicateEvaluation) -> String {
  let state = match (e.kind, e.satisfaction) {
    (_, Satisfaction::Unknown) => "could not be evaluated",
    (RuleKind::Inclusion, Satisfaction::Met) => "satisfied",
    (RuleKind::Inclusion, Satisfaction::NotMet) => "not satisfied",
    (RuleKind::Exclusion, Satisfaction::Met) => "triggered",
    (RuleKind::Exclusion, Satisfaction::NotMet) => "not triggered",
  };
  format!("{} {}: {}", e.predicate_id, state, e.detail)
}

/// Verdict over a set of evaluations.
#[instrument(level = "trace", skip(evaluations))]
pub fn decide(evaluations: &[PredicateEvaluation]) -> ReasoningResponse {
  let blocking = evaluations.iter().any(PredicateEvaluation::is_blocking);
  let unknown = evaluations
    .iter()
    .any(|e| e.satisfaction == Satisfaction::Unknown);
  let verdict = if blocking {
    Verdict::Ineligible
  } else if unknown {
    Verdict::Indeterminate
  } else {
    Verdict::Eligible
  };

  let known: Vec<f64> = evaluations
    .iter()
    .filter(|e| e.satisfaction != Satisfaction::Unknown)
    .map(|e| e.confidence)
    .collect();
  let confidence = (!known.is_empty()).then(|| known.iter().sum::<f64>() / known.len() as f64);

  ReasoningResponse {
    verdict,
    rationale: evaluations.iter().map(line).collect(),
    confidence,
  }
}

#[async_trait]
impl Reasoner for RuleReasoner {
  fn name(&self) -> &str {
    "rules"
  }

  async fn reason(&self, request: &ReasoningRequest) -> Result<ReasoningResponse, ReasoningError> {
    Ok(decide(&request.evaluations))
  }
}
