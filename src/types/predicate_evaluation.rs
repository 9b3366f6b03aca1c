//! Per-predicate evaluation results produced by feature engineering.

use serde::{Deserialize, Serialize};

use super::RuleKind;

/// Whether the patient satisfies a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Satisfaction {
  Met,
  NotMet,
  /// Data missing or predicate unparsed.
  Unknown,
}

impl Satisfaction {
  /// Graded score: 1.0 met, 0.0 not met, 0.5 unknown.
  pub fn score(&self) -> f64 {
    match self {
      Satisfaction::Met => 1.0,
      Satisfaction::NotMet => 0.0,
      Satisfaction::Unknown => 0.5,
    }
  }
}

/// Evaluation of one predicate against one patient profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredicateEvaluation {
  pub predicate_id: String,
  pub kind: RuleKind,
  pub satisfaction: Satisfaction,
  pub score: f64,
  /// Confidence of the evaluation; zero when data was missing.
  pub confidence: f64,
  /// Profile fields read to reach the result (traceability).
  pub fields_used: Vec<String>,
  pub detail: String,
}

impl PredicateEvaluation {
  /// True when the patient is on the right side of the predicate.
  pub fn is_satisfied(&self) -> bool {
    matches!(
      (self.kind, self.satisfaction),
      (RuleKind::Inclusion, Satisfaction::Met) | (RuleKind::Exclusion, Satisfaction::NotMet)
    )
  }

  /// True when the predicate rules the patient out.
  pub fn is_blocking(&self) -> bool {
    matches!(
      (self.kind, self.satisfaction),
      (RuleKind::Inclusion, Satisfaction::NotMet) | (RuleKind::Exclusion, Satisfaction::Met)
    )
  }
}

/// An exclusion predicate that evaluated true for the patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExclusionFlag {
  pub predicate_id: String,
  pub confidence: f64,
  pub detail: String,
}
