//! Final eligibility verdict and degraded-run marker.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
  Eligible,
  Ineligible,
  Indeterminate,
}

impl fmt::Display for Verdict {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Verdict::Eligible => write!(f, "eligible"),
      Verdict::Ineligible => write!(f, "ineligible"),
      Verdict::Indeterminate => write!(f, "indeterminate"),
    }
  }
}

/// Verdict plus the reasoning that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityVerdict {
  pub verdict: Verdict,
  pub rationale: Vec<String>,
  /// Ids of the predicates that drove the decision.
  pub cited_predicates: Vec<String>,
  pub confidence: Option<f64>,
  /// Name of the node that decided (e.g. `eligibility_reasoning`, `excluded`).
  pub decided_by: String,
  /// True when a recoverable failure forced the fallback verdict.
  pub degraded: bool,
}

/// Recoverable failure the executor absorbed before jumping to the fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Degradation {
  pub node: String,
  pub error_kind: String,
  pub message: String,
}
