//! Reasoning collaborators invoked by the eligibility reasoning stage.
//!
//! A [Reasoner] sees the patient profile, the extracted predicates and their
//! evaluations, and answers with a verdict and rationale. The stage bounds every
//! call with a timeout, so implementations may be slow or unreliable.

pub mod command;
pub mod json_repair;
pub mod ollama;
pub mod rules;

#[cfg(test)]
mod rules_test;

pub use command::CommandReasoner;
pub use ollama::OllamaReasoner;
pub use rules::RuleReasoner;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::{PatientProfile, Predicate, PredicateEvaluation, RuleKind, Verdict};

/// Everything a reasoner may look at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReasoningRequest {
  pub profile: PatientProfile,
  pub predicates: Vec<Predicate>,
  pub evaluations: Vec<PredicateEvaluation>,
}

/// Verdict proposed by a reasoner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningResponse {
  pub verdict: Verdict,
  pub rationale: Vec<String>,
  pub confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReasoningError {
  /// The collaborator could not be reached or failed to run.
  #[error("reasoner unavailable: {0}")]
  Unavailable(String),
  /// The collaborator answered but the answer could not be decoded.
  #[error("invalid reasoner response: {0}")]
  InvalidResponse(String),
}

/// Narrow interface to an external (possibly slow) reasoning capability.
#[async_trait]
pub trait Reasoner: Send + Sync {
  fn name(&self) -> &str;

  async fn reason(&self, request: &ReasoningRequest) -> Result<ReasoningResponse, ReasoningError>;
}

impl ReasoningRequest {
  fn criteria(&self, kind: RuleKind) -> Vec<String> {
    self
      .predicates
      .iter()
      .filter(|p| p.kind == kind)
      .map(|p| p.source.clone())
      .collect()
  }

  /// Prompt for language-model reasoners. Asks for a single JSON object.
  pub fn prompt(&self) -> String {
    let input = serde_json::json!({
      "patient_data": {
        "age": self.profile.age,
        "gender": self.profile.gender,
        "weight": self.profile.weight,
        "diagnoses": self.profile.conditions,
        "medications": self.profile.medications,
        "labs": self.profile.labs,
      },
      "inclusion_criteria": self.criteria(RuleKind::Inclusion),
      "exclusion_criteria": self.criteria(RuleKind::Exclusion),
      "rule_evaluations": self.evaluations,
    });
    let input = serde_json::to_string_pretty(&input).unwrap_or_default();
    format!(
      "You are a clinical trial eligibility reasoning agent.\n\
       Decide whether the patient meets the INCLUSION criteria. No exclusion \
       criterion was confidently triggered.\n\n\
       INPUT DATA:\n{input}\n\n\
       INSTRUCTIONS:\n\
       1. Compare the patient data against every inclusion criterion.\n\
       2. If data needed for a criterion is missing, say so in the reasoning.\n\
       3. Assign a confidence score between 0.0 and 1.0.\n\
       4. Give step-by-step reasoning that names the criteria you used.\n\n\
       OUTPUT VALID JSON ONLY:\n\
       {{\"eligible\": true|false|null, \"confidence\": 0.0, \"reasoning\": [\"...\"], \"summary\": \"...\"}}\n"
    )
  }
}

/// Decodes a model answer of the form
/// `{"eligible": bool|null, "confidence": f, "reasoning": [..]|"..", "summary": ".."}`.
///
/// `eligible: null` (or a `verdict` string of `indeterminate`) maps to
/// [Verdict::Indeterminate].
pub fn decode_answer(value: &Value) -> Result<ReasoningResponse, ReasoningError> {
  let obj = value
    .as_object()
    .ok_or_else(|| ReasoningError::InvalidResponse("answer is not a JSON object".to_string()))?;

  let verdict = match (obj.get("eligible"), obj.get("verdict").and_then(Value::as_str)) {
    (Some(Value::Bool(true)), _) => Verdict::Eligible,
    (Some(Value::Bool(false)), _) => Verdict::Ineligible,
    (_, Some(v)) => match v.trim().to_lowercase().as_str() {
      "eligible" => Verdict::Eligible,
      "ineligible" | "not eligible" => Verdict::Ineligible,
      "indeterminate" | "unknown" => Verdict::Indeterminate,
      other => {
        return Err(ReasoningError::InvalidResponse(format!(
          "unknown verdict '{}'",
          other
        )));
      }
    },
    (Some(Value::Null), None) => Verdict::Indeterminate,
    _ => {
      return Err(ReasoningError::InvalidResponse(
        "answer has no 'eligible' field".to_string(),
      ));
    }
  };

  let confidence = obj
    .get("confidence")
    .and_then(Value::as_f64)
    .filter(|c| c.is_finite())
    .map(|c| c.clamp(0.0, 1.0));

  let mut rationale = Vec::new();
  if let Some(summary) = obj.get("summary").and_then(Value::as_str) {
    if !summary.trim().is_empty() {
      rationale.push(summary.trim().to_string());
    }
  }
  match obj.get("reasoning") {
    Some(Value::Array(items)) => rationale.extend(
      items
        .iter()
        .filter_map(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()),
    ),
    Some(Value::String(s)) if !s.trim().is_empty() => rationale.push(s.trim().to_string()),
    _ => {}
  }

  Ok(ReasoningResponse {
    verdict,
    rationale,
    confidence,
  })
}
