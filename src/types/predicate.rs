//! Structured inclusion/exclusion rule extracted from trial text.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Confidence assigned to clauses that could not be parsed.
pub const UNPARSED_CONFIDENCE: f64 = 0.0;

/// Whether a predicate must hold (inclusion) or must not hold (exclusion).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
  Inclusion,
  Exclusion,
}

impl fmt::Display for RuleKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RuleKind::Inclusion => write!(f, "inclusion"),
      RuleKind::Exclusion => write!(f, "exclusion"),
    }
  }
}

/// What part of the patient profile a predicate talks about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "name", rename_all = "snake_case")]
pub enum Subject {
  Age,
  Gender,
  Weight,
  Condition,
  Medication,
  Lab(String),
  /// Clause text that no rule recognized.
  Unrecognized,
}

impl fmt::Display for Subject {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Subject::Age => write!(f, "age"),
      Subject::Gender => write!(f, "gender"),
      Subject::Weight => write!(f, "weight"),
      Subject::Condition => write!(f, "condition"),
      Subject::Medication => write!(f, "medication"),
      Subject::Lab(name) => write!(f, "lab {}", name),
      Subject::Unrecognized => write!(f, "unrecognized"),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
  Equals,
  GreaterThan,
  AtLeast,
  LessThan,
  AtMost,
  Contains,
  Excludes,
}

impl Operator {
  /// Compares a patient value (left) with the rule value (right).
  pub fn compare(&self, left: f64, right: f64) -> Option<bool> {
    match self {
      Operator::Equals => Some(left == right),
      Operator::GreaterThan => Some(left > right),
      Operator::AtLeast => Some(left >= right),
      Operator::LessThan => Some(left < right),
      Operator::AtMost => Some(left <= right),
      Operator::Contains | Operator::Excludes => None,
    }
  }

  pub fn symbol(&self) -> &'static str {
    match self {
      Operator::Equals => "=",
      Operator::GreaterThan => ">",
      Operator::AtLeast => ">=",
      Operator::LessThan => "<",
      Operator::AtMost => "<=",
      Operator::Contains => "contains",
      Operator::Excludes => "excludes",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredicateValue {
  Number(f64),
  Text(String),
}

impl fmt::Display for PredicateValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PredicateValue::Number(n) => write!(f, "{}", n),
      PredicateValue::Text(t) => write!(f, "{}", t),
    }
  }
}

/// One structured eligibility rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
  /// Stable id within one trial (`inc-1`, `exc-3`, ...).
  pub id: String,
  pub kind: RuleKind,
  pub subject: Subject,
  pub operator: Operator,
  pub value: PredicateValue,
  /// How sure extraction is that the clause was understood (0.0 - 1.0).
  pub confidence: f64,
  /// Clause text the predicate came from.
  pub source: String,
  /// Set when the clause could not be parsed; the predicate is then low confidence.
  pub note: Option<String>,
}

impl Predicate {
  pub fn is_low_confidence(&self) -> bool {
    self.note.is_some() || self.subject == Subject::Unrecognized
  }

  /// Human-readable form used in rationales, e.g. `inc-1 (age >= 18)`.
  pub fn describe(&self) -> String {
    match self.subject {
      Subject::Unrecognized => format!("{} (unparsed: \"{}\")", self.id, self.source),
      _ => format!(
        "{} ({} {} {})",
        self.id,
        self.subject,
        self.operator.symbol(),
        self.value
      ),
    }
  }
}
