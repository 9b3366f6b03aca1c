//! Field keys and values of the run state.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{
  Degradation, EligibilityVerdict, ExclusionFlag, PatientProfile, Predicate, PredicateEvaluation,
  RawRecord,
};

/// Key of one slot in the [super::StateContainer].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
  RawPatient,
  TrialText,
  PatientProfile,
  Predicates,
  Features,
  ExclusionFlags,
  Degradation,
  Verdict,
}

impl Field {
  pub fn as_str(&self) -> &'static str {
    match self {
      Field::RawPatient => "raw_patient",
      Field::TrialText => "trial_text",
      Field::PatientProfile => "patient_profile",
      Field::Predicates => "predicates",
      Field::Features => "features",
      Field::ExclusionFlags => "exclusion_flags",
      Field::Degradation => "degradation",
      Field::Verdict => "verdict",
    }
  }
}

impl fmt::Display for Field {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Typed value stored under a [Field].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
  RawPatient(RawRecord),
  TrialText(String),
  PatientProfile(PatientProfile),
  Predicates(Vec<Predicate>),
  Features(Vec<PredicateEvaluation>),
  ExclusionFlags(Vec<ExclusionFlag>),
  Degradation(Degradation),
  Verdict(EligibilityVerdict),
}

impl FieldValue {
  /// The only field this value may be stored under.
  pub fn field(&self) -> Field {
    match self {
      FieldValue::RawPatient(_) => Field::RawPatient,
      FieldValue::TrialText(_) => Field::TrialText,
      FieldValue::PatientProfile(_) => Field::PatientProfile,
      FieldValue::Predicates(_) => Field::Predicates,
      FieldValue::Features(_) => Field::Features,
      FieldValue::ExclusionFlags(_) => Field::ExclusionFlags,
      FieldValue::Degradation(_) => Field::Degradation,
      FieldValue::Verdict(_) => Field::Verdict,
    }
  }
}

/// One write requested by a stage.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
  pub field: Field,
  pub value: FieldValue,
}

impl FieldUpdate {
  /// Update keyed by the value's own field.
  pub fn of(value: FieldValue) -> Self {
    Self {
      field: value.field(),
      value,
    }
  }
}
