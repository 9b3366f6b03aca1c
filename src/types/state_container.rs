//! Append-only state threaded through one pipeline run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use super::{
  AuditEntry, Degradation, EligibilityVerdict, ExclusionFlag, Field, FieldValue, PatientProfile,
  Predicate, PredicateEvaluation, RawRecord,
};
use crate::error::PipelineError;

/// State of one patient × trial run.
///
/// Fields can be written once; writing the same value again is a no-op and
/// writing a different one is an [PipelineError::InvariantViolation]. The audit
/// log is the only part that keeps growing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateContainer {
  run_id: Uuid,
  fields: BTreeMap<Field, FieldValue>,
  audit_log: Vec<AuditEntry>,
}

impl StateContainer {
  pub fn new() -> Self {
    Self::with_run_id(Uuid::new_v4())
  }

  pub fn with_run_id(run_id: Uuid) -> Self {
    Self {
      run_id,
      fields: BTreeMap::new(),
      audit_log: Vec::new(),
    }
  }

  pub fn run_id(&self) -> Uuid {
    self.run_id
  }

  /// Current value of `field`, or `None` when unset.
  pub fn get(&self, field: Field) -> Option<&FieldValue> {
    self.fields.get(&field)
  }

  pub fn is_set(&self, field: Field) -> bool {
    self.fields.contains_key(&field)
  }

  /// Fields written so far, in key order.
  pub fn set_fields(&self) -> impl Iterator<Item = Field> + '_ {
    self.fields.keys().copied()
  }

  /// Writes `value` under `field`, enforcing the append-only rule.
  #[instrument(level = "trace", skip(self, value))]
  pub fn set(&mut self, field: Field, value: FieldValue) -> Result<(), PipelineError> {
    if value.field() != field {
      return Err(PipelineError::InvariantViolation(format!(
        "value of kind '{}' cannot be stored under '{}'",
        value.field(),
        field
      )));
    }
    match self.fields.get(&field) {
      Some(existing) if *existing == value => Ok(()),
      Some(_) => Err(PipelineError::InvariantViolation(format!(
        "field '{}' is already set and cannot be overwritten",
        field
      ))),
      None => {
        self.fields.insert(field, value);
        Ok(())
      }
    }
  }

  /// Appends an audit entry; its step number is assigned here.
  pub fn record(&mut self, mut entry: AuditEntry) {
    entry.step = self.audit_log.len() as u32 + 1;
    self.audit_log.push(entry);
  }

  pub fn audit_log(&self) -> &[AuditEntry] {
    &self.audit_log
  }

  pub fn raw_patient(&self) -> Option<&RawRecord> {
    match self.get(Field::RawPatient)? {
      FieldValue::RawPatient(r) => Some(r),
      _ => None,
    }
  }

  pub fn trial_text(&self) -> Option<&str> {
    match self.get(Field::TrialText)? {
      FieldValue::TrialText(t) => Some(t),
      _ => None,
    }
  }

  pub fn patient_profile(&self) -> Option<&PatientProfile> {
    match self.get(Field::PatientProfile)? {
      FieldValue::PatientProfile(p) => Some(p),
      _ => None,
    }
  }

  pub fn predicates(&self) -> Option<&[Predicate]> {
    match self.get(Field::Predicates)? {
      FieldValue::Predicates(p) => Some(p),
      _ => None,
    }
  }

  pub fn features(&self) -> Option<&[PredicateEvaluation]> {
    match self.get(Field::Features)? {
      FieldValue::Features(f) => Some(f),
      _ => None,
    }
  }

  pub fn exclusion_flags(&self) -> Option<&[ExclusionFlag]> {
    match self.get(Field::ExclusionFlags)? {
      FieldValue::ExclusionFlags(f) => Some(f),
      _ => None,
    }
  }

  pub fn degradation(&self) -> Option<&Degradation> {
    match self.get(Field::Degradation)? {
      FieldValue::Degradation(d) => Some(d),
      _ => None,
    }
  }

  pub fn verdict(&self) -> Option<&EligibilityVerdict> {
    match self.get(Field::Verdict)? {
      FieldValue::Verdict(v) => Some(v),
      _ => None,
    }
  }
}

impl Default for StateContainer {
  fn default() -> Self {
    Self::new()
  }
}
