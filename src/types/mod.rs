//! Data model of a screening run: state fields, predicates, evaluations, verdicts
//! and the audit log.

mod audit_entry;
mod field;
mod patient_profile;
mod predicate;
#[cfg(test)]
mod predicate_test;
mod predicate_evaluation;
mod run_outcome;
mod state_container;
mod verdict;

pub use audit_entry::{AuditEntry, DurationClass, NodeKind, StepStatus};
pub use field::{Field, FieldUpdate, FieldValue};
pub use patient_profile::{PatientProfile, RawRecord};
pub use predicate::{Operator, Predicate, PredicateValue, RuleKind, Subject, UNPARSED_CONFIDENCE};
pub use predicate_evaluation::{ExclusionFlag, PredicateEvaluation, Satisfaction};
pub use run_outcome::{RunFailure, RunOutcome, RunStatus};
pub use state_container::StateContainer;
pub use verdict::{Degradation, EligibilityVerdict, Verdict};
