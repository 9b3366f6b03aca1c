//! Tests for the deterministic rule reasoner.

use super::rules::decide;
use super::{Reasoner, ReasoningRequest, RuleReasoner};
use crate::types::{
  PatientProfile, PredicateEvaluation, RuleKind, Satisfaction, Verdict,
};

fn eval(id: &str, kind: RuleKind, satisfaction: Satisfaction) -> PredicateEvaluation {
  PredicateEvaluation {
    predicate_id: id.to_string(),
    kind,
    satisfaction,
    score: satisfaction.score(),
    confidence: if satisfaction == Satisfaction::Unknown { 0.0 } else { 0.9 },
    fields_used: vec![],
    detail: format!("{} detail", id),
  }
}

#[test]
fn all_inclusions_met_is_eligible() {
  let r = decide(&[
    eval("inc-1", RuleKind::Inclusion, Satisfaction::Met),
    eval("inc-2", RuleKind::Inclusion, Satisfaction::Met),
    eval("exc-1", RuleKind::Exclusion, Satisfaction::NotMet),
  ]);
  assert_eq!(r.verdict, Verdict::Eligible);
  assert_eq!(r.rationale.len(), 3);
  assert!(r.rationale[0].starts_with("inc-1 satisfied"));
  assert!(r.rationale[2].starts_with("exc-1 not triggered"));
  assert!((r.confidence.unwrap() - 0.9).abs() < 1e-9);
}

#[test]
fn failed_inclusion_is_ineligible_even_with_unknowns() {
  let r = decide(&[
    eval("inc-1", RuleKind::Inclusion, Satisfaction::NotMet),
    eval("inc-2", RuleKind::Inclusion, Satisfaction::Unknown),
  ]);
  assert_eq!(r.verdict, Verdict::Ineligible);
}

#[test]
fn met_exclusion_is_ineligible() {
  let r = decide(&[
    eval("inc-1", RuleKind::Inclusion, Satisfaction::Met),
    eval("exc-1", RuleKind::Exclusion, Satisfaction::Met),
  ]);
  assert_eq!(r.verdict, Verdict::Ineligible);
}

#[test]
fn unknown_without_blockers_is_indeterminate() {
  let r = decide(&[
    eval("inc-1", RuleKind::Inclusion, Satisfaction::Met),
    eval("inc-2", RuleKind::Inclusion, Satisfaction::Unknown),
  ]);
  assert_eq!(r.verdict, Verdict::Indeterminate);
  assert!(r.rationale[1].contains("could not be evaluated"));
}

#[test]
fn no_evaluations_is_eligible_without_confidence() {
  let r = decide(&[]);
  assert_eq!(r.verdict, Verdict::Eligible);
  assert_eq!(r.confidence, None);
}

#[tokio::test]
async fn reasoner_uses_request_evaluations() {
  let request = ReasoningRequest {
    profile: PatientProfile::new("p1"),
    predicates: vec![],
    evaluations: vec![eval("inc-1", RuleKind::Inclusion, Satisfaction::NotMet)],
  };
  let r = RuleReasoner::new().reason(&request).await.unwrap();
  assert_eq!(r.verdict, Verdict::Ineligible);
}
