//! Tests for `exclusion_router`.

use proptest::prelude::*;

use super::exclusion_router::{ExclusionRouter, LABEL_EXCLUDED, LABEL_REASONING};
use super::stage::Router;
use crate::error::PipelineError;
use crate::types::{ExclusionFlag, Field, FieldValue, StateContainer};

fn state_with_flags(confidences: &[f64]) -> StateContainer {
  let flags = confidences
    .iter()
    .enumerate()
    .map(|(i, c)| ExclusionFlag {
      predicate_id: format!("exc-{}", i + 1),
      confidence: *c,
      detail: String::new(),
    })
    .collect();
  let mut state = StateContainer::new();
  state
    .set(Field::ExclusionFlags, FieldValue::ExclusionFlags(flags))
    .unwrap();
  state
}

#[test]
fn confident_flag_excludes() {
  let r = ExclusionRouter::new("exclusion_router", 0.8);
  assert_eq!(r.decide(&state_with_flags(&[0.3, 0.85])).unwrap(), LABEL_EXCLUDED);
}

#[test]
fn flag_at_threshold_goes_to_reasoning() {
  let r = ExclusionRouter::new("exclusion_router", 0.8);
  assert_eq!(r.decide(&state_with_flags(&[0.8])).unwrap(), LABEL_REASONING);
}

#[test]
fn no_flags_go_to_reasoning() {
  let r = ExclusionRouter::new("exclusion_router", 0.8);
  assert_eq!(r.decide(&state_with_flags(&[])).unwrap(), LABEL_REASONING);
}

#[test]
fn missing_flags_field_is_precondition_failure() {
  let r = ExclusionRouter::new("exclusion_router", 0.8);
  let err = r.decide(&StateContainer::new()).unwrap_err();
  assert_eq!(
    err,
    PipelineError::PreconditionNotMet {
      node: "exclusion_router".to_string(),
      field: Field::ExclusionFlags,
    }
  );
}

#[test]
fn labels_cover_decisions() {
  let r = ExclusionRouter::new("exclusion_router", 0.8);
  assert_eq!(r.labels(), &[LABEL_EXCLUDED, LABEL_REASONING]);
}

proptest! {
  #[test]
  fn decision_is_deterministic(
    confidences in proptest::collection::vec(0.0f64..=1.0, 0..6),
    threshold in 0.0f64..=1.0,
  ) {
    let r = ExclusionRouter::new("exclusion_router", threshold);
    let state = state_with_flags(&confidences);
    let first = r.decide(&state).unwrap();
    prop_assert_eq!(first, r.decide(&state.clone()).unwrap());
    let expected = if confidences.iter().any(|c| *c > threshold) {
      LABEL_EXCLUDED
    } else {
      LABEL_REASONING
    };
    prop_assert_eq!(first, expected);
  }
}
