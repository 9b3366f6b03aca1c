//! Tests for `indeterminate`.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::indeterminate::IndeterminateStage;
use super::stage::{Stage, StageContext};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::types::{Degradation, Field, FieldValue, StateContainer, Verdict};

fn ctx(state: &StateContainer) -> StageContext {
  StageContext::new(
    state.run_id(),
    Arc::new(PipelineConfig::default()),
    CancellationToken::new(),
  )
}

#[tokio::test]
async fn degraded_verdict_explains_failure() {
  let mut state = StateContainer::new();
  state
    .set(
      Field::Degradation,
      FieldValue::Degradation(Degradation {
        node: "eligibility_reasoning".to_string(),
        error_kind: "reasoning_timeout".to_string(),
        message: "reasoning timed out after 1000 ms".to_string(),
      }),
    )
    .unwrap();
  let outcome = IndeterminateStage::new("indeterminate")
    .execute(&state, &ctx(&state))
    .await
    .unwrap();
  let FieldValue::Verdict(v) = &outcome.updates[0].value else {
    panic!("expected a verdict");
  };
  assert_eq!(v.verdict, Verdict::Indeterminate);
  assert!(v.degraded);
  assert!(v.rationale[0].contains("reasoning_timeout"));
  assert_eq!(
    outcome.summary,
    "indeterminate after reasoning_timeout in eligibility_reasoning"
  );
}

#[tokio::test]
async fn without_degradation_is_violation() {
  let state = StateContainer::new();
  let err = IndeterminateStage::new("indeterminate")
    .execute(&state, &ctx(&state))
    .await
    .unwrap_err();
  assert!(matches!(err, PipelineError::InvariantViolation(_)));
}
