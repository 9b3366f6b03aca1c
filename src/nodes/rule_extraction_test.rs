//! Tests for `rule_extraction`.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::rule_extraction::RuleExtractionStage;
use super::stage::{Stage, StageContext};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::types::{Field, FieldValue, StateContainer};

fn state_with_text(text: &str) -> StateContainer {
  let mut state = StateContainer::new();
  state
    .set(Field::TrialText, FieldValue::TrialText(text.to_string()))
    .unwrap();
  state
}

fn ctx(state: &StateContainer) -> StageContext {
  StageContext::new(
    state.run_id(),
    Arc::new(PipelineConfig::default()),
    CancellationToken::new(),
  )
}

#[tokio::test]
async fn extracts_predicates() {
  let state = state_with_text("Inclusion Criteria:\n- age >= 18\nExclusion Criteria:\n- something odd");
  let outcome = RuleExtractionStage::new("rule_extraction")
    .execute(&state, &ctx(&state))
    .await
    .unwrap();
  assert_eq!(outcome.summary, "2 predicates from 2 clauses (1 low-confidence)");
  match &outcome.updates[0].value {
    FieldValue::Predicates(p) => assert_eq!(p.len(), 2),
    other => panic!("unexpected update {:?}", other),
  }
}

#[tokio::test]
async fn empty_text_is_malformed() {
  let state = state_with_text("   \n");
  let err = RuleExtractionStage::new("rule_extraction")
    .execute(&state, &ctx(&state))
    .await
    .unwrap_err();
  assert!(matches!(err, PipelineError::MalformedInput(_)));
}

#[tokio::test]
async fn text_without_criteria_is_malformed() {
  let state = state_with_text("A study of something.");
  let err = RuleExtractionStage::new("rule_extraction")
    .execute(&state, &ctx(&state))
    .await
    .unwrap_err();
  assert!(matches!(err, PipelineError::MalformedInput(_)));
}
