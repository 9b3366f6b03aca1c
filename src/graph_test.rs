//! Tests for `graph` and `graph_dot`.

use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::graph::{
  ELIGIBILITY_REASONING, EXCLUDED, EXCLUSION_ROUTER, INDETERMINATE, PATIENT_INGESTION,
  eligibility_graph,
};
use crate::graph_dot::to_dot;
use crate::nodes::{LABEL_EXCLUDED, LABEL_REASONING};
use crate::reasoning::RuleReasoner;
use crate::types::NodeKind;

#[test]
fn eligibility_graph_returns_ok() {
  let g = eligibility_graph(Arc::new(RuleReasoner::new()), &PipelineConfig::default()).unwrap();
  assert_eq!(g.len(), 7);
  assert_eq!(g.entry(), PATIENT_INGESTION);
  assert_eq!(g.fallback(), Some(INDETERMINATE));
  assert_eq!(g.node(EXCLUSION_ROUTER).unwrap().kind(), NodeKind::Router);
  assert_eq!(g.route(EXCLUSION_ROUTER, LABEL_EXCLUDED), Some(EXCLUDED));
  assert_eq!(
    g.route(EXCLUSION_ROUTER, LABEL_REASONING),
    Some(ELIGIBILITY_REASONING)
  );
  assert!(g.is_terminal(EXCLUDED));
  assert!(g.is_terminal(ELIGIBILITY_REASONING));
  assert!(!g.is_terminal(EXCLUSION_ROUTER));
}

#[test]
fn dot_export_draws_every_node_and_edge() {
  let g = eligibility_graph(Arc::new(RuleReasoner::new()), &PipelineConfig::default()).unwrap();
  let dot = to_dot(&g, "eligibility");
  assert!(dot.starts_with("digraph \"eligibility\" {"));
  assert!(dot.contains("\"patient_ingestion\" [shape=Mdiamond];"));
  assert!(dot.contains("\"exclusion_router\" [shape=diamond];"));
  assert!(dot.contains("\"indeterminate\" [shape=Msquare, style=dashed];"));
  assert!(dot.contains("\"exclusion_router\" -> \"excluded\" [label=\"excluded\"];"));
  assert!(dot.contains("\"eligibility_reasoning\" -> \"indeterminate\" [style=dashed, label=\"fallback\"];"));
  assert_eq!(dot.matches("->").count(), 6);
  assert!(dot.trim_end().ends_with('}'));
}
