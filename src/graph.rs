//! Build the eligibility pipeline as a [PipelineGraph].

use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::error::GraphError;
use crate::nodes::{
  EligibilityReasoningStage, ExcludedStage, ExclusionRouter, FeatureEngineeringStage,
  IndeterminateStage, IngestionStage, LABEL_EXCLUDED, LABEL_REASONING, RuleExtractionStage,
};
use crate::pipeline_graph::PipelineGraph;
use crate::reasoning::Reasoner;

pub const PATIENT_INGESTION: &str = "patient_ingestion";
pub const RULE_EXTRACTION: &str = "rule_extraction";
pub const FEATURE_ENGINEERING: &str = "feature_engineering";
pub const EXCLUSION_ROUTER: &str = "exclusion_router";
pub const ELIGIBILITY_REASONING: &str = "eligibility_reasoning";
pub const EXCLUDED: &str = "excluded";
pub const INDETERMINATE: &str = "indeterminate";

/// Build the full eligibility pipeline graph.
///
/// Pipeline: patient_ingestion → rule_extraction → feature_engineering →
/// exclusion_router → (eligibility_reasoning | excluded), with `indeterminate`
/// as the fallback terminal.
pub fn eligibility_graph(
  reasoner: Arc<dyn Reasoner>,
  config: &PipelineConfig,
) -> Result<PipelineGraph, GraphError> {
  let threshold = config.exclusion_threshold;
  PipelineGraph::builder()
    .add_stage(Arc::new(IngestionStage::new(PATIENT_INGESTION)))
    .add_stage(Arc::new(RuleExtractionStage::new(RULE_EXTRACTION)))
    .add_stage(Arc::new(FeatureEngineeringStage::new(FEATURE_ENGINEERING)))
    .add_router(Arc::new(ExclusionRouter::new(EXCLUSION_ROUTER, threshold)))
    .add_stage(Arc::new(EligibilityReasoningStage::new(
      ELIGIBILITY_REASONING,
      reasoner,
    )))
    .add_stage(Arc::new(ExcludedStage::new(EXCLUDED, threshold)))
    .add_stage(Arc::new(IndeterminateStage::new(INDETERMINATE)))
    .add_edge(PATIENT_INGESTION, RULE_EXTRACTION)
    .add_edge(RULE_EXTRACTION, FEATURE_ENGINEERING)
    .add_edge(FEATURE_ENGINEERING, EXCLUSION_ROUTER)
    .add_conditional_edges(
      EXCLUSION_ROUTER,
      [
        (LABEL_EXCLUDED, EXCLUDED),
        (LABEL_REASONING, ELIGIBILITY_REASONING),
      ],
    )
    .set_entry(PATIENT_INGESTION)
    .set_fallback(INDETERMINATE)
    .build()
}
