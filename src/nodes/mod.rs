//! Pipeline nodes: the stage/router contract and the built-in eligibility stages.

mod eligibility_reasoning;
mod excluded;
mod exclusion_router;
#[cfg(test)]
mod exclusion_router_test;
mod feature_engineering;
mod indeterminate;
#[cfg(test)]
mod indeterminate_test;
mod ingestion;
mod rule_extraction;
#[cfg(test)]
mod rule_extraction_test;
mod stage;

pub use eligibility_reasoning::EligibilityReasoningStage;
pub use excluded::ExcludedStage;
pub use exclusion_router::{ExclusionRouter, LABEL_EXCLUDED, LABEL_REASONING};
pub use feature_engineering::FeatureEngineeringStage;
pub use indeterminate::IndeterminateStage;
pub use ingestion::{IngestionStage, LAB_KEY_PREFIX, UNCONTROLLED_BP};
pub use rule_extraction::RuleExtractionStage;
pub use stage::{Router, Stage, StageContext, StageOutcome};
