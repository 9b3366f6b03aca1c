//! # trialweave
//!
//! Clinical trial eligibility screening as a graph of async pipeline stages.
//!
//! ## Architecture
//!
//! One run evaluates one patient against one trial. The [Executor] walks a
//! validated [PipelineGraph] and threads a single append-only
//! [types::StateContainer] through its nodes:
//!
//! patient_ingestion → rule_extraction → feature_engineering →
//! exclusion_router → (eligibility_reasoning | excluded)
//!
//! Recoverable failures of the reasoning stage (unavailable, timed out) jump to
//! the `indeterminate` fallback terminal and mark the run degraded. Many runs
//! execute concurrently with [Executor::run_batch]; they share only the
//! read-only graph and [PipelineConfig].

pub mod audit_io;
pub mod config;
pub mod error;
pub mod executor;
pub mod graph;
pub mod graph_dot;
#[cfg(test)]
mod graph_test;
pub mod nodes;
pub mod patient_csv;
#[cfg(test)]
mod patient_csv_test;
pub mod pipeline_graph;
pub mod reasoning;
pub mod runner;
pub mod state_io;
#[cfg(test)]
mod state_io_test;
pub mod trial_text;
#[cfg(test)]
mod trial_text_test;
pub mod types;

pub use config::PipelineConfig;
pub use error::{ConfigError, GraphError, PipelineError};
pub use executor::{Executor, RunInput};
pub use graph::eligibility_graph;
pub use pipeline_graph::{PipelineGraph, PipelineGraphBuilder, PipelineNode};
pub use reasoning::{Reasoner, ReasoningRequest, ReasoningResponse};
pub use types::{RunOutcome, RunStatus, StateContainer, Verdict};
