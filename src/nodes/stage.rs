//! Execution contract shared by every pipeline node.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::types::{DurationClass, Field, FieldUpdate, FieldValue, StateContainer};

/// Read-only context handed to a stage for one run.
#[derive(Clone)]
pub struct StageContext {
  pub run_id: Uuid,
  pub config: Arc<PipelineConfig>,
  /// Cancelled when the caller abandons the run.
  pub cancel: CancellationToken,
}

impl StageContext {
  pub fn new(run_id: Uuid, config: Arc<PipelineConfig>, cancel: CancellationToken) -> Self {
    Self {
      run_id,
      config,
      cancel,
    }
  }
}

/// Field writes a stage wants applied, plus a summary for the audit log.
#[derive(Debug, Clone, Default)]
pub struct StageOutcome {
  pub updates: Vec<FieldUpdate>,
  pub summary: String,
}

impl StageOutcome {
  pub fn new(summary: impl Into<String>) -> Self {
    Self {
      updates: Vec::new(),
      summary: summary.into(),
    }
  }

  pub fn with(mut self, value: FieldValue) -> Self {
    self.updates.push(FieldUpdate::of(value));
    self
  }

  pub fn fields(&self) -> Vec<Field> {
    self.updates.iter().map(|u| u.field).collect()
  }
}

/// A unit of work that reads the state and returns the fields it adds.
///
/// Stages never mutate the state directly: the executor applies the returned
/// updates through [StateContainer::set], so the append-only rule is checked in
/// one place.
#[async_trait]
pub trait Stage: Send + Sync {
  fn name(&self) -> &str;

  /// Fields that must be set before the stage may run.
  fn requires(&self) -> &[Field];

  /// Fields the stage promises to set.
  fn writes(&self) -> &[Field];

  fn duration_class(&self) -> DurationClass {
    DurationClass::Fast
  }

  async fn execute(
    &self,
    state: &StateContainer,
    ctx: &StageContext,
  ) -> Result<StageOutcome, PipelineError>;
}

/// A pure decision node selecting the next node by label.
pub trait Router: Send + Sync {
  fn name(&self) -> &str;

  fn requires(&self) -> &[Field];

  /// Every label [Router::decide] can return.
  fn labels(&self) -> &[&'static str];

  fn decide(&self, state: &StateContainer) -> Result<&'static str, PipelineError>;
}
