//! Exclusion router: short-circuit to `excluded` on a confident exclusion flag.

use tracing::instrument;

use super::stage::Router;
use crate::error::PipelineError;
use crate::types::{ExclusionFlag, Field, StateContainer};

pub const LABEL_EXCLUDED: &str = "excluded";
pub const LABEL_REASONING: &str = "reasoning";

/// Routes on exclusion-flag confidence against a fixed threshold.
pub struct ExclusionRouter {
  name: String,
  threshold: f64,
}

impl ExclusionRouter {
  pub fn new(name: impl Into<String>, threshold: f64) -> Self {
    Self {
      name: name.into(),
      threshold,
    }
  }

  pub fn threshold(&self) -> f64 {
    self.threshold
  }
}

/// Flags strictly more confident than `threshold`.
pub(crate) fn decisive_flags(flags: &[ExclusionFlag], threshold: f64) -> Vec<&ExclusionFlag> {
  flags.iter().filter(|f| f.confidence > threshold).collect()
}

impl Router for ExclusionRouter {
  fn name(&self) -> &str {
    &self.name
  }

  fn requires(&self) -> &[Field] {
    &[Field::ExclusionFlags]
  }

  fn labels(&self) -> &[&'static str] {
    &[LABEL_EXCLUDED, LABEL_REASONING]
  }

  #[instrument(level = "trace", skip(self, state))]
  fn decide(&self, state: &StateContainer) -> Result<&'static str, PipelineError> {
    let flags = state.exclusion_flags().ok_or_else(|| PipelineError::PreconditionNotMet {
      node: self.name.clone(),
      field: Field::ExclusionFlags,
    })?;
    if decisive_flags(flags, self.threshold).is_empty() {
      Ok(LABEL_REASONING)
    } else {
      Ok(LABEL_EXCLUDED)
    }
  }
}
