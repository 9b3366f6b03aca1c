//! Shared, read-only pipeline settings.

use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::ConfigError;

/// Env var overriding [PipelineConfig::exclusion_threshold].
pub const ENV_EXCLUSION_THRESHOLD: &str = "TRIALWEAVE_EXCLUSION_THRESHOLD";
/// Env var overriding [PipelineConfig::reasoning_timeout_ms].
pub const ENV_REASONING_TIMEOUT_MS: &str = "TRIALWEAVE_REASONING_TIMEOUT_MS";

/// Settings shared by every run of a pipeline. Frozen once the graph is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  /// Exclusion flags must be strictly more confident than this to exclude.
  pub exclusion_threshold: f64,
  /// Upper bound on one reasoning call.
  pub reasoning_timeout_ms: u64,
  /// Runs evaluated at once by [crate::Executor::run_batch].
  pub max_concurrent_runs: usize,
  /// Reference date for age computed from a birthdate; today when unset.
  pub as_of: Option<NaiveDate>,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      exclusion_threshold: 0.8,
      reasoning_timeout_ms: 30_000,
      max_concurrent_runs: 8,
      as_of: None,
    }
  }
}

impl PipelineConfig {
  /// Loads a JSON config; missing keys take their defaults.
  #[instrument(level = "trace", skip(path))]
  pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
    let bytes = std::fs::read(path)?;
    let config: PipelineConfig = serde_json::from_slice(&bytes)?;
    config.validate()?;
    Ok(config)
  }

  /// Applies overrides from a lookup such as `std::env::var`.
  pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    if let Some(v) = lookup(ENV_EXCLUSION_THRESHOLD) {
      self.exclusion_threshold = v.trim().parse().map_err(|_| {
        ConfigError::Invalid(format!("{} is not a number: {}", ENV_EXCLUSION_THRESHOLD, v))
      })?;
    }
    if let Some(v) = lookup(ENV_REASONING_TIMEOUT_MS) {
      self.reasoning_timeout_ms = v.trim().parse().map_err(|_| {
        ConfigError::Invalid(format!("{} is not an integer: {}", ENV_REASONING_TIMEOUT_MS, v))
      })?;
    }
    self.validate()
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&self.exclusion_threshold) {
      return Err(ConfigError::Invalid(format!(
        "exclusion_threshold must be within [0, 1], got {}",
        self.exclusion_threshold
      )));
    }
    if self.reasoning_timeout_ms == 0 {
      return Err(ConfigError::Invalid(
        "reasoning_timeout_ms must be positive".to_string(),
      ));
    }
    if self.max_concurrent_runs == 0 {
      return Err(ConfigError::Invalid(
        "max_concurrent_runs must be positive".to_string(),
      ));
    }
    Ok(())
  }

  pub fn reasoning_timeout(&self) -> Duration {
    Duration::from_millis(self.reasoning_timeout_ms)
  }

  /// Reference date for ages, falling back to today's local date.
  pub fn reference_date(&self) -> NaiveDate {
    self
      .as_of
      .unwrap_or_else(|| chrono::Local::now().date_naive())
  }
}
