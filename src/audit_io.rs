//! Output side of a run: one [RunRecord] per run handed to an [AuditSink].

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::types::{AuditEntry, EligibilityVerdict, RunOutcome, RunStatus};

/// Suffix of per-run audit files written by [JsonDirSink].
pub const AUDIT_FILE_SUFFIX: &str = ".audit.json";

/// Error that ended a run, flattened for output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
  pub node: String,
  pub error_kind: String,
  pub message: String,
}

/// Everything worth keeping about one finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
  pub run_id: Uuid,
  pub patient_id: Option<String>,
  pub status: RunStatus,
  pub verdict: Option<EligibilityVerdict>,
  pub failure: Option<FailureRecord>,
  pub audit_log: Vec<AuditEntry>,
  pub recorded_at: DateTime<Utc>,
}

impl RunRecord {
  pub fn from_outcome(outcome: &RunOutcome) -> Self {
    Self {
      run_id: outcome.state.run_id(),
      patient_id: outcome.patient_id().map(str::to_string),
      status: outcome.status,
      verdict: outcome.state.verdict().cloned(),
      failure: outcome.failure.as_ref().map(|f| FailureRecord {
        node: f.node.clone(),
        error_kind: f.error.kind().to_string(),
        message: f.error.to_string(),
      }),
      audit_log: outcome.state.audit_log().to_vec(),
      recorded_at: Utc::now(),
    }
  }
}

/// Receives the record of every finished run.
pub trait AuditSink: Send + Sync {
  fn record(&self, record: &RunRecord) -> Result<(), std::io::Error>;
}

/// Writes `<dir>/<run_id>.audit.json` per run.
pub struct JsonDirSink {
  dir: PathBuf,
}

impl JsonDirSink {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  pub fn path_for(&self, run_id: Uuid) -> PathBuf {
    self.dir.join(format!("{}{}", run_id, AUDIT_FILE_SUFFIX))
  }
}

impl AuditSink for JsonDirSink {
  #[instrument(level = "trace", skip(self, record))]
  fn record(&self, record: &RunRecord) -> Result<(), std::io::Error> {
    write_json(&self.path_for(record.run_id), record)
  }
}

/// Logs each run and its audit trail through `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl AuditSink for TracingSink {
  fn record(&self, record: &RunRecord) -> Result<(), std::io::Error> {
    for entry in &record.audit_log {
      info!(
        run_id = %record.run_id,
        step = entry.step,
        node = %entry.node,
        status = ?entry.status,
        elapsed_ms = entry.elapsed_ms,
        summary = %entry.summary,
        "audit"
      );
    }
    match &record.failure {
      Some(f) => warn!(
        run_id = %record.run_id,
        patient_id = ?record.patient_id,
        node = %f.node,
        error_kind = %f.error_kind,
        "run failed: {}",
        f.message
      ),
      None => info!(
        run_id = %record.run_id,
        patient_id = ?record.patient_id,
        status = record.status.as_str(),
        verdict = ?record.verdict.as_ref().map(|v| v.verdict),
        "run recorded"
      ),
    }
    Ok(())
  }
}

/// Pretty JSON to `path`, creating parent directories.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), std::io::Error> {
  let json = serde_json::to_string_pretty(value)
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)?;
  }
  std::fs::write(path, json)
}

/// Loads a record written by [JsonDirSink].
pub fn load_run_record(path: &Path) -> Result<RunRecord, std::io::Error> {
  let bytes = std::fs::read(path)?;
  serde_json::from_slice(&bytes)
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}
