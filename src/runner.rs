//! Batch runner: evaluate one trial against many patient records.
//!
//! - [run_trial]: run every record, hand each run to the audit sinks, summarize.
//! - [write_results]: write the [BatchReport] as `eligibility_results.json`.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::audit_io::{AuditSink, RunRecord, write_json};
use crate::executor::{Executor, RunInput};
use crate::graph::EXCLUDED;
use crate::types::{RawRecord, RunOutcome, RunStatus, Verdict};

/// Default filename for the batch results under an output directory.
pub const RESULTS_FILENAME: &str = "eligibility_results.json";

/// Verdict counts over a batch. Every run lands in exactly one of
/// `eligible`, `ineligible`, `excluded`, `indeterminate` or `failed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
  pub total: usize,
  pub eligible: usize,
  /// Ineligible after reasoning.
  pub ineligible: usize,
  /// Ineligible through the exclusion short-circuit.
  pub excluded: usize,
  pub indeterminate: usize,
  /// Indeterminate because a recoverable failure forced the fallback.
  pub degraded: usize,
  pub failed: usize,
}

/// One line of the results file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientResult {
  pub run_id: Uuid,
  pub patient_id: Option<String>,
  pub status: RunStatus,
  pub verdict: Option<Verdict>,
  pub decided_by: Option<String>,
  pub confidence: Option<f64>,
  pub cited_predicates: Vec<String>,
  pub rationale: Vec<String>,
  pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
  pub generated_at: DateTime<Utc>,
  pub summary: BatchSummary,
  pub results: Vec<PatientResult>,
}

impl BatchReport {
  pub fn from_outcomes(outcomes: &[RunOutcome]) -> Self {
    let mut summary = BatchSummary {
      total: outcomes.len(),
      ..BatchSummary::default()
    };
    let mut results = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
      let verdict = outcome.state.verdict();
      match (outcome.status, verdict.map(|v| (v.verdict, v.decided_by.as_str()))) {
        (RunStatus::Failed, _) | (_, None) => summary.failed += 1,
        (_, Some((Verdict::Eligible, _))) => summary.eligible += 1,
        (_, Some((Verdict::Ineligible, by))) if by == EXCLUDED => summary.excluded += 1,
        (_, Some((Verdict::Ineligible, _))) => summary.ineligible += 1,
        (_, Some((Verdict::Indeterminate, _))) => summary.indeterminate += 1,
      }
      if outcome.status == RunStatus::Degraded {
        summary.degraded += 1;
      }
      results.push(PatientResult {
        run_id: outcome.state.run_id(),
        patient_id: outcome.patient_id().map(str::to_string),
        status: outcome.status,
        verdict: verdict.map(|v| v.verdict),
        decided_by: verdict.map(|v| v.decided_by.clone()),
        confidence: verdict.and_then(|v| v.confidence),
        cited_predicates: verdict.map(|v| v.cited_predicates.clone()).unwrap_or_default(),
        rationale: verdict.map(|v| v.rationale.clone()).unwrap_or_default(),
        error: outcome.failure.as_ref().map(|f| f.error.to_string()),
      });
    }
    Self {
      generated_at: Utc::now(),
      summary,
      results,
    }
  }

  pub fn any_failed(&self) -> bool {
    self.summary.failed > 0
  }
}

/// Outcomes of a batch plus their summary.
#[derive(Debug)]
pub struct BatchRun {
  pub outcomes: Vec<RunOutcome>,
  pub report: BatchReport,
}

/// Runs `trial_text` against every record, recording each run in every sink.
#[instrument(level = "trace", skip(executor, records, trial_text, sinks, cancel))]
pub async fn run_trial(
  executor: &Executor,
  records: Vec<RawRecord>,
  trial_text: &str,
  sinks: &[Box<dyn AuditSink>],
  cancel: CancellationToken,
) -> Result<BatchRun, std::io::Error> {
  let inputs = records
    .into_iter()
    .map(|r| RunInput::new(r, trial_text))
    .collect();
  let outcomes = executor.run_batch(inputs, cancel).await;
  for outcome in &outcomes {
    let record = RunRecord::from_outcome(outcome);
    for sink in sinks {
      sink.record(&record)?;
    }
  }
  let report = BatchReport::from_outcomes(&outcomes);
  let s = &report.summary;
  info!(
    total = s.total,
    eligible = s.eligible,
    ineligible = s.ineligible,
    excluded = s.excluded,
    indeterminate = s.indeterminate,
    degraded = s.degraded,
    failed = s.failed,
    "batch complete"
  );
  Ok(BatchRun { outcomes, report })
}

/// Writes the report as pretty JSON to `path`.
pub fn write_results(path: &Path, report: &BatchReport) -> Result<(), std::io::Error> {
  write_json(path, report)
}
