//! Integration tests that screen the CSV fixtures in tests/integration/ through
//! the run_trial CLI and through the library API.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use trialweave::audit_io::{AuditSink, JsonDirSink, load_run_record};
use trialweave::patient_csv::load_patients;
use trialweave::runner::{BatchReport, RESULTS_FILENAME, run_trial};
use trialweave::{Executor, PipelineConfig, RunStatus, Verdict, eligibility_graph};

fn integration_dir() -> PathBuf {
  Path::new(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("integration")
}

fn fixture(name: &str) -> PathBuf {
  integration_dir().join(name)
}

fn trial_text() -> String {
  std::fs::read_to_string(fixture("trial.txt")).expect("read trial.txt")
}

/// Runs the run_trial binary. Returns (stdout, stderr, success).
fn run_cli(args: &[&str]) -> (String, String, bool) {
  let out = Command::new(env!("CARGO_BIN_EXE_run_trial"))
    .args(args)
    .env_remove("TRIALWEAVE_EXCLUSION_THRESHOLD")
    .env_remove("TRIALWEAVE_REASONING_TIMEOUT_MS")
    .output()
    .expect("spawn run_trial");
  (
    String::from_utf8_lossy(&out.stdout).into_owned(),
    String::from_utf8_lossy(&out.stderr).into_owned(),
    out.status.success(),
  )
}

fn executor() -> Executor {
  let config = PipelineConfig {
    as_of: NaiveDate::from_ymd_opt(2025, 1, 1),
    ..PipelineConfig::default()
  };
  let graph = eligibility_graph(Arc::new(trialweave::reasoning::RuleReasoner::new()), &config)
    .expect("eligibility graph");
  Executor::new(graph, config)
}

// ---- CLI ----

#[test]
fn cli_screens_flat_csv_and_writes_results() {
  let out_dir = tempfile::tempdir().unwrap();
  let trial = fixture("trial.txt");
  let patients = fixture("patients.csv");
  let (stdout, stderr, success) = run_cli(&[
    "--trial",
    trial.to_str().unwrap(),
    "--output-dir",
    out_dir.path().to_str().unwrap(),
    "--patients",
    patients.to_str().unwrap(),
  ]);
  // The row without a patient id fails, so the CLI exits non-zero.
  assert!(!success, "expected failure exit: stderr={}", stderr);
  assert!(stdout.contains("P001: eligible [succeeded]"), "{}", stdout);
  assert!(stdout.contains("P002: ineligible [succeeded] exc-1"), "{}", stdout);
  assert!(stdout.contains("P003: ineligible"), "{}", stdout);
  assert!(stdout.contains("P004: indeterminate"), "{}", stdout);
  assert!(stdout.contains("Screened 5: 1 eligible, 1 ineligible, 1 excluded, 1 indeterminate (0 degraded), 1 failed"));

  let results = out_dir.path().join(RESULTS_FILENAME);
  let report: BatchReport =
    serde_json::from_slice(&std::fs::read(&results).expect("results file")).expect("parse results");
  assert_eq!(report.results.len(), 5);
  let audit_files = std::fs::read_dir(out_dir.path().join("runs")).unwrap().count();
  assert_eq!(audit_files, 5);
}

#[test]
fn cli_succeeds_when_every_run_completes() {
  let dir = tempfile::tempdir().unwrap();
  let patients = dir.path().join("ok.csv");
  std::fs::write(
    &patients,
    "patient_id,age,conditions,lab:HbA1c,lab:eGFR\nA1,30,type 2 diabetes,7.5,90\n",
  )
  .unwrap();
  let trial = fixture("trial.txt");
  let dot = dir.path().join("graph.dot");
  let (stdout, stderr, success) = run_cli(&[
    "--trial",
    trial.to_str().unwrap(),
    "--export-dot",
    dot.to_str().unwrap(),
    "--patients",
    patients.to_str().unwrap(),
  ]);
  assert!(success, "stderr={}", stderr);
  assert!(stdout.contains("A1: eligible"));
  let dot = std::fs::read_to_string(dot).unwrap();
  assert!(dot.starts_with("digraph \"eligibility\""));
  assert!(dot.contains("\"exclusion_router\" -> \"excluded\""));
}

#[test]
fn cli_rejects_invalid_threshold() {
  let trial = fixture("trial.txt");
  let patients = fixture("patients.csv");
  let (_stdout, stderr, success) = run_cli(&[
    "--trial",
    trial.to_str().unwrap(),
    "--threshold",
    "1.5",
    "--patients",
    patients.to_str().unwrap(),
  ]);
  assert!(!success);
  assert!(stderr.contains("exclusion_threshold"), "{}", stderr);
}

#[test]
fn cli_command_reasoner_needs_a_command() {
  let trial = fixture("trial.txt");
  let patients = fixture("patients.csv");
  let out = Command::new(env!("CARGO_BIN_EXE_run_trial"))
    .args([
      "--trial",
      trial.to_str().unwrap(),
      "--reasoner",
      "command",
      "--patients",
      patients.to_str().unwrap(),
    ])
    .env_remove("TRIALWEAVE_AGENT_CMD")
    .output()
    .expect("spawn run_trial");
  assert!(!out.status.success());
  assert!(String::from_utf8_lossy(&out.stderr).contains("--agent-cmd"));
}

// ---- Library path ----

#[tokio::test]
async fn lib_flat_csv_batch() {
  let records = load_patients(&fixture("patients.csv")).expect("load patients");
  let dir = tempfile::tempdir().unwrap();
  let sinks: Vec<Box<dyn AuditSink>> = vec![Box::new(JsonDirSink::new(dir.path()))];
  let batch = run_trial(&executor(), records, &trial_text(), &sinks, CancellationToken::new())
    .await
    .expect("run_trial");

  let ids: Vec<Option<&str>> = batch.outcomes.iter().map(|o| o.patient_id()).collect();
  assert_eq!(
    ids,
    vec![Some("P001"), Some("P002"), Some("P003"), Some("P004"), None]
  );
  let failed = &batch.outcomes[4];
  assert_eq!(failed.status, RunStatus::Failed);
  assert!(failed.state.audit_log().is_empty());

  // Audit files load back with the full trail.
  let first = &batch.outcomes[0];
  let sink = JsonDirSink::new(dir.path());
  let record = load_run_record(&sink.path_for(first.state.run_id())).expect("audit record");
  assert_eq!(record.audit_log.len(), 5);
  assert_eq!(record.verdict.unwrap().verdict, Verdict::Eligible);
}

#[tokio::test]
async fn lib_synthea_directory_batch() {
  let records = load_patients(&fixture("synthea")).expect("load synthea dir");
  assert_eq!(records.len(), 2);
  let batch = run_trial(&executor(), records, &trial_text(), &[], CancellationToken::new())
    .await
    .expect("run_trial");

  let s1 = &batch.outcomes[0];
  assert_eq!(s1.patient_id(), Some("s-1"));
  assert_eq!(s1.verdict(), Some(Verdict::Eligible));
  let profile = s1.state.patient_profile().unwrap();
  assert_eq!(profile.age, Some(63));
  assert_eq!(profile.labs.get("hba1c"), Some(&8.2));

  let s2 = &batch.outcomes[1];
  assert_eq!(s2.verdict(), Some(Verdict::Ineligible));
  assert_eq!(s2.visited_nodes().last(), Some(&"excluded"));
  assert!(!batch.report.any_failed());
}

#[tokio::test]
async fn lib_cancelled_batch_fails_every_run() {
  let records = load_patients(&fixture("patients.csv")).expect("load patients");
  let cancel = CancellationToken::new();
  cancel.cancel();
  let batch = run_trial(&executor(), records, &trial_text(), &[], cancel)
    .await
    .expect("run_trial");
  assert_eq!(batch.report.summary.failed, 5);
  assert!(
    batch
      .report
      .results
      .iter()
      .all(|r| r.error.as_deref().is_some_and(|e| e.contains("cancelled")))
  );
}
