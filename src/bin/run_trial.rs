//! CLI: screen a set of patients against one trial's eligibility criteria.
//!
//! Usage: `run_trial [OPTIONS] --patients <CSV_OR_DIR> --trial <TRIAL_TXT>`
//! Example: run_trial --patients patients.csv --trial trial.txt --output-dir out/
//!
//! --patients takes a flat CSV (one row per patient) or a directory holding
//! patients.csv plus optional conditions.csv, medications.csv and observations.csv.
//!
//! Set RUST_LOG=trialweave=trace for TRACE-level span enter/exit and events.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};
use trialweave::audit_io::{AuditSink, JsonDirSink, TracingSink};
use trialweave::graph_dot::to_dot;
use trialweave::patient_csv::load_patients;
use trialweave::reasoning::command::ENV_AGENT_CMD;
use trialweave::reasoning::ollama::{DEFAULT_MODEL, DEFAULT_OLLAMA_URL, ENV_OLLAMA_URL};
use trialweave::reasoning::{CommandReasoner, OllamaReasoner, RuleReasoner};
use trialweave::runner::{RESULTS_FILENAME, run_trial, write_results};
use trialweave::{Executor, PipelineConfig, Reasoner, RunStatus, eligibility_graph};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ReasonerKind {
  /// Deterministic decision from the predicate evaluations.
  Rules,
  /// Local Ollama server.
  Ollama,
  /// External command reading the prompt on stdin.
  Command,
}

/// Screen patients against a clinical trial's eligibility criteria.
#[derive(Parser, Debug)]
#[command(name = "run_trial")]
#[command(
  after_help = r#"Environment variables (override the matching flags when set):
  TRIALWEAVE_AGENT_CMD              Command for --reasoner command.
  TRIALWEAVE_OLLAMA_URL             Base URL for --reasoner ollama.
  TRIALWEAVE_EXCLUSION_THRESHOLD    Exclusion flag confidence threshold.
  TRIALWEAVE_REASONING_TIMEOUT_MS   Timeout of one reasoning call.

Examples:
  run_trial --patients patients.csv --trial trial.txt
  run_trial --patients synthea/ --trial trial.txt --reasoner ollama --output-dir out/"#
)]
struct Args {
  /// Patient CSV file or Synthea-style CSV directory.
  #[arg(long, value_name = "CSV_OR_DIR")]
  patients: PathBuf,

  /// Trial eligibility criteria as plain text.
  #[arg(long, value_name = "TRIAL_TXT")]
  trial: PathBuf,

  /// JSON pipeline config; missing keys take their defaults.
  #[arg(long, value_name = "JSON")]
  config: Option<PathBuf>,

  #[arg(long, value_enum, default_value = "rules")]
  reasoner: ReasonerKind,

  #[arg(long, value_name = "URL", default_value = DEFAULT_OLLAMA_URL)]
  ollama_url: String,

  #[arg(long, default_value = DEFAULT_MODEL)]
  model: String,

  /// Command for --reasoner command. Overridden by TRIALWEAVE_AGENT_CMD if set.
  #[arg(long, value_name = "CMD")]
  agent_cmd: Option<String>,

  /// Exclusion flag confidence threshold in [0, 1].
  #[arg(long)]
  threshold: Option<f64>,

  /// Timeout of one reasoning call in milliseconds.
  #[arg(long, value_name = "MS")]
  timeout_ms: Option<u64>,

  /// Where to write eligibility_results.json and per-run audit files.
  #[arg(long, value_name = "DIR")]
  output_dir: Option<PathBuf>,

  /// Write the pipeline graph as DOT to this path and continue.
  #[arg(long, value_name = "PATH")]
  export_dot: Option<PathBuf>,
}

fn fail(msg: impl std::fmt::Display) -> ! {
  eprintln!("Error: {}", msg);
  process::exit(1);
}

fn build_config(args: &Args) -> PipelineConfig {
  let mut config = match &args.config {
    Some(path) => PipelineConfig::from_json_file(path)
      .unwrap_or_else(|e| fail(format!("{}: {}", path.display(), e))),
    None => PipelineConfig::default(),
  };
  if let Some(t) = args.threshold {
    config.exclusion_threshold = t;
  }
  if let Some(ms) = args.timeout_ms {
    config.reasoning_timeout_ms = ms;
  }
  if let Err(e) = config.apply_overrides(|k| env::var(k).ok()) {
    fail(e);
  }
  if config.as_of.is_none() {
    config.as_of = Some(config.reference_date());
  }
  config
}

fn build_reasoner(args: &Args) -> Arc<dyn Reasoner> {
  match args.reasoner {
    ReasonerKind::Rules => Arc::new(RuleReasoner::new()),
    ReasonerKind::Ollama => {
      let url = env::var(ENV_OLLAMA_URL).unwrap_or_else(|_| args.ollama_url.clone());
      Arc::new(OllamaReasoner::new(url, args.model.clone()))
    }
    ReasonerKind::Command => {
      let cmd = env::var(ENV_AGENT_CMD)
        .ok()
        .or_else(|| args.agent_cmd.clone())
        .unwrap_or_else(|| fail(format!("--reasoner command needs --agent-cmd or {}", ENV_AGENT_CMD)));
      Arc::new(CommandReasoner::new(cmd))
    }
  }
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
    .init();

  info!("run_trial starting");
  let args = Args::parse();
  let config = build_config(&args);
  let reasoner = build_reasoner(&args);
  info!(
    reasoner = reasoner.name(),
    threshold = config.exclusion_threshold,
    timeout_ms = config.reasoning_timeout_ms,
    as_of = ?config.as_of,
    "options (config, flags, env)"
  );

  let trial_text = fs::read_to_string(&args.trial)
    .unwrap_or_else(|e| fail(format!("reading {}: {}", args.trial.display(), e)));
  let records = load_patients(&args.patients)
    .unwrap_or_else(|e| fail(format!("reading {}: {}", args.patients.display(), e)));

  let graph = eligibility_graph(reasoner, &config).unwrap_or_else(|e| fail(e));
  if let Some(path) = &args.export_dot {
    if let Err(e) = fs::write(path, to_dot(&graph, "eligibility")) {
      fail(format!("writing {}: {}", path.display(), e));
    }
    info!(path = %path.display(), "graph exported");
  }
  let executor = Executor::new(graph, config);

  let cancel = CancellationToken::new();
  let on_signal = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("interrupted, cancelling runs");
      on_signal.cancel();
    }
  });

  let mut sinks: Vec<Box<dyn AuditSink>> = vec![Box::new(TracingSink)];
  if let Some(dir) = &args.output_dir {
    sinks.push(Box::new(JsonDirSink::new(dir.join("runs"))));
  }

  let batch = run_trial(&executor, records, &trial_text, &sinks, cancel)
    .await
    .unwrap_or_else(|e| fail(format!("recording runs: {}", e)));

  if let Some(dir) = &args.output_dir {
    let path = dir.join(RESULTS_FILENAME);
    if let Err(e) = write_results(&path, &batch.report) {
      fail(format!("writing {}: {}", path.display(), e));
    }
    println!("Results written to {}", path.display());
  }

  for r in &batch.report.results {
    let verdict = r.verdict.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
    let detail = match (&r.error, r.status) {
      (Some(e), _) => e.clone(),
      (None, RunStatus::Degraded) => "degraded".to_string(),
      (None, _) => r.cited_predicates.join(", "),
    };
    println!(
      "  {}: {} [{}] {}",
      r.patient_id.as_deref().unwrap_or("<unknown>"),
      verdict,
      r.status.as_str(),
      detail
    );
  }
  let s = &batch.report.summary;
  println!(
    "Screened {}: {} eligible, {} ineligible, {} excluded, {} indeterminate ({} degraded), {} failed",
    s.total, s.eligible, s.ineligible, s.excluded, s.indeterminate, s.degraded, s.failed
  );
  if batch.report.any_failed() {
    process::exit(1);
  }
}
