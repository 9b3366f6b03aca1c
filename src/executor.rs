//! Executor: walks a [PipelineGraph] for one run, or many runs concurrently.
//!
//! A run moves `Pending → Running(node) → {Running(next) | Succeeded | Failed}`.
//! Before each node the executor checks cancellation and the node's required
//! fields. Recoverable stage failures are recorded in the audit log, written to
//! the `degradation` field, and followed by a jump to the graph's fallback
//! terminal. Fatal failures stop the run and are returned with the partial state.

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::nodes::StageContext;
use crate::pipeline_graph::{PipelineGraph, PipelineNode};
use crate::types::{
  AuditEntry, Degradation, Field, FieldValue, RawRecord, RunFailure, RunOutcome, RunStatus,
  StateContainer, StepStatus,
};

/// Raw inputs of one patient × trial run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunInput {
  pub raw_patient: RawRecord,
  pub trial_text: String,
}

impl RunInput {
  pub fn new(raw_patient: RawRecord, trial_text: impl Into<String>) -> Self {
    Self {
      raw_patient,
      trial_text: trial_text.into(),
    }
  }
}

/// Runs pipelines over a shared, read-only graph and config.
#[derive(Debug, Clone)]
pub struct Executor {
  graph: Arc<PipelineGraph>,
  config: Arc<PipelineConfig>,
}

fn entry_for(node: &PipelineNode, status: StepStatus, summary: String, started: Instant) -> AuditEntry {
  AuditEntry {
    step: 0,
    node: node.name().to_string(),
    node_kind: node.kind(),
    duration_class: node.duration_class(),
    status,
    summary,
    fields_written: Vec::new(),
    label: None,
    error: None,
    elapsed_ms: started.elapsed().as_millis() as u64,
  }
}

fn failed(state: StateContainer, node: &str, error: PipelineError) -> RunOutcome {
  warn!(
    run_id = %state.run_id(),
    node,
    error_kind = error.kind(),
    error = %error,
    "run failed"
  );
  RunOutcome {
    status: RunStatus::Failed,
    state,
    failure: Some(RunFailure {
      node: node.to_string(),
      error,
    }),
  }
}

impl Executor {
  pub fn new(graph: PipelineGraph, config: PipelineConfig) -> Self {
    Self::from_shared(Arc::new(graph), Arc::new(config))
  }

  /// Shares `graph` and `config` across runs. An unset `as_of` is frozen to
  /// today here, so every run of this executor ages patients on the same date.
  pub fn from_shared(graph: Arc<PipelineGraph>, mut config: Arc<PipelineConfig>) -> Self {
    if config.as_of.is_none() {
      let today = config.reference_date();
      Arc::make_mut(&mut config).as_of = Some(today);
    }
    Self { graph, config }
  }

  pub fn graph(&self) -> &PipelineGraph {
    &self.graph
  }

  pub fn config(&self) -> &PipelineConfig {
    &self.config
  }

  /// Runs one patient × trial pair to completion. Never panics on stage errors:
  /// every failure is returned inside the [RunOutcome].
  #[instrument(level = "trace", skip(self, input, cancel))]
  pub async fn run(&self, input: RunInput, cancel: CancellationToken) -> RunOutcome {
    let mut state = StateContainer::new();
    let entry = self.graph.entry().to_string();
    if let Err(e) = state
      .set(Field::RawPatient, FieldValue::RawPatient(input.raw_patient))
      .and_then(|_| state.set(Field::TrialText, FieldValue::TrialText(input.trial_text)))
    {
      return failed(state, &entry, e);
    }

    let ctx = StageContext::new(state.run_id(), self.config.clone(), cancel.clone());
    let mut current = entry;
    let mut degraded = false;
    // A validated graph is acyclic, so a run visits each node at most once.
    let max_steps = self.graph.len() + 1;
    let mut steps = 0;

    loop {
      steps += 1;
      if steps > max_steps {
        let e = PipelineError::InvariantViolation(format!("more than {} steps", max_steps));
        return failed(state, &current, e);
      }
      if cancel.is_cancelled() {
        let e = PipelineError::Cancelled {
          node: current.clone(),
        };
        return failed(state, &current, e);
      }
      let Some(node) = self.graph.node(&current) else {
        let e = PipelineError::UnknownNode(current.clone());
        return failed(state, &current, e);
      };
      if let Some(field) = node.requires().iter().find(|f| !state.is_set(**f)) {
        let e = PipelineError::PreconditionNotMet {
          node: current.clone(),
          field: *field,
        };
        return failed(state, &current, e);
      }

      info!(run_id = %state.run_id(), node = %current, step = steps, "executing node");
      let started = Instant::now();

      let next = match node {
        PipelineNode::Stage(stage) => match stage.execute(&state, &ctx).await {
          Ok(outcome) => {
            let fields = outcome.fields();
            for update in outcome.updates {
              if !stage.writes().contains(&update.field) {
                let e = PipelineError::InvariantViolation(format!(
                  "'{}' wrote undeclared field '{}'",
                  current, update.field
                ));
                return failed(state, &current, e);
              }
              if let Err(e) = state.set(update.field, update.value) {
                return failed(state, &current, e);
              }
            }
            if let Some(missing) = stage.writes().iter().find(|f| !state.is_set(**f)) {
              let e = PipelineError::InvariantViolation(format!(
                "'{}' did not write '{}'",
                current, missing
              ));
              return failed(state, &current, e);
            }
            let mut entry = entry_for(node, StepStatus::Succeeded, outcome.summary, started);
            entry.fields_written = fields;
            state.record(entry);
            self.graph.successor(&current).map(str::to_string)
          }
          Err(e) if e.is_recoverable() => {
            let fallback = match self.graph.fallback() {
              Some(fb) if !degraded && fb != current => fb.to_string(),
              _ => return failed(state, &current, e),
            };
            warn!(
              run_id = %state.run_id(),
              node = %current,
              error = %e,
              fallback = %fallback,
              "recoverable failure, taking fallback"
            );
            let mut entry = entry_for(node, StepStatus::Failed, format!("{} failed", current), started);
            entry.error = Some(e.to_string());
            state.record(entry);
            let degradation = Degradation {
              node: current.clone(),
              error_kind: e.kind().to_string(),
              message: e.to_string(),
            };
            if let Err(e) = state.set(Field::Degradation, FieldValue::Degradation(degradation)) {
              return failed(state, &current, e);
            }
            degraded = true;
            Some(fallback)
          }
          Err(e) => return failed(state, &current, e),
        },
        PipelineNode::Router(router) => match router.decide(&state) {
          Ok(label) => {
            let Some(target) = self.graph.route(&current, label) else {
              let e = PipelineError::InvariantViolation(format!(
                "router '{}' returned unmapped label '{}'",
                current, label
              ));
              return failed(state, &current, e);
            };
            let target = target.to_string();
            let mut entry = entry_for(
              node,
              StepStatus::Succeeded,
              format!("{} -> {}", label, target),
              started,
            );
            entry.label = Some(label.to_string());
            state.record(entry);
            Some(target)
          }
          Err(e) => return failed(state, &current, e),
        },
      };

      match next {
        Some(next) => current = next,
        None => {
          let status = if degraded {
            RunStatus::Degraded
          } else {
            RunStatus::Succeeded
          };
          info!(
            run_id = %state.run_id(),
            status = status.as_str(),
            verdict = ?state.verdict().map(|v| v.verdict),
            steps = state.audit_log().len(),
            "run complete"
          );
          return RunOutcome {
            status,
            state,
            failure: None,
          };
        }
      }
    }
  }

  /// Runs many inputs concurrently (at most `max_concurrent_runs` in flight).
  /// Outcomes come back in input order.
  #[instrument(level = "trace", skip(self, inputs, cancel))]
  pub async fn run_batch(&self, inputs: Vec<RunInput>, cancel: CancellationToken) -> Vec<RunOutcome> {
    let limit = self.config.max_concurrent_runs.max(1);
    futures::stream::iter(inputs.into_iter().map(|input| {
      let executor = self.clone();
      let cancel = cancel.child_token();
      async move { executor.run(input, cancel).await }
    }))
    .buffered(limit)
    .collect()
    .await
  }
}
