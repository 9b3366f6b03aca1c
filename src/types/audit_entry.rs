//! One audit-log record per visited node.

use serde::{Deserialize, Serialize};

use super::Field;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
  Stage,
  Router,
}

/// Slow nodes may call an external reasoning capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationClass {
  Fast,
  Slow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
  Succeeded,
  Failed,
}

/// Audit record of one node execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
  /// 1-based position in traversal order.
  pub step: u32,
  pub node: String,
  pub node_kind: NodeKind,
  pub duration_class: DurationClass,
  pub status: StepStatus,
  /// Short human-readable summary of what the node produced.
  pub summary: String,
  pub fields_written: Vec<Field>,
  /// Label chosen by a router.
  pub label: Option<String>,
  /// Error message when `status` is `Failed`.
  pub error: Option<String>,
  pub elapsed_ms: u64,
}
