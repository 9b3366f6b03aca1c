//! Reasoner that runs an external command: prompt on stdin, JSON answer on stdout.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{instrument, warn};

use super::json_repair::extract_json;
use super::{Reasoner, ReasoningError, ReasoningRequest, ReasoningResponse, decode_answer};

/// Env var overriding the agent command.
pub const ENV_AGENT_CMD: &str = "TRIALWEAVE_AGENT_CMD";

/// Runs `agent_cmd` (split on whitespace) once per request.
///
/// The child is spawned with `kill_on_drop`, so a timed-out or cancelled call
/// does not outlive the run.
pub struct CommandReasoner {
  agent_cmd: String,
}

impl CommandReasoner {
  pub fn new(agent_cmd: impl Into<String>) -> Self {
    Self {
      agent_cmd: agent_cmd.into(),
    }
  }

  pub fn agent_cmd(&self) -> &str {
    &self.agent_cmd
  }
}

#[async_trait]
impl Reasoner for CommandReasoner {
  fn name(&self) -> &str {
    "command"
  }

  #[instrument(level = "trace", skip(self, request), fields(agent_cmd = %self.agent_cmd))]
  async fn reason(&self, request: &ReasoningRequest) -> Result<ReasoningResponse, ReasoningError> {
    let parts: Vec<&str> = self.agent_cmd.split_whitespace().collect();
    let Some((bin, args)) = parts.split_first() else {
      return Err(ReasoningError::Unavailable("agent_cmd is empty".to_string()));
    };

    let mut child = Command::new(bin)
      .args(args)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::inherit())
      .kill_on_drop(true)
      .spawn()
      .map_err(|e| ReasoningError::Unavailable(format!("agent spawn: {}", e)))?;

    if let Some(mut stdin) = child.stdin.take() {
      let mut prompt = request.prompt();
      prompt.push('\n');
      if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
        warn!(error = %e, "agent closed stdin early");
      }
    }

    let output = child
      .wait_with_output()
      .await
      .map_err(|e| ReasoningError::Unavailable(format!("agent wait: {}", e)))?;
    if !output.status.success() {
      let msg = output
        .status
        .code()
        .map(|c| format!("agent exit {}", c))
        .unwrap_or_else(|| "agent signal".to_string());
      return Err(ReasoningError::Unavailable(msg));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let value = extract_json(&stdout).ok_or_else(|| {
      ReasoningError::InvalidResponse("agent output contains no JSON object".to_string())
    })?;
    decode_answer(&value)
  }
}
