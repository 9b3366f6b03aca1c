//! Reasoner backed by a local Ollama server (`POST /api/generate`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::json_repair::extract_json;
use super::{Reasoner, ReasoningError, ReasoningRequest, ReasoningResponse, decode_answer};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.1:latest";
/// Env var overriding the Ollama base URL.
pub const ENV_OLLAMA_URL: &str = "TRIALWEAVE_OLLAMA_URL";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
  model: &'a str,
  prompt: String,
  stream: bool,
  format: &'a str,
  options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
  temperature: f64,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
  response: String,
}

pub struct OllamaReasoner {
  client: reqwest::Client,
  base_url: String,
  model: String,
}

impl OllamaReasoner {
  pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
    Self {
      client: reqwest::Client::new(),
      base_url: base_url.into().trim_end_matches('/').to_string(),
      model: model.into(),
    }
  }

  pub fn endpoint(&self) -> String {
    format!("{}/api/generate", self.base_url)
  }
}

impl Default for OllamaReasoner {
  fn default() -> Self {
    Self::new(DEFAULT_OLLAMA_URL, DEFAULT_MODEL)
  }
}

#[async_trait]
impl Reasoner for OllamaReasoner {
  fn name(&self) -> &str {
    "ollama"
  }

  #[instrument(level = "trace", skip(self, request), fields(model = %self.model))]
  async fn reason(&self, request: &ReasoningRequest) -> Result<ReasoningResponse, ReasoningError> {
    let body = GenerateRequest {
      model: &self.model,
      prompt: request.prompt(),
      stream: false,
      format: "json",
      options: GenerateOptions { temperature: 0.0 },
    };
    let response = self
      .client
      .post(self.endpoint())
      .json(&body)
      .send()
      .await
      .map_err(|e| ReasoningError::Unavailable(format!("ollama request: {}", e)))?;
    let status = response.status();
    if !status.is_success() {
      return Err(ReasoningError::Unavailable(format!(
        "ollama returned HTTP {}",
        status
      )));
    }
    let generated: GenerateResponse = response
      .json()
      .await
      .map_err(|e| ReasoningError::InvalidResponse(format!("ollama body: {}", e)))?;
    let value = extract_json(&generated.response).ok_or_else(|| {
      ReasoningError::InvalidResponse("model output contains no JSON object".to_string())
    })?;
    let answer = decode_answer(&value)?;
    info!(
      patient_id = %request.profile.patient_id,
      verdict = %answer.verdict,
      "ollama answered"
    );
    Ok(answer)
  }
}
