//! Run state save/load (JSON), for replaying or inspecting a run.

use std::path::Path;

use tracing::instrument;

use crate::types::StateContainer;

/// Default filename for a saved state under a run directory.
pub const STATE_FILENAME: &str = "state.json";

/// Saves `state` to `path` as pretty JSON, creating parent directories.
#[instrument(level = "trace", skip(path, state))]
pub fn save_state(path: &Path, state: &StateContainer) -> Result<(), std::io::Error> {
  let json = serde_json::to_string_pretty(state)
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)?;
  }
  std::fs::write(path, json)
}

/// Loads a state from `path`. Returns error if file is missing or invalid JSON.
#[instrument(level = "trace", skip(path))]
pub fn load_state(path: &Path) -> Result<StateContainer, std::io::Error> {
  let bytes = std::fs::read(path)?;
  serde_json::from_slice(&bytes)
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}
