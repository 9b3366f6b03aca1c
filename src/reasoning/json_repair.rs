//! Tolerant JSON extraction for language-model output.
//!
//! Models wrap JSON in prose or code fences, leave trailing commas and line
//! comments, or use single quotes. Each pass below is tried in turn until one
//! parses.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{instrument, warn};

static FENCE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").expect("fence regex"));
static LINE_COMMENT: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?m)(^|[,\[{])\s*//[^\n]*$").expect("line comment regex"));
static VALUE_COMMENT: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?m)(\d|true|false|null)[ \t]+//[^\n]*$").expect("value comment regex")
});
static TRAILING_COMMA: Lazy<Regex> =
  Lazy::new(|| Regex::new(r",\s*([}\]])").expect("trailing comma regex"));

fn parse(candidate: &str) -> Option<Value> {
  serde_json::from_str::<Value>(candidate.trim()).ok()
}

/// Text between the first `{` and the last `}`.
fn outer_object(raw: &str) -> Option<&str> {
  let start = raw.find('{')?;
  let end = raw.rfind('}')?;
  (end > start).then(|| &raw[start..=end])
}

fn scrub(candidate: &str) -> String {
  let s = LINE_COMMENT.replace_all(candidate, "$1");
  let s = VALUE_COMMENT.replace_all(&s, "$1");
  TRAILING_COMMA.replace_all(&s, "$1").into_owned()
}

/// Best-effort decode of the first JSON object in `raw`.
#[instrument(level = "trace", skip(raw))]
pub fn extract_json(raw: &str) -> Option<Value> {
  if let Some(v) = parse(raw) {
    return Some(v);
  }
  let unfenced = FENCE
    .captures(raw)
    .and_then(|c| c.get(1))
    .map(|m| m.as_str())
    .unwrap_or(raw);
  if let Some(v) = parse(unfenced) {
    return Some(v);
  }
  let object = outer_object(unfenced)?;
  if let Some(v) = parse(object) {
    return Some(v);
  }
  let scrubbed = scrub(object);
  if let Some(v) = parse(&scrubbed) {
    return Some(v);
  }
  if !scrubbed.contains('"') {
    if let Some(v) = parse(&scrubbed.replace('\'', "\"")) {
      return Some(v);
    }
  }
  warn!(len = raw.len(), "no JSON object found in model output");
  None
}
