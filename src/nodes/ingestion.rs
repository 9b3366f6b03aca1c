//! Patient ingestion: raw key/value record to typed profile.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use tracing::{instrument, warn};

use super::stage::{Stage, StageContext, StageOutcome};
use crate::error::PipelineError;
use crate::types::{Field, FieldValue, PatientProfile, RawRecord, StateContainer};

/// Prefix of record keys carrying lab values (`lab:hemoglobin`).
pub const LAB_KEY_PREFIX: &str = "lab:";

/// Condition inferred from blood-pressure labs.
pub const UNCONTROLLED_BP: &str = "uncontrolled blood pressure";

const SYSTOLIC_LIMIT: f64 = 140.0;
const DIASTOLIC_LIMIT: f64 = 90.0;

/// Stage turning the raw patient record into a [PatientProfile].
pub struct IngestionStage {
  name: String,
}

impl IngestionStage {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into() }
  }
}

/// Looks a key up case-insensitively, ignoring blank values.
fn lookup<'a>(record: &'a RawRecord, keys: &[&str]) -> Option<&'a str> {
  keys.iter().find_map(|k| {
    record
      .iter()
      .find(|(rk, v)| rk.trim().eq_ignore_ascii_case(k) && !v.trim().is_empty())
      .map(|(_, v)| v.trim())
  })
}

/// Maps free-form gender spellings onto `female` / `male`.
pub(crate) fn normalize_gender(raw: &str) -> String {
  let g = raw.trim().to_lowercase();
  match g.as_str() {
    "f" | "female" | "woman" | "women" => "female".to_string(),
    "m" | "male" | "man" | "men" => "male".to_string(),
    _ => g,
  }
}

/// Whole years between `birthdate` and `as_of`.
pub(crate) fn age_on(birthdate: NaiveDate, as_of: NaiveDate) -> Option<u32> {
  if birthdate > as_of {
    return None;
  }
  let mut years = as_of.year() - birthdate.year();
  if (as_of.month(), as_of.day()) < (birthdate.month(), birthdate.day()) {
    years -= 1;
  }
  u32::try_from(years).ok()
}

/// Splits a `;`/`|` separated list into trimmed lower-case items.
pub(crate) fn split_list(raw: &str) -> impl Iterator<Item = String> + '_ {
  raw
    .split([';', '|'])
    .map(|s| s.trim().to_lowercase())
    .filter(|s| !s.is_empty())
}

fn parse_number(patient_id: &str, key: &str, raw: &str) -> Option<f64> {
  match raw.trim().parse::<f64>() {
    Ok(v) if v.is_finite() => Some(v),
    _ => {
      warn!(patient_id, key, value = raw, "dropping non-numeric value");
      None
    }
  }
}

/// Builds a profile from a raw record.
#[instrument(level = "trace", skip(record))]
pub(crate) fn ingest(record: &RawRecord, as_of: NaiveDate) -> Result<PatientProfile, PipelineError> {
  let patient_id = lookup(record, &["patient_id", "id", "patient"]).ok_or_else(|| {
    PipelineError::MalformedInput("patient record has no patient identifier".to_string())
  })?;
  let mut profile = PatientProfile::new(patient_id);

  profile.age = match lookup(record, &["age"]) {
    Some(raw) => parse_number(patient_id, "age", raw)
      .filter(|a| *a >= 0.0)
      .map(|a| a.floor() as u32),
    None => lookup(record, &["birthdate"]).and_then(|raw| {
      match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(d) => age_on(d, as_of),
        Err(_) => {
          warn!(patient_id, value = raw, "unparseable birthdate");
          None
        }
      }
    }),
  };
  profile.gender = lookup(record, &["gender", "sex"]).map(normalize_gender);
  profile.weight = lookup(record, &["weight"]).and_then(|raw| parse_number(patient_id, "weight", raw));

  if let Some(raw) = lookup(record, &["conditions", "diagnoses"]) {
    profile.conditions.extend(split_list(raw));
  }
  if let Some(raw) = lookup(record, &["medications"]) {
    profile.medications.extend(split_list(raw));
  }
  for (key, raw) in record {
    let key = key.trim().to_lowercase();
    let Some(lab) = key.strip_prefix(LAB_KEY_PREFIX) else {
      continue;
    };
    let lab = lab.trim();
    if lab.is_empty() || raw.trim().is_empty() {
      continue;
    }
    if let Some(v) = parse_number(patient_id, &key, raw) {
      profile.labs.insert(lab.to_string(), v);
    }
  }

  let sbp = profile.labs.get("systolic blood pressure").copied();
  let dbp = profile.labs.get("diastolic blood pressure").copied();
  if sbp.is_some_and(|v| v > SYSTOLIC_LIMIT) || dbp.is_some_and(|v| v > DIASTOLIC_LIMIT) {
    profile.conditions.insert(UNCONTROLLED_BP.to_string());
  }

  Ok(profile)
}

#[async_trait]
impl Stage for IngestionStage {
  fn name(&self) -> &str {
    &self.name
  }

  fn requires(&self) -> &[Field] {
    &[Field::RawPatient]
  }

  fn writes(&self) -> &[Field] {
    &[Field::PatientProfile]
  }

  async fn execute(
    &self,
    state: &StateContainer,
    ctx: &StageContext,
  ) -> Result<StageOutcome, PipelineError> {
    let record = state
      .raw_patient()
      .ok_or_else(|| PipelineError::MalformedInput("raw patient record missing".to_string()))?;
    let profile = ingest(record, ctx.config.reference_date())?;
    let summary = format!(
      "patient {}: {} conditions, {} medications, {} labs",
      profile.patient_id,
      profile.conditions.len(),
      profile.medications.len(),
      profile.labs.len()
    );
    Ok(StageOutcome::new(summary).with(FieldValue::PatientProfile(profile)))
  }
}
