//! Patient records from CSV: a single flat file, or a directory of tables
//! (`patients.csv` plus optional `conditions.csv`, `medications.csv` and
//! `observations.csv`) joined on the patient id.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use tracing::{info, instrument, warn};

use crate::nodes::LAB_KEY_PREFIX;
use crate::types::RawRecord;

pub const PATIENTS_FILE: &str = "patients.csv";
pub const CONDITIONS_FILE: &str = "conditions.csv";
pub const MEDICATIONS_FILE: &str = "medications.csv";
pub const OBSERVATIONS_FILE: &str = "observations.csv";

const JOIN_COLUMNS: [&str; 2] = ["PATIENT", "PATIENTID"];
const ID_COLUMNS: [&str; 2] = ["Id", "patient_id"];

/// Reads CSV rows into header → value records. Headers are trimmed.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<RawRecord>, std::io::Error> {
  let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
  let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
  let mut records = Vec::new();
  for row in rdr.records() {
    let row = row?;
    let record: RawRecord = headers
      .iter()
      .zip(row.iter())
      .map(|(h, v)| (h.clone(), v.trim().to_string()))
      .collect();
    records.push(record);
  }
  Ok(records)
}

#[instrument(level = "trace")]
pub fn load_csv_file(path: &Path) -> Result<Vec<RawRecord>, std::io::Error> {
  read_records(std::fs::File::open(path)?)
}

/// Case-insensitive column value, ignoring blanks.
fn column<'a>(record: &'a RawRecord, names: &[&str]) -> Option<&'a str> {
  names.iter().find_map(|n| {
    record
      .iter()
      .find(|(k, v)| k.eq_ignore_ascii_case(n) && !v.is_empty())
      .map(|(_, v)| v.as_str())
  })
}

/// Rows of an optional table grouped by patient id.
fn grouped(dir: &Path, file: &str) -> Result<BTreeMap<String, Vec<RawRecord>>, std::io::Error> {
  let path = dir.join(file);
  if !path.exists() {
    return Ok(BTreeMap::new());
  }
  let rows = load_csv_file(&path)?;
  let mut groups: BTreeMap<String, Vec<RawRecord>> = BTreeMap::new();
  let has_join = |r: &RawRecord| {
    r.keys()
      .any(|k| JOIN_COLUMNS.iter().any(|c| k.eq_ignore_ascii_case(c)))
  };
  if rows.first().is_some_and(|r| !has_join(r)) {
    warn!(file, "skipping table without PATIENT or PATIENTID column");
    return Ok(groups);
  }
  for row in rows {
    if let Some(pid) = column(&row, &JOIN_COLUMNS) {
      groups.entry(pid.to_string()).or_default().push(row);
    }
  }
  Ok(groups)
}

fn descriptions(rows: Option<&Vec<RawRecord>>) -> String {
  rows
    .into_iter()
    .flatten()
    .filter_map(|r| column(r, &["DESCRIPTION"]))
    .collect::<Vec<_>>()
    .join(";")
}

/// Loads a patient table directory into one flat record per patient.
///
/// Conditions and medications become `;`-joined `conditions` / `medications`
/// values; observations become `lab:<description>` keys (later rows win).
/// Patients without an id are kept so ingestion can report them.
#[instrument(level = "trace")]
pub fn load_patient_dir(dir: &Path) -> Result<Vec<RawRecord>, std::io::Error> {
  let patients = load_csv_file(&dir.join(PATIENTS_FILE))?;
  let conditions = grouped(dir, CONDITIONS_FILE)?;
  let medications = grouped(dir, MEDICATIONS_FILE)?;
  let observations = grouped(dir, OBSERVATIONS_FILE)?;

  let mut records = Vec::with_capacity(patients.len());
  for mut record in patients {
    let Some(pid) = column(&record, &ID_COLUMNS).map(str::to_string) else {
      records.push(record);
      continue;
    };
    let conds = descriptions(conditions.get(&pid));
    if !conds.is_empty() {
      record.insert("conditions".to_string(), conds);
    }
    let meds = descriptions(medications.get(&pid));
    if !meds.is_empty() {
      record.insert("medications".to_string(), meds);
    }
    for obs in observations.get(&pid).into_iter().flatten() {
      if let (Some(desc), Some(value)) = (column(obs, &["DESCRIPTION"]), column(obs, &["VALUE"])) {
        record.insert(
          format!("{}{}", LAB_KEY_PREFIX, desc.to_lowercase()),
          value.to_string(),
        );
      }
    }
    records.push(record);
  }
  info!(patients = records.len(), dir = %dir.display(), "patient tables loaded");
  Ok(records)
}

/// Loads `path` as a table directory or a single CSV file.
pub fn load_patients(path: &Path) -> Result<Vec<RawRecord>, std::io::Error> {
  if path.is_dir() {
    load_patient_dir(path)
  } else {
    load_csv_file(path)
  }
}
