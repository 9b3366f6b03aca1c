//! Typed patient profile produced by ingestion.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Raw key/value patient record as handed over by a record parser.
pub type RawRecord = BTreeMap<String, String>;

/// Validated patient profile. Names are normalized to lower case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
  pub patient_id: String,
  pub age: Option<u32>,
  pub gender: Option<String>,
  pub weight: Option<f64>,
  pub conditions: BTreeSet<String>,
  pub medications: BTreeSet<String>,
  pub labs: BTreeMap<String, f64>,
}

impl PatientProfile {
  pub fn new(patient_id: impl Into<String>) -> Self {
    Self {
      patient_id: patient_id.into(),
      ..Self::default()
    }
  }

  /// Returns the first condition that mentions `term` (or that `term` mentions)
  /// as a whole run of words.
  pub fn matching_condition(&self, term: &str) -> Option<&str> {
    find_mention(&self.conditions, term)
  }

  /// Returns the first medication that mentions `term` (or that `term` mentions)
  /// as a whole run of words.
  pub fn matching_medication(&self, term: &str) -> Option<&str> {
    find_mention(&self.medications, term)
  }
}

/// Lower-cased alphanumeric words of `text`.
fn words(text: &str) -> Vec<String> {
  text
    .split(|c: char| !c.is_alphanumeric())
    .filter(|w| !w.is_empty())
    .map(str::to_lowercase)
    .collect()
}

/// True when `needle` occurs in `haystack` as consecutive words.
fn contains_words(haystack: &[String], needle: &[String]) -> bool {
  !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

fn find_mention<'a>(items: &'a BTreeSet<String>, term: &str) -> Option<&'a str> {
  let term = words(term);
  if term.is_empty() {
    return None;
  }
  items
    .iter()
    .find(|item| {
      let item = words(item);
      contains_words(&item, &term) || contains_words(&term, &item)
    })
    .map(String::as_str)
}
