//! Tests for state save/load.

use crate::state_io::{STATE_FILENAME, load_state, save_state};
use crate::types::{Field, FieldValue, PatientProfile, StateContainer};

#[test]
fn roundtrip_save_load() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("runs").join(STATE_FILENAME);
  let mut state = StateContainer::new();
  let mut profile = PatientProfile::new("P1");
  profile.weight = Some(72.35);
  profile.labs.insert("hba1c".to_string(), 0.1 + 0.2);
  state
    .set(Field::PatientProfile, FieldValue::PatientProfile(profile))
    .unwrap();
  save_state(&path, &state).unwrap();
  assert!(path.exists());
  let loaded = load_state(&path).unwrap();
  assert_eq!(loaded, state);
  assert_eq!(
    loaded.patient_profile().unwrap().labs["hba1c"].to_bits(),
    (0.1f64 + 0.2).to_bits()
  );
}

#[test]
fn load_missing_file_returns_error() {
  let dir = tempfile::tempdir().unwrap();
  let r = load_state(&dir.path().join("nonexistent.json"));
  assert!(r.is_err());
}

#[test]
fn load_invalid_json_is_invalid_data() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join(STATE_FILENAME);
  std::fs::write(&path, "{not json").unwrap();
  let err = load_state(&path).unwrap_err();
  assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
}
