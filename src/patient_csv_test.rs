//! Tests for patient CSV loading.

use crate::patient_csv::{
  CONDITIONS_FILE, OBSERVATIONS_FILE, PATIENTS_FILE, load_patient_dir, load_patients,
  read_records,
};

#[test]
fn flat_rows_become_records() {
  let csv = "patient_id, age ,conditions\nP1,54,type 2 diabetes;hypertension\nP2,33,\n";
  let records = read_records(csv.as_bytes()).unwrap();
  assert_eq!(records.len(), 2);
  assert_eq!(records[0]["age"], "54");
  assert_eq!(records[0]["conditions"], "type 2 diabetes;hypertension");
  assert_eq!(records[1]["conditions"], "");
}

#[test]
fn directory_tables_are_joined() {
  let dir = tempfile::tempdir().unwrap();
  std::fs::write(
    dir.path().join(PATIENTS_FILE),
    "Id,BIRTHDATE,GENDER\nabc,1970-01-01,F\n,1980-01-01,M\n",
  )
  .unwrap();
  std::fs::write(
    dir.path().join(CONDITIONS_FILE),
    "START,PATIENT,DESCRIPTION\n2020-01-01,abc,Hypertension\n2021-01-01,abc,Type 2 diabetes\n",
  )
  .unwrap();
  std::fs::write(
    dir.path().join(OBSERVATIONS_FILE),
    "DATE,PATIENT,DESCRIPTION,VALUE\n2020-01-01,abc,Systolic Blood Pressure,150\n2021-01-01,abc,Systolic Blood Pressure,128\n",
  )
  .unwrap();

  let records = load_patient_dir(dir.path()).unwrap();
  assert_eq!(records.len(), 2);
  let abc = &records[0];
  assert_eq!(abc["conditions"], "Hypertension;Type 2 diabetes");
  assert_eq!(abc["lab:systolic blood pressure"], "128");
  assert!(!abc.contains_key("medications"));
  assert!(!records[1].contains_key("conditions"));

  assert_eq!(load_patients(dir.path()).unwrap(), records);
}

#[test]
fn table_without_join_column_is_skipped() {
  let dir = tempfile::tempdir().unwrap();
  std::fs::write(dir.path().join(PATIENTS_FILE), "Id\nabc\n").unwrap();
  std::fs::write(
    dir.path().join(CONDITIONS_FILE),
    "WHO,DESCRIPTION\nabc,Asthma\n",
  )
  .unwrap();
  let records = load_patient_dir(dir.path()).unwrap();
  assert!(!records[0].contains_key("conditions"));
}

#[test]
fn missing_patients_file_is_error() {
  let dir = tempfile::tempdir().unwrap();
  assert!(load_patient_dir(dir.path()).is_err());
}
