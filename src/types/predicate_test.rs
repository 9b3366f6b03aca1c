//! Tests for `Predicate` and `Operator`.

use super::{Operator, Predicate, PredicateValue, RuleKind, Subject};

fn predicate(subject: Subject, operator: Operator, value: PredicateValue) -> Predicate {
  Predicate {
    id: "inc-1".to_string(),
    kind: RuleKind::Inclusion,
    subject,
    operator,
    value,
    confidence: 0.95,
    source: "Age >= 18".to_string(),
    note: None,
  }
}

#[test]
fn operator_compare_numeric() {
  assert_eq!(Operator::AtLeast.compare(18.0, 18.0), Some(true));
  assert_eq!(Operator::GreaterThan.compare(18.0, 18.0), Some(false));
  assert_eq!(Operator::AtMost.compare(3.0, 4.0), Some(true));
  assert_eq!(Operator::LessThan.compare(4.0, 4.0), Some(false));
  assert_eq!(Operator::Equals.compare(1.5, 1.5), Some(true));
  assert_eq!(Operator::Contains.compare(1.0, 1.0), None);
}

#[test]
fn describe_parsed_predicate() {
  let p = predicate(Subject::Age, Operator::AtLeast, PredicateValue::Number(18.0));
  assert_eq!(p.describe(), "inc-1 (age >= 18)");
  assert!(!p.is_low_confidence());
}

#[test]
fn describe_unrecognized_predicate() {
  let mut p = predicate(
    Subject::Unrecognized,
    Operator::Equals,
    PredicateValue::Text("willing to comply".into()),
  );
  p.source = "willing to comply".into();
  p.note = Some("unparseable rule: willing to comply".into());
  assert!(p.is_low_confidence());
  assert!(p.describe().contains("unparsed"));
}

#[test]
fn predicate_serializes_subject_and_value() {
  let p = predicate(
    Subject::Lab("hemoglobin".into()),
    Operator::AtLeast,
    PredicateValue::Number(10.0),
  );
  let json = serde_json::to_value(&p).unwrap();
  assert_eq!(json["subject"]["type"], "lab");
  assert_eq!(json["subject"]["name"], "hemoglobin");
  assert_eq!(json["operator"], "at_least");
  assert_eq!(json["value"], 10.0);
  let back: Predicate = serde_json::from_value(json).unwrap();
  assert_eq!(back, p);
}
