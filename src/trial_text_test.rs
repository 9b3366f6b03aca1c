//! Tests for `trial_text`.

use crate::error::PipelineError;
use crate::trial_text::{
  Clause, MENTION_CONFIDENCE, NEGATED_CONFIDENCE, clean_clause, extract_predicates, parse_clause,
  segment,
};
use crate::types::{Operator, PredicateValue, RuleKind, Subject};

const TRIAL: &str = "\
Study of drug X in adults with diabetes.

Inclusion Criteria:
  - Age >= 18 years
  - Diagnosis of type 2 diabetes
  * HbA1c between 7 and 10
Exclusion Criteria:
  1. Current use of warfarin
  2. eGFR < 30.
  3. Pregnancy or breastfeeding
";

#[test]
fn segment_splits_sections_and_skips_preamble() {
  let clauses = segment(TRIAL);
  assert_eq!(clauses.len(), 6);
  assert_eq!(
    clauses[0],
    Clause {
      kind: RuleKind::Inclusion,
      text: "Age >= 18 years".to_string()
    }
  );
  assert_eq!(clauses[3].kind, RuleKind::Exclusion);
  assert_eq!(clauses[4].text, "eGFR < 30");
}

#[test]
fn segment_heading_remainder_is_a_clause() {
  let clauses = segment("Inclusion criteria: age >= 21\nExclusion: on insulin");
  assert_eq!(clauses.len(), 2);
  assert_eq!(clauses[0].text, "age >= 21");
  assert_eq!(clauses[1].kind, RuleKind::Exclusion);
}

#[test]
fn segment_starts_at_selection_anchor() {
  let text = "Inclusion criteria mentioned in passing: none\n\
              5. SELECTION OF PATIENTS\nInclusion Criteria\n- age >= 40";
  let clauses = segment(text);
  assert_eq!(clauses.len(), 1);
  assert_eq!(clauses[0].text, "age >= 40");
}

#[test]
fn segment_ignores_selection_anchor_after_the_criteria() {
  let text = "Inclusion Criteria:\n- Age >= 18 years\nExclusion Criteria:\n- eGFR < 30\n\
              See the Selection of Patients appendix for details.";
  let clauses = segment(text);
  assert_eq!(clauses.len(), 3);
  assert_eq!(clauses[0].text, "Age >= 18 years");
  assert_eq!(clauses[1].text, "eGFR < 30");
}

#[test]
fn segment_without_headings_is_empty() {
  assert!(segment("Adults with diabetes are welcome.").is_empty());
}

#[test]
fn clean_clause_strips_bullets() {
  assert_eq!(clean_clause("  12) Weight over 50 kg;"), "Weight over 50 kg");
  assert_eq!(clean_clause("• no prior stroke."), "no prior stroke");
}

#[test]
fn parse_comparisons() {
  let r = parse_clause("Age >= 18 years").unwrap();
  assert_eq!(r[0].subject, Subject::Age);
  assert_eq!(r[0].operator, Operator::AtLeast);
  assert_eq!(r[0].value, PredicateValue::Number(18.0));

  let r = parse_clause("eGFR < 30").unwrap();
  assert_eq!(r[0].subject, Subject::Lab("egfr".to_string()));
  assert_eq!(r[0].operator, Operator::LessThan);

  let r = parse_clause("Weight over 50 kg").unwrap();
  assert_eq!(r[0].subject, Subject::Weight);
  assert_eq!(r[0].operator, Operator::GreaterThan);
}

#[test]
fn parse_ranges_yield_two_predicates() {
  let r = parse_clause("age 18-75").unwrap();
  assert_eq!(r.len(), 2);
  assert_eq!(r[0].operator, Operator::AtLeast);
  assert_eq!(r[0].value, PredicateValue::Number(18.0));
  assert_eq!(r[1].operator, Operator::AtMost);
  assert_eq!(r[1].value, PredicateValue::Number(75.0));

  let r = parse_clause("HbA1c between 7 and 10").unwrap();
  assert_eq!(r[0].subject, Subject::Lab("hba1c".to_string()));
}

#[test]
fn parse_age_postfix() {
  let r = parse_clause("18 years of age or older").unwrap();
  assert_eq!(r[0].subject, Subject::Age);
  assert_eq!(r[0].operator, Operator::AtLeast);
  let r = parse_clause("aged 65 or younger").unwrap();
  assert_eq!(r[0].operator, Operator::AtMost);
}

#[test]
fn parse_gender() {
  let r = parse_clause("Male or female").unwrap();
  assert_eq!(r[0].value, PredicateValue::Text("any".to_string()));
  let r = parse_clause("Women only").unwrap();
  assert_eq!(r[0].value, PredicateValue::Text("female".to_string()));
}

#[test]
fn parse_mentions() {
  let r = parse_clause("Current use of warfarin").unwrap();
  assert_eq!(r[0].subject, Subject::Medication);
  assert_eq!(r[0].operator, Operator::Contains);
  assert_eq!(r[0].value, PredicateValue::Text("warfarin".to_string()));
  assert_eq!(r[0].confidence, MENTION_CONFIDENCE);

  let r = parse_clause("Diagnosis of type 2 diabetes").unwrap();
  assert_eq!(r[0].subject, Subject::Condition);
  assert_eq!(r[0].value, PredicateValue::Text("type 2 diabetes".to_string()));

  let r = parse_clause("No history of stroke").unwrap();
  assert_eq!(r[0].subject, Subject::Condition);
  assert_eq!(r[0].operator, Operator::Excludes);
  assert_eq!(r[0].confidence, NEGATED_CONFIDENCE);

  let r = parse_clause("Not taking insulin").unwrap();
  assert_eq!(r[0].subject, Subject::Medication);
  assert_eq!(r[0].operator, Operator::Excludes);
}

#[test]
fn ongoing_is_not_read_as_on() {
  let r = parse_clause("ongoing dialysis").unwrap_err();
  assert!(matches!(r, PipelineError::UnparseableRule { .. }));
}

#[test]
fn extract_assigns_ids_and_keeps_unparsed() {
  let predicates = extract_predicates(&segment(TRIAL));
  let ids: Vec<_> = predicates.iter().map(|p| p.id.as_str()).collect();
  assert_eq!(
    ids,
    vec!["inc-1", "inc-2", "inc-3", "inc-4", "exc-1", "exc-2", "exc-3"]
  );
  let unparsed = predicates.last().unwrap();
  assert_eq!(unparsed.subject, Subject::Unrecognized);
  assert!(unparsed.is_low_confidence());
  assert_eq!(unparsed.confidence, 0.0);
  assert!(unparsed.note.as_deref().unwrap().contains("unparseable rule"));
}
