//! Trial eligibility text: section segmentation and clause → predicate parsing.
//!
//! Understands the usual registry layout:
//!
//! ```text
//! Inclusion Criteria:
//!   - Age >= 18 years
//!   - Diagnosis of type 2 diabetes
//! Exclusion Criteria:
//!   1. Current use of warfarin
//!   2. eGFR < 30
//! ```
//!
//! Clauses no rule recognizes are kept as low-confidence predicates.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{instrument, warn};

use crate::error::PipelineError;
use crate::types::{Operator, Predicate, PredicateValue, RuleKind, Subject, UNPARSED_CONFIDENCE};

/// Confidence for numeric comparisons, ranges and gender rules.
pub const NUMERIC_CONFIDENCE: f64 = 0.95;
/// Confidence for condition / medication mentions.
pub const MENTION_CONFIDENCE: f64 = 0.9;
/// Confidence for negated mentions (`no history of ...`).
pub const NEGATED_CONFIDENCE: f64 = 0.85;

/// Heading that narrows long protocol documents to the eligibility section.
const SELECTION_ANCHOR: &str = "selection of patients";

const NUM: &str = r"(\d+(?:\.\d+)?)";

static HEADING: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?i)^(?:key\s+)?(inclusion|exclusion)(?:\s+criteria\s*:?|\s*:)\s*(.*)$")
    .expect("heading regex")
});

static BULLET: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^(?:[-*•]|\d+[.)]|[a-z][.)])\s+").expect("bullet regex"));

static RANGE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(&format!(
    r"^(?P<name>[a-z][a-z0-9 ]{{0,40}}?)\s+(?:between\s+|from\s+)?(?P<lo>{NUM})\s*(?:-|–|to|and)\s*(?P<hi>{NUM})\b"
  ))
  .expect("range regex")
});

static COMPARISON: Lazy<Regex> = Lazy::new(|| {
  Regex::new(&format!(
    r"^(?P<name>[a-z][a-z0-9 ]{{0,40}}?)\s*(?:must be\s+|should be\s+|is\s+|of\s+)?(?P<op>>=|<=|≥|≤|>|<|=|at least|no less than|at most|no more than|greater than or equal to|less than or equal to|greater than|more than|less than|older than|younger than|over|above|under|below)\s*(?P<num>{NUM})"
  ))
  .expect("comparison regex")
});

static AGE_POSTFIX: Lazy<Regex> = Lazy::new(|| {
  Regex::new(&format!(
    r"^(?:aged?\s+(?:of\s+)?)?(?P<num>{NUM})\s*(?:years?\s*)?(?:of age\s*)?(?:or|and)\s+(?P<dir>older|above|over|younger|below|under)"
  ))
  .expect("age postfix regex")
});

static GENDER: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^(?:(?:gender|sex)\s*(?::|=|is|must be)?\s*(?P<a>male|female|any|all)\b|(?P<b>male or female|female or male|males?|females?|women|men)\b(?:\s+(?:patients|subjects|participants|only))*$)")
    .expect("gender regex")
});

static MEDICATION_NEG: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^(?:no|not)\s+(?:current(?:ly)?\s+)?(?:use of|using|taking|treatment with|receiving)\s+(?P<x>.+)$")
    .expect("negated medication regex")
});

static MEDICATION: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^(?:(?:current(?:ly)?|concurrent|ongoing)\s+)?(?:(?:use of|using|taking|treatment with|receiving|on)\s+|(?:medications?|drugs?)\s*:\s*)(?P<x>.+)$")
    .expect("medication regex")
});

static CONDITION_NEG: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^(?:no|without)\s+(?:(?:prior|known|documented)\s+)?(?:(?:history|diagnosis|evidence)\s+of\s+)?(?P<x>.+)$")
    .expect("negated condition regex")
});

static CONDITION: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^(?:(?:confirmed|documented|prior|known|active)\s+)?(?:(?:diagnosis of|diagnosed with|history of|presence of|(?:patients?|subjects?|participants?)\s+with)\s+|(?:conditions?|diagnosis)\s*:\s*)(?P<x>.+)$")
    .expect("condition regex")
});

/// One eligibility clause with the section it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
  pub kind: RuleKind,
  pub text: String,
}

/// Structured form of a clause before ids are assigned.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParsedRule {
  pub subject: Subject,
  pub operator: Operator,
  pub value: PredicateValue,
  pub confidence: f64,
}

/// Splits trial text into inclusion / exclusion clauses.
///
/// Text before the first heading is ignored. When the document contains a
/// "selection of patients" heading, segmentation starts there, unless no
/// criteria follow it; then the whole text is segmented.
#[instrument(level = "trace", skip(text))]
pub fn segment(text: &str) -> Vec<Clause> {
  if let Some(start) = text.to_ascii_lowercase().find(SELECTION_ANCHOR) {
    let clauses = segment_lines(&text[start..]);
    if !clauses.is_empty() {
      return clauses;
    }
  }
  segment_lines(text)
}

fn segment_lines(text: &str) -> Vec<Clause> {
  let mut section = None;
  let mut clauses = Vec::new();
  for line in text.lines() {
    let line = line.trim();
    if line.is_empty() {
      continue;
    }
    if let Some(caps) = HEADING.captures(line) {
      section = if caps[1].eq_ignore_ascii_case("inclusion") {
        Some(RuleKind::Inclusion)
      } else {
        Some(RuleKind::Exclusion)
      };
      let rest = clean_clause(&caps[2]);
      if let (Some(kind), false) = (section, rest.is_empty()) {
        clauses.push(Clause { kind, text: rest });
      }
      continue;
    }
    let Some(kind) = section else {
      continue;
    };
    let text = clean_clause(line);
    if !text.is_empty() {
      clauses.push(Clause { kind, text });
    }
  }
  clauses
}

/// Strips bullet markers and trailing punctuation.
pub(crate) fn clean_clause(line: &str) -> String {
  let line = line.trim();
  let line = BULLET.replace(line, "");
  line
    .trim()
    .trim_end_matches(['.', ';', ','])
    .trim()
    .to_string()
}

fn subject_for(name: &str) -> Subject {
  match name.trim() {
    "age" | "aged" | "patient age" => Subject::Age,
    "weight" | "body weight" => Subject::Weight,
    other => Subject::Lab(other.to_string()),
  }
}

fn operator_for(op: &str) -> Operator {
  match op {
    ">=" | "≥" | "at least" | "no less than" | "greater than or equal to" => Operator::AtLeast,
    "<=" | "≤" | "at most" | "no more than" | "less than or equal to" => Operator::AtMost,
    ">" | "greater than" | "more than" | "older than" | "over" | "above" => Operator::GreaterThan,
    "<" | "less than" | "younger than" | "under" | "below" => Operator::LessThan,
    _ => Operator::Equals,
  }
}

fn number(caps: &regex::Captures<'_>, name: &str) -> Option<f64> {
  caps.name(name)?.as_str().parse().ok()
}

fn numeric(subject: Subject, operator: Operator, value: f64) -> ParsedRule {
  ParsedRule {
    subject,
    operator,
    value: PredicateValue::Number(value),
    confidence: NUMERIC_CONFIDENCE,
  }
}

fn mention(subject: Subject, operator: Operator, text: &str, confidence: f64) -> ParsedRule {
  ParsedRule {
    subject,
    operator,
    value: PredicateValue::Text(text.trim().to_string()),
    confidence,
  }
}

/// Parses one clause into one or more rules.
pub(crate) fn parse_clause(clause: &str) -> Result<Vec<ParsedRule>, PipelineError> {
  let text = clean_clause(&clause.to_lowercase());
  let unparseable = || PipelineError::UnparseableRule {
    clause: clause.to_string(),
  };

  if let Some(c) = GENDER.captures(&text) {
    let raw = c
      .name("a")
      .or_else(|| c.name("b"))
      .map(|m| m.as_str())
      .unwrap_or("");
    let value = match raw {
      "male or female" | "female or male" | "any" | "all" => "any",
      "female" | "females" | "women" => "female",
      _ => "male",
    };
    return Ok(vec![ParsedRule {
      subject: Subject::Gender,
      operator: Operator::Equals,
      value: PredicateValue::Text(value.to_string()),
      confidence: NUMERIC_CONFIDENCE,
    }]);
  }
  if let Some(c) = AGE_POSTFIX.captures(&text) {
    let n = number(&c, "num").ok_or_else(unparseable)?;
    let op = match c.name("dir").map(|m| m.as_str()) {
      Some("younger" | "below" | "under") => Operator::AtMost,
      _ => Operator::AtLeast,
    };
    return Ok(vec![numeric(Subject::Age, op, n)]);
  }
  if let Some(c) = RANGE.captures(&text) {
    let (lo, hi) = (number(&c, "lo"), number(&c, "hi"));
    if let (Some(lo), Some(hi)) = (lo, hi) {
      let subject = subject_for(&c["name"]);
      return Ok(vec![
        numeric(subject.clone(), Operator::AtLeast, lo.min(hi)),
        numeric(subject, Operator::AtMost, lo.max(hi)),
      ]);
    }
  }
  if let Some(c) = COMPARISON.captures(&text) {
    let n = number(&c, "num").ok_or_else(unparseable)?;
    return Ok(vec![numeric(
      subject_for(&c["name"]),
      operator_for(&c["op"]),
      n,
    )]);
  }
  if let Some(c) = MEDICATION_NEG.captures(&text) {
    return Ok(vec![mention(
      Subject::Medication,
      Operator::Excludes,
      &c["x"],
      NEGATED_CONFIDENCE,
    )]);
  }
  if let Some(c) = MEDICATION.captures(&text) {
    return Ok(vec![mention(
      Subject::Medication,
      Operator::Contains,
      &c["x"],
      MENTION_CONFIDENCE,
    )]);
  }
  if let Some(c) = CONDITION_NEG.captures(&text) {
    return Ok(vec![mention(
      Subject::Condition,
      Operator::Excludes,
      &c["x"],
      NEGATED_CONFIDENCE,
    )]);
  }
  if let Some(c) = CONDITION.captures(&text) {
    return Ok(vec![mention(
      Subject::Condition,
      Operator::Contains,
      &c["x"],
      MENTION_CONFIDENCE,
    )]);
  }
  Err(unparseable())
}

/// Turns clauses into predicates with stable ids (`inc-1`, `exc-1`, ...).
///
/// Unparseable clauses become low-confidence [Subject::Unrecognized] predicates.
#[instrument(level = "trace", skip(clauses))]
pub fn extract_predicates(clauses: &[Clause]) -> Vec<Predicate> {
  let mut predicates = Vec::new();
  let (mut inc, mut exc) = (0u32, 0u32);
  let mut next_id = |kind: RuleKind| match kind {
    RuleKind::Inclusion => {
      inc += 1;
      format!("inc-{}", inc)
    }
    RuleKind::Exclusion => {
      exc += 1;
      format!("exc-{}", exc)
    }
  };
  for clause in clauses {
    match parse_clause(&clause.text) {
      Ok(rules) => {
        for rule in rules {
          predicates.push(Predicate {
            id: next_id(clause.kind),
            kind: clause.kind,
            subject: rule.subject,
            operator: rule.operator,
            value: rule.value,
            confidence: rule.confidence,
            source: clause.text.clone(),
            note: None,
          });
        }
      }
      Err(e) => {
        warn!(clause = %clause.text, "recording unparseable clause as low-confidence predicate");
        predicates.push(Predicate {
          id: next_id(clause.kind),
          kind: clause.kind,
          subject: Subject::Unrecognized,
          operator: Operator::Equals,
          value: PredicateValue::Text(clause.text.clone()),
          confidence: UNPARSED_CONFIDENCE,
          source: clause.text.clone(),
          note: Some(e.to_string()),
        });
      }
    }
  }
  predicates
}
