//! Feature engineering: evaluate every predicate against the patient profile.

use async_trait::async_trait;
use tracing::instrument;

use super::stage::{Stage, StageContext, StageOutcome};
use crate::error::PipelineError;
use crate::types::{
  ExclusionFlag, Field, FieldValue, Operator, PatientProfile, Predicate, PredicateEvaluation,
  PredicateValue, RuleKind, Satisfaction, StateContainer, Subject,
};

/// Stage producing one [PredicateEvaluation] per predicate plus exclusion flags.
pub struct FeatureEngineeringStage {
  name: String,
}

impl FeatureEngineeringStage {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into() }
  }
}

fn evaluation(
  predicate: &Predicate,
  satisfaction: Satisfaction,
  confidence: f64,
  fields_used: Vec<String>,
  detail: String,
) -> PredicateEvaluation {
  PredicateEvaluation {
    predicate_id: predicate.id.clone(),
    kind: predicate.kind,
    satisfaction,
    score: satisfaction.score(),
    confidence,
    fields_used,
    detail,
  }
}

fn met(yes: bool) -> Satisfaction {
  if yes {
    Satisfaction::Met
  } else {
    Satisfaction::NotMet
  }
}

fn compare_number(
  predicate: &Predicate,
  field: String,
  actual: Option<f64>,
) -> PredicateEvaluation {
  let expected = match predicate.value {
    PredicateValue::Number(n) => n,
    PredicateValue::Text(_) => {
      return evaluation(
        predicate,
        Satisfaction::Unknown,
        0.0,
        vec![field],
        "rule value is not numeric".to_string(),
      );
    }
  };
  match (actual, predicate.operator.compare(actual.unwrap_or_default(), expected)) {
    (Some(v), Some(ok)) => evaluation(
      predicate,
      met(ok),
      predicate.confidence,
      vec![field.clone()],
      format!("{} {} {} {}", field, v, predicate.operator.symbol(), expected),
    ),
    (None, _) => evaluation(
      predicate,
      Satisfaction::Unknown,
      0.0,
      vec![field.clone()],
      format!("{} missing", field),
    ),
    (Some(_), None) => evaluation(
      predicate,
      Satisfaction::Unknown,
      0.0,
      vec![field],
      format!("operator '{}' needs text", predicate.operator.symbol()),
    ),
  }
}

fn compare_mention(
  predicate: &Predicate,
  field: &str,
  found: Option<&str>,
  term: &str,
) -> PredicateEvaluation {
  let satisfaction = match predicate.operator {
    Operator::Contains => met(found.is_some()),
    Operator::Excludes => met(found.is_none()),
    _ => {
      return evaluation(
        predicate,
        Satisfaction::Unknown,
        0.0,
        vec![field.to_string()],
        format!("operator '{}' needs a number", predicate.operator.symbol()),
      );
    }
  };
  let detail = match found {
    Some(hit) => format!("{} '{}' matches '{}'", field, hit, term),
    None => format!("no {} matches '{}'", field, term),
  };
  evaluation(
    predicate,
    satisfaction,
    predicate.confidence,
    vec![field.to_string()],
    detail,
  )
}

/// Evaluates one predicate against one profile.
#[instrument(level = "trace", skip(profile))]
pub(crate) fn evaluate(profile: &PatientProfile, predicate: &Predicate) -> PredicateEvaluation {
  if predicate.is_low_confidence() {
    return evaluation(
      predicate,
      Satisfaction::Unknown,
      0.0,
      vec![],
      format!("clause not understood: \"{}\"", predicate.source),
    );
  }
  let term = match &predicate.value {
    PredicateValue::Text(t) => t.to_lowercase(),
    PredicateValue::Number(n) => n.to_string(),
  };
  match &predicate.subject {
    Subject::Age => compare_number(predicate, "age".to_string(), profile.age.map(f64::from)),
    Subject::Weight => compare_number(predicate, "weight".to_string(), profile.weight),
    Subject::Lab(name) => compare_number(
      predicate,
      format!("labs.{}", name),
      profile.labs.get(name).copied(),
    ),
    Subject::Gender => match (&profile.gender, term.as_str()) {
      (_, "any") => evaluation(
        predicate,
        Satisfaction::Met,
        predicate.confidence,
        vec!["gender".to_string()],
        "any gender accepted".to_string(),
      ),
      (None, _) => evaluation(
        predicate,
        Satisfaction::Unknown,
        0.0,
        vec!["gender".to_string()],
        "gender missing".to_string(),
      ),
      (Some(g), wanted) => evaluation(
        predicate,
        met(g == wanted),
        predicate.confidence,
        vec!["gender".to_string()],
        format!("gender {} vs required {}", g, wanted),
      ),
    },
    Subject::Condition => compare_mention(
      predicate,
      "conditions",
      profile.matching_condition(&term),
      &term,
    ),
    Subject::Medication => compare_mention(
      predicate,
      "medications",
      profile.matching_medication(&term),
      &term,
    ),
    Subject::Unrecognized => evaluation(
      predicate,
      Satisfaction::Unknown,
      0.0,
      vec![],
      "unrecognized subject".to_string(),
    ),
  }
}

/// Exclusion predicates that hold for the patient.
pub(crate) fn exclusion_flags(evaluations: &[PredicateEvaluation]) -> Vec<ExclusionFlag> {
  evaluations
    .iter()
    .filter(|e| e.kind == RuleKind::Exclusion && e.satisfaction == Satisfaction::Met)
    .map(|e| ExclusionFlag {
      predicate_id: e.predicate_id.clone(),
      confidence: e.confidence,
      detail: e.detail.clone(),
    })
    .collect()
}

#[async_trait]
impl Stage for FeatureEngineeringStage {
  fn name(&self) -> &str {
    &self.name
  }

  fn requires(&self) -> &[Field] {
    &[Field::PatientProfile, Field::Predicates]
  }

  fn writes(&self) -> &[Field] {
    &[Field::Features, Field::ExclusionFlags]
  }

  async fn execute(
    &self,
    state: &StateContainer,
    _ctx: &StageContext,
  ) -> Result<StageOutcome, PipelineError> {
    let (Some(profile), Some(predicates)) = (state.patient_profile(), state.predicates()) else {
      return Err(PipelineError::InvariantViolation(
        "feature engineering needs a profile and predicates".to_string(),
      ));
    };
    let evaluations: Vec<_> = predicates.iter().map(|p| evaluate(profile, p)).collect();
    let flags = exclusion_flags(&evaluations);
    let met = evaluations
      .iter()
      .filter(|e| e.satisfaction == Satisfaction::Met)
      .count();
    let summary = format!(
      "{} of {} predicates met, {} exclusion flags",
      met,
      evaluations.len(),
      flags.len()
    );
    Ok(
      StageOutcome::new(summary)
        .with(FieldValue::Features(evaluations))
        .with(FieldValue::ExclusionFlags(flags)),
    )
  }
}
