//! Submission evaluator
//!
//! Maps (exercise, submission) to a score and feedback. Total and
//! deterministic: malformed input yields a zero score with an explanation,
//! never an error, and nothing here mutates state.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use super::rubric::{completion_credit, Rubric, StructuralRubric};
use super::Evaluation;
use crate::domain::{Exercise, ExerciseKind};

/// Dispatches grading by exercise kind
pub struct Evaluator {
    rubrics: HashMap<ExerciseKind, Box<dyn Rubric>>,
    fallback: Box<dyn Rubric>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::with_builtin_rubrics()
    }
}

impl Evaluator {
    /// Evaluator with no kind-specific rubrics
    pub fn new(fallback: Box<dyn Rubric>) -> Self {
        Self {
            rubrics: HashMap::new(),
            fallback,
        }
    }

    /// Evaluator with a rubric for every known exercise kind
    pub fn with_builtin_rubrics() -> Self {
        let mut evaluator = Self::new(Box::new(StructuralRubric::generic()));
        evaluator.register(
            ExerciseKind::SystemModeling,
            Box::new(StructuralRubric::system_modeling()),
        );
        evaluator.register(
            ExerciseKind::MicroserviceBoundary,
            Box::new(StructuralRubric::microservice_boundary()),
        );
        evaluator.register(
            ExerciseKind::RequirementAbstraction,
            Box::new(StructuralRubric::requirement_abstraction()),
        );
        evaluator.register(
            ExerciseKind::DataNormalization,
            Box::new(StructuralRubric::data_normalization()),
        );
        evaluator
    }

    /// Register (or replace) the rubric for a kind
    pub fn register(&mut self, kind: ExerciseKind, rubric: Box<dyn Rubric>) {
        self.rubrics.insert(kind, rubric);
    }

    pub fn evaluate(&self, exercise: &Exercise, submission: &Value) -> Evaluation {
        let answer = extract_answer(submission);
        if is_blank(answer) {
            return Evaluation::zero("Submission is empty or malformed; nothing to grade.");
        }

        let mut evaluation = match &exercise.content.expected_output {
            None => completion_credit(exercise),
            Some(expected) => {
                let rubric = self
                    .rubrics
                    .get(&exercise.content.kind)
                    .unwrap_or(&self.fallback);
                rubric.grade(exercise, expected, answer)
            }
        };
        evaluation.score = evaluation.score.min(exercise.points);

        debug!(
            "[learnpath:eval] {} ({}) scored {}/{}",
            exercise.id,
            exercise.content.kind.as_str(),
            evaluation.score,
            exercise.points
        );
        evaluation
    }
}

/// The answer is `submission.content` when present, else the whole payload
fn extract_answer(submission: &Value) -> &Value {
    match submission {
        Value::Object(map) if map.contains_key("content") => &map["content"],
        other => other,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExerciseContent, ExerciseId, ModuleId};
    use serde_json::json;

    fn exercise(kind: ExerciseKind, points: u32, expected: Option<Value>) -> Exercise {
        let mut content = ExerciseContent::new(kind);
        content.expected_output = expected;
        Exercise {
            id: ExerciseId::new("e1"),
            module_id: ModuleId::new("m1"),
            title: "t".to_string(),
            description: String::new(),
            content,
            points,
            difficulty: 1,
            order: 1,
        }
    }

    #[test]
    fn test_malformed_submissions_score_zero() {
        let evaluator = Evaluator::default();
        let ex = exercise(ExerciseKind::SystemModeling, 20, Some(json!({ "a": 1 })));
        for submission in [
            json!(null),
            json!({}),
            json!([]),
            json!("   "),
            json!({ "content": null }),
            json!({ "content": {} }),
        ] {
            let eval = evaluator.evaluate(&ex, &submission);
            assert_eq!(eval.score, 0, "submission {submission}");
            assert_eq!(eval.feedback.len(), 1);
        }
    }

    #[test]
    fn test_score_within_bounds_for_varied_inputs() {
        let evaluator = Evaluator::default();
        let expected = json!({ "components": ["api", "db"], "relationships": [{ "from": "api", "to": "db" }] });
        let inputs = [
            json!({ "content": expected.clone() }),
            json!({ "content": { "components": ["api"] } }),
            json!(42),
            json!("free text"),
            json!({ "components": ["API", "DB", "cache"] }),
            json!([1, 2, 3]),
        ];
        for points in [0, 1, 20, 100] {
            let ex = exercise(ExerciseKind::SystemModeling, points, Some(expected.clone()));
            for input in &inputs {
                let eval = evaluator.evaluate(&ex, input);
                assert!(eval.score <= points, "{input} scored {} > {points}", eval.score);
                assert!(!eval.feedback.is_empty());
            }
        }
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let evaluator = Evaluator::default();
        let ex = exercise(
            ExerciseKind::MicroserviceBoundary,
            30,
            Some(json!({ "services": ["billing", "catalog", "orders"] })),
        );
        let submission = json!({ "content": { "services": ["orders", "billing"] } });
        let first = evaluator.evaluate(&ex, &submission);
        for _ in 0..10 {
            assert_eq!(evaluator.evaluate(&ex, &submission), first);
        }
        assert_eq!(first.score, 20);
    }

    #[test]
    fn test_unknown_kind_uses_fallback() {
        let evaluator = Evaluator::default();
        let ex = exercise(ExerciseKind::Unknown, 10, Some(json!(["x"])));
        let eval = evaluator.evaluate(&ex, &json!(["x"]));
        assert_eq!(eval.score, 10);
        assert_eq!(eval.feedback, vec!["The answer matches the reference solution."]);
    }

    #[test]
    fn test_no_reference_gives_completion_credit() {
        let evaluator = Evaluator::default();
        let ex = exercise(ExerciseKind::RequirementAbstraction, 15, None);
        let eval = evaluator.evaluate(&ex, &json!({ "content": "my answer", "notes": "n" }));
        assert_eq!(eval.score, 15);
    }

    struct Greedy;

    impl Rubric for Greedy {
        fn grade(&self, _: &Exercise, _: &Value, _: &Value) -> Evaluation {
            Evaluation {
                score: u32::MAX,
                feedback: vec!["generous".to_string()],
            }
        }
    }

    #[test]
    fn test_registered_rubric_is_clamped_to_ceiling() {
        let mut evaluator = Evaluator::default();
        evaluator.register(ExerciseKind::DataNormalization, Box::new(Greedy));
        let ex = exercise(ExerciseKind::DataNormalization, 12, Some(json!({})));
        assert_eq!(evaluator.evaluate(&ex, &json!({ "x": 1 })).score, 12);
    }
}
