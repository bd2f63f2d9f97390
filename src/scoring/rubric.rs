//! Per-kind grading strategies

use serde_json::Value;

use super::structural::compare;
use super::Evaluation;
use crate::domain::Exercise;

/// Most missing entries listed in feedback
const MAX_MISSING_LISTED: usize = 5;

/// Grades an answer against an exercise's reference output
pub trait Rubric: Send + Sync {
    fn grade(&self, exercise: &Exercise, expected: &Value, answer: &Value) -> Evaluation;
}

/// Structural comparison with feedback worded for one exercise kind
#[derive(Debug, Clone)]
pub struct StructuralRubric {
    /// What the reference entries are called in feedback ("component", "table", ...)
    subject: &'static str,
    /// Shown when the answer matches the reference completely
    praise: &'static str,
}

impl StructuralRubric {
    pub const fn new(subject: &'static str, praise: &'static str) -> Self {
        Self { subject, praise }
    }

    pub const fn system_modeling() -> Self {
        Self::new(
            "model element",
            "The model covers every expected component and relationship.",
        )
    }

    pub const fn microservice_boundary() -> Self {
        Self::new(
            "service boundary element",
            "Service boundaries and their owned data match the reference design.",
        )
    }

    pub const fn requirement_abstraction() -> Self {
        Self::new(
            "requirement",
            "All essential requirements were extracted and separated from implementation detail.",
        )
    }

    pub const fn data_normalization() -> Self {
        Self::new(
            "schema element",
            "The normalized schema matches the reference tables and keys.",
        )
    }

    /// Used for kinds without a dedicated rubric
    pub const fn generic() -> Self {
        Self::new("element", "The answer matches the reference solution.")
    }
}

impl Rubric for StructuralRubric {
    fn grade(&self, exercise: &Exercise, expected: &Value, answer: &Value) -> Evaluation {
        let comparison = compare(expected, answer);
        // Epsilon absorbs float error on exact fractions like 2/3 of 30
        let score = (comparison.ratio * f64::from(exercise.points) + 1e-9).floor() as u32;

        let mut feedback = Vec::new();
        if comparison.missing.is_empty() && comparison.ratio >= 1.0 {
            feedback.push(self.praise.to_string());
            return Evaluation { score, feedback };
        }

        feedback.push(format!(
            "Matched {:.0}% of the reference {}s.",
            comparison.ratio * 100.0,
            self.subject
        ));
        for path in comparison.missing.iter().take(MAX_MISSING_LISTED) {
            feedback.push(format!("Missing {}: {}", self.subject, path));
        }
        if comparison.missing.len() > MAX_MISSING_LISTED {
            feedback.push(format!(
                "...and {} more missing.",
                comparison.missing.len() - MAX_MISSING_LISTED
            ));
        }
        if comparison.ratio < 0.5 {
            if let Some(hint) = exercise.content.hints.first() {
                feedback.push(format!("Hint: {hint}"));
            }
        }

        Evaluation { score, feedback }
    }
}

/// Credit for exercises that have no reference answer
pub fn completion_credit(exercise: &Exercise) -> Evaluation {
    Evaluation {
        score: exercise.points,
        feedback: vec![
            "Submission received. This exercise has no reference answer, so it is credited on completion."
                .to_string(),
        ],
    }
}
