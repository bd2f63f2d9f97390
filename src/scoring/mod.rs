//! Exercise evaluation: rubric dispatch and structural grading

mod evaluator;
mod rubric;
mod structural;

pub use evaluator::Evaluator;
pub use rubric::{completion_credit, Rubric, StructuralRubric};
pub use structural::{compare, Comparison};

use serde::{Deserialize, Serialize};

/// Score and ordered feedback for one submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: u32,
    pub feedback: Vec<String>,
}

impl Evaluation {
    pub fn zero(reason: impl Into<String>) -> Self {
        Self {
            score: 0,
            feedback: vec![reason.into()],
        }
    }
}
