//! Training modules and exercises
//!
//! Both are read-only catalog data from the point of view of the
//! submission pipeline; they are written only by catalog seeding.

use serde::{Deserialize, Serialize};

use super::{ExerciseId, ModuleId};

/// Ordered grouping of exercises sharing a theme
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Display and iteration sequence (ascending)
    pub order: i64,
    /// 1 (easiest) to 5
    pub difficulty: u8,
}

/// A single gradeable unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: ExerciseId,
    pub module_id: ModuleId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub content: ExerciseContent,
    /// Scoring ceiling
    pub points: u32,
    pub difficulty: u8,
    pub order: i64,
}

/// Kind of exercise, used to pick a rubric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    SystemModeling,
    MicroserviceBoundary,
    RequirementAbstraction,
    DataNormalization,
    /// Any kind this build does not know about
    #[serde(other)]
    Unknown,
}

impl ExerciseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SystemModeling => "system_modeling",
            Self::MicroserviceBoundary => "microservice_boundary",
            Self::RequirementAbstraction => "requirement_abstraction",
            Self::DataNormalization => "data_normalization",
            Self::Unknown => "unknown",
        }
    }
}

/// Typed exercise payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseContent {
    #[serde(rename = "type")]
    pub kind: ExerciseKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_data: Option<serde_json::Value>,
    /// Reference answer the rubric compares submissions against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<serde_json::Value>,
    #[serde(default)]
    pub hints: Vec<String>,
}

impl ExerciseContent {
    pub fn new(kind: ExerciseKind) -> Self {
        Self {
            kind,
            description: String::new(),
            instructions: String::new(),
            initial_data: None,
            expected_output: None,
            hints: Vec::new(),
        }
    }

    pub fn with_expected_output(mut self, expected: serde_json::Value) -> Self {
        self.expected_output = Some(expected);
        self
    }
}

/// Difficulty must be within 1..=5
pub fn valid_difficulty(difficulty: u8) -> bool {
    (1..=5).contains(&difficulty)
}
