use serde::{Deserialize, Serialize};

use super::{BadgeId, ModuleId};

/// Immutable catalog entry describing an unlockable achievement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub id: BadgeId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    pub criteria: BadgeCriteria,
}

/// Condition over a user's cumulative state that unlocks a badge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BadgeCriteria {
    /// Cumulative points reach a threshold
    #[serde(rename = "points")]
    PointsThreshold { points: u64 },
    /// Number of completed exercises reaches a count
    ExercisesCompleted { count: u64 },
    /// Completed exercises inside one module reach a count.
    /// Without `exercise_count` every exercise of the module is required.
    ModuleCompleted {
        module_id: ModuleId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exercise_count: Option<u64>,
    },
    /// Login streak; there is no login history to evaluate against
    ConsecutiveLogins { days: u32 },
}

impl BadgeCriteria {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PointsThreshold { .. } => "points",
            Self::ExercisesCompleted { .. } => "exercises_completed",
            Self::ModuleCompleted { .. } => "module_completed",
            Self::ConsecutiveLogins { .. } => "consecutive_logins",
        }
    }
}
