use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ExerciseId, ProgressId, UserId};

/// Where a user stands on one exercise
///
/// Transitions only move forward: `not_started` -> `in_progress` -> `completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl ProgressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    pub fn is_completed(&self) -> bool {
        *self == Self::Completed
    }
}

impl FromStr for ProgressStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown progress status '{other}'")),
        }
    }
}

impl std::fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unique record of one user's interaction with one exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub id: ProgressId,
    pub user_id: UserId,
    pub exercise_id: ExerciseId,
    pub status: ProgressStatus,
    /// Last submitted payload
    pub submission: Option<serde_json::Value>,
    /// Credited score
    pub score: u32,
    pub attempts: u32,
    /// Set once, on the first transition into `completed`
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ordering_is_forward() {
        assert!(ProgressStatus::NotStarted < ProgressStatus::InProgress);
        assert!(ProgressStatus::InProgress < ProgressStatus::Completed);
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in [
            ProgressStatus::NotStarted,
            ProgressStatus::InProgress,
            ProgressStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<ProgressStatus>(), Ok(status));
        }
        assert!("done".parse::<ProgressStatus>().is_err());
    }
}
