//! Read-side summaries of a user's progress

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::Serialize;

use crate::domain::{ExerciseId, Module, ModuleId, Progress, ProgressStatus, User, UserId};
use crate::error::{LearnError, Result};
use crate::store::Store;

/// Completion summary for one module
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModuleProgress {
    pub module: Module,
    pub total_exercises: usize,
    pub completed_exercises: usize,
    /// 0-100, rounded down
    pub percentage: u8,
    pub points_earned: u64,
}

/// One exercise row in a module detail view
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExerciseProgressView {
    pub exercise_id: ExerciseId,
    pub title: String,
    pub points: u32,
    pub difficulty: u8,
    pub status: ProgressStatus,
    pub score: u32,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModuleDetail {
    pub module: Module,
    pub exercises: Vec<ExerciseProgressView>,
}

#[derive(Clone)]
pub struct ProgressViews {
    store: Arc<dyn Store>,
}

impl ProgressViews {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Every module in order with the user's completion counts
    pub async fn module_overview(&self, user: &UserId) -> Result<Vec<ModuleProgress>> {
        self.require_user(user).await?;
        let modules = self.store.list_modules().await?;
        let progress = self.progress_by_exercise(user).await?;
        let progress = &progress;

        try_join_all(modules.into_iter().map(|module| async move {
            let exercises = self.store.list_exercises(&module.id).await?;
            let completed: Vec<&Progress> = exercises
                .iter()
                .filter_map(|e| progress.get(&e.id))
                .filter(|p| p.status.is_completed())
                .collect();

            let total = exercises.len();
            let done = completed.len();
            Ok::<_, LearnError>(ModuleProgress {
                module,
                total_exercises: total,
                completed_exercises: done,
                percentage: percentage(done, total),
                points_earned: completed.iter().map(|p| u64::from(p.score)).sum(),
            })
        }))
        .await
    }

    pub async fn module_detail(&self, user: &UserId, module_id: &ModuleId) -> Result<ModuleDetail> {
        self.require_user(user).await?;
        let module = self
            .store
            .get_module(module_id)
            .await?
            .ok_or_else(|| LearnError::not_found("module", module_id))?;
        let exercises = self.store.list_exercises(&module.id).await?;
        let progress = self.progress_by_exercise(user).await?;

        let exercises = exercises
            .into_iter()
            .map(|exercise| {
                let record = progress.get(&exercise.id);
                ExerciseProgressView {
                    status: record.map_or(ProgressStatus::NotStarted, |p| p.status),
                    score: record.map_or(0, |p| p.score),
                    completed_at: record.and_then(|p| p.completed_at),
                    exercise_id: exercise.id,
                    title: exercise.title,
                    points: exercise.points,
                    difficulty: exercise.difficulty,
                }
            })
            .collect();

        Ok(ModuleDetail { module, exercises })
    }

    /// The user with current points and held badges
    pub async fn profile(&self, user: &UserId) -> Result<User> {
        self.require_user(user).await
    }

    async fn require_user(&self, user: &UserId) -> Result<User> {
        self.store
            .get_user(user)
            .await?
            .ok_or_else(|| LearnError::not_found("user", user))
    }

    async fn progress_by_exercise(&self, user: &UserId) -> Result<HashMap<ExerciseId, Progress>> {
        Ok(self
            .store
            .list_progress(user)
            .await?
            .into_iter()
            .map(|p| (p.exercise_id.clone(), p))
            .collect())
    }
}

fn percentage(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((done * 100) / total).min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 66);
        assert_eq!(percentage(4, 4), 100);
    }
}
