//! Progress recorder - find-or-create-then-update per (user, exercise)

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{ResubmissionPolicy, ScoringSettings};
use crate::domain::{ExerciseId, Progress, UserId};
use crate::error::{LearnError, Result};
use crate::store::{Completion, Store};

/// Outcome of recording one graded submission
#[derive(Debug, Clone)]
pub struct Recorded {
    pub progress: Progress,
    /// This write moved the record into `completed`
    pub first_completion: bool,
}

#[derive(Clone)]
pub struct ProgressRecorder {
    store: Arc<dyn Store>,
    policy: ResubmissionPolicy,
    max_retries: u32,
}

impl ProgressRecorder {
    pub fn new(store: Arc<dyn Store>, scoring: &ScoringSettings) -> Self {
        Self {
            store,
            policy: scoring.resubmission,
            max_retries: scoring.max_record_retries,
        }
    }

    pub fn policy(&self) -> ResubmissionPolicy {
        self.policy
    }

    /// Mark the exercise completed with `submission` and `score`.
    ///
    /// A uniqueness race with a concurrent writer is retried; the retry lands
    /// on the update path because the competing row now exists.
    pub async fn record(
        &self,
        user: &UserId,
        exercise: &ExerciseId,
        submission: Value,
        score: u32,
    ) -> Result<Recorded> {
        let overwrite_score = self.policy == ResubmissionPolicy::AwardEverySubmission;
        let mut attempt = 0;

        let outcome = loop {
            let completion = Completion {
                user_id: user.clone(),
                exercise_id: exercise.clone(),
                submission: submission.clone(),
                score,
                overwrite_score,
                at: Utc::now(),
            };
            match self.store.upsert_completion(completion).await {
                Ok(outcome) => break outcome,
                Err(LearnError::Constraint(msg)) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        "[learnpath:progress] Constraint race on {}/{} (retry {}/{}): {}",
                        user, exercise, attempt, self.max_retries, msg
                    );
                }
                Err(e) => return Err(e),
            }
        };

        let first_completion = outcome.first_completion();
        debug!(
            "[learnpath:progress] {}/{} attempt #{} score {} (first: {})",
            user, exercise, outcome.progress.attempts, outcome.progress.score, first_completion
        );

        Ok(Recorded {
            progress: outcome.progress,
            first_completion,
        })
    }

    /// Find-or-create a `not_started` record, e.g. when the exercise is viewed
    pub async fn open(&self, user: &UserId, exercise: &ExerciseId) -> Result<Progress> {
        self.store.open_progress(user, exercise).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::{tempdir, TempDir};

    use super::*;
    use crate::achievements::AchievementState;
    use crate::config::StoreSettings;
    use crate::domain::{
        Badge, BadgeId, Exercise, ExerciseContent, ExerciseKind, Module, ModuleId, NewUser,
        ProgressId, User,
    };
    use crate::store::{Credit, CreditMode, SqliteStore, UpsertOutcome};

    /// Fails the first `failures` upserts with a constraint violation
    struct RacingStore {
        inner: SqliteStore,
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Store for RacingStore {
        async fn create_user(&self, user: NewUser) -> Result<User> {
            self.inner.create_user(user).await
        }
        async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
            self.inner.get_user(id).await
        }
        async fn upsert_module(&self, module: &Module) -> Result<()> {
            self.inner.upsert_module(module).await
        }
        async fn get_module(&self, id: &ModuleId) -> Result<Option<Module>> {
            self.inner.get_module(id).await
        }
        async fn list_modules(&self) -> Result<Vec<Module>> {
            self.inner.list_modules().await
        }
        async fn upsert_exercise(&self, exercise: &Exercise) -> Result<()> {
            self.inner.upsert_exercise(exercise).await
        }
        async fn get_exercise(&self, id: &ExerciseId) -> Result<Option<Exercise>> {
            self.inner.get_exercise(id).await
        }
        async fn list_exercises(&self, module: &ModuleId) -> Result<Vec<Exercise>> {
            self.inner.list_exercises(module).await
        }
        async fn upsert_badge(&self, badge: &Badge) -> Result<()> {
            self.inner.upsert_badge(badge).await
        }
        async fn list_badges(&self) -> Result<Vec<Badge>> {
            self.inner.list_badges().await
        }
        async fn get_progress(
            &self,
            user: &UserId,
            exercise: &ExerciseId,
        ) -> Result<Option<Progress>> {
            self.inner.get_progress(user, exercise).await
        }
        async fn list_progress(&self, user: &UserId) -> Result<Vec<Progress>> {
            self.inner.list_progress(user).await
        }
        async fn open_progress(&self, user: &UserId, exercise: &ExerciseId) -> Result<Progress> {
            self.inner.open_progress(user, exercise).await
        }
        async fn upsert_completion(&self, completion: Completion) -> Result<UpsertOutcome> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(LearnError::Constraint(
                    "UNIQUE constraint failed: progress.user_id, progress.exercise_id".to_string(),
                ));
            }
            self.inner.upsert_completion(completion).await
        }
        async fn increment_points(&self, user: &UserId, amount: u64) -> Result<u64> {
            self.inner.increment_points(user, amount).await
        }
        async fn credit_progress(&self, progress: &ProgressId, mode: CreditMode) -> Result<Credit> {
            self.inner.credit_progress(progress, mode).await
        }
        async fn achievement_state(&self, user: &UserId) -> Result<AchievementState> {
            self.inner.achievement_state(user).await
        }
        async fn held_badges(&self, user: &UserId) -> Result<HashSet<BadgeId>> {
            self.inner.held_badges(user).await
        }
        async fn add_badge(&self, user: &UserId, badge: &BadgeId) -> Result<bool> {
            self.inner.add_badge(user, badge).await
        }
    }

    async fn racing_store(failures: u32) -> (TempDir, Arc<RacingStore>, User, ExerciseId) {
        let dir = tempdir().unwrap();
        let inner = SqliteStore::open(&dir.path().join("test.db"), &StoreSettings::default()).unwrap();
        let module = Module {
            id: ModuleId::new("m1"),
            name: "Modeling".to_string(),
            description: String::new(),
            order: 1,
            difficulty: 1,
        };
        inner.upsert_module(&module).await.unwrap();
        let exercise = Exercise {
            id: ExerciseId::new("e1"),
            module_id: module.id.clone(),
            title: "Model a shop".to_string(),
            description: String::new(),
            content: ExerciseContent::new(ExerciseKind::SystemModeling),
            points: 10,
            difficulty: 1,
            order: 1,
        };
        inner.upsert_exercise(&exercise).await.unwrap();
        let user = inner
            .create_user(NewUser::new("Ada", "ada@example.com"))
            .await
            .unwrap();
        let store = Arc::new(RacingStore {
            inner,
            failures,
            calls: AtomicU32::new(0),
        });
        (dir, store, user, exercise.id)
    }

    fn settings(max_record_retries: u32) -> ScoringSettings {
        ScoringSettings {
            max_record_retries,
            ..ScoringSettings::default()
        }
    }

    #[tokio::test]
    async fn test_constraint_race_is_retried() {
        let (_dir, store, user, exercise) = racing_store(2).await;
        let recorder = ProgressRecorder::new(store.clone(), &settings(3));

        let recorded = recorder
            .record(&user.id, &exercise, json!({ "content": "x" }), 7)
            .await
            .unwrap();
        assert!(recorded.first_completion);
        assert_eq!(recorded.progress.score, 7);
        assert_eq!(recorded.progress.attempts, 1);
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
        assert_eq!(store.list_progress(&user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_constraint_surfaces_after_retries() {
        let (_dir, store, user, exercise) = racing_store(10).await;
        let recorder = ProgressRecorder::new(store.clone(), &settings(2));

        let err = recorder
            .record(&user.id, &exercise, json!({ "content": "x" }), 7)
            .await
            .unwrap_err();
        assert!(matches!(err, LearnError::Constraint(_)));
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
        assert!(store.list_progress(&user.id).await.unwrap().is_empty());
    }
}
