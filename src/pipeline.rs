//! Submission pipeline: evaluate, record, credit, award
//!
//! Steps run sequentially for one submission. There is no multi-step
//! rollback. Re-submitting after a failure is safe: recording is an upsert,
//! and under `award_once` crediting moves only the part of the recorded score
//! that is not credited yet. A submission that failed (or timed out) after
//! recording is completed by its replay.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::achievements::BadgeEvaluator;
use crate::config::ScoringSettings;
use crate::domain::{Badge, Exercise, ExerciseId, NewUser, Progress, User, UserId};
use crate::error::{LearnError, Result};
use crate::progress::{PointsAccumulator, ProgressRecorder, ProgressViews};
use crate::scoring::Evaluator;
use crate::store::Store;

/// Response to a submission
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionResult {
    pub progress: Progress,
    /// Score the evaluator gave this submission
    pub score: u32,
    pub feedback: Vec<String>,
    /// Points credited by this submission (0 for an already credited resubmission under `award_once`)
    pub awarded: u32,
    pub total_points: u64,
    pub new_badges: Vec<Badge>,
}

/// Wires the evaluator, recorder, accumulator and badge evaluator together
#[derive(Clone)]
pub struct SubmissionPipeline {
    store: Arc<dyn Store>,
    evaluator: Arc<Evaluator>,
    recorder: ProgressRecorder,
    points: PointsAccumulator,
    badges: BadgeEvaluator,
}

impl SubmissionPipeline {
    pub fn new(store: Arc<dyn Store>, scoring: &ScoringSettings) -> Self {
        Self::with_evaluator(store, scoring, Evaluator::default())
    }

    pub fn with_evaluator(
        store: Arc<dyn Store>,
        scoring: &ScoringSettings,
        evaluator: Evaluator,
    ) -> Self {
        Self {
            evaluator: Arc::new(evaluator),
            recorder: ProgressRecorder::new(store.clone(), scoring),
            points: PointsAccumulator::new(store.clone()),
            badges: BadgeEvaluator::new(store.clone()),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn views(&self) -> ProgressViews {
        ProgressViews::new(self.store.clone())
    }

    /// Register a learner with zero points
    pub async fn register(&self, name: &str, email: &str) -> Result<User> {
        let new_user = NewUser::new(name, email)
            .normalized()
            .map_err(LearnError::Invalid)?;
        let user = self.store.create_user(new_user).await?;
        info!("[learnpath:users] Registered {} <{}>", user.id, user.email);
        Ok(user)
    }

    /// Look up an exercise and make sure the user has a progress record for it
    pub async fn open_exercise(
        &self,
        user_id: &UserId,
        exercise_id: &ExerciseId,
    ) -> Result<(Exercise, Progress)> {
        self.require_user(user_id).await?;
        let exercise = self.require_exercise(exercise_id).await?;
        let progress = self.recorder.open(user_id, exercise_id).await?;
        Ok((exercise, progress))
    }

    pub async fn submit(
        &self,
        user_id: &UserId,
        exercise_id: &ExerciseId,
        submission: Value,
    ) -> Result<SubmissionResult> {
        let user = self.require_user(user_id).await?;
        let exercise = self.require_exercise(exercise_id).await?;

        let evaluation = self.evaluator.evaluate(&exercise, &submission);
        debug!(
            "[learnpath:submit] Evaluated {} for {}: {}/{}",
            exercise.id, user.id, evaluation.score, exercise.points
        );

        let recorded = self
            .recorder
            .record(&user.id, &exercise.id, submission, evaluation.score)
            .await?;

        let policy = self.recorder.policy();
        let credit = self
            .points
            .credit_submission(&recorded.progress, evaluation.score, policy)
            .await?;
        if credit.awarded == 0 {
            debug!(
                "[learnpath:submit] No points credited for {} on {} ({})",
                user.id,
                exercise.id,
                policy.as_str()
            );
        }

        let new_badges = self.badges.check_achievements(&user.id).await?;

        info!(
            "[learnpath:submit] {} completed {} with {}/{} (+{} points, {} new badges)",
            user.id,
            exercise.id,
            evaluation.score,
            exercise.points,
            credit.awarded,
            new_badges.len()
        );

        Ok(SubmissionResult {
            progress: recorded.progress,
            score: evaluation.score,
            feedback: evaluation.feedback,
            awarded: credit.awarded,
            total_points: credit.total,
            new_badges,
        })
    }

    async fn require_user(&self, id: &UserId) -> Result<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| LearnError::not_found("user", id))
    }

    async fn require_exercise(&self, id: &ExerciseId) -> Result<Exercise> {
        self.store
            .get_exercise(id)
            .await?
            .ok_or_else(|| LearnError::not_found("exercise", id))
    }
}
