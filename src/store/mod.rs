//! Persistence for users, catalog, progress and badges
//!
//! The rest of the crate talks to the [`Store`] trait. Every write the
//! pipeline depends on for correctness is a single atomic operation at the
//! store level:
//!
//! - progress upsert keyed on `(user_id, exercise_id)` (unique index)
//! - points credit: the record's `credited` marker and the user's
//!   `points = points + ?` move together in one transaction
//! - badge grant as a set-add (primary key on `(user_id, badge_id)`)
//!
//! # Usage
//!
//! ```ignore
//! let store = SqliteStore::open(&path, &settings)?;
//! let user = store.create_user(NewUser::new("Ada", "ada@example.com")).await?;
//! ```

mod db;
mod sqlite;

pub use db::SqliteStore;

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::achievements::AchievementState;
use crate::domain::{
    Badge, BadgeId, Exercise, ExerciseId, Module, ModuleId, NewUser, Progress, ProgressId,
    ProgressStatus, User, UserId,
};
use crate::error::Result;

/// A graded submission to persist
#[derive(Debug, Clone)]
pub struct Completion {
    pub user_id: UserId,
    pub exercise_id: ExerciseId,
    pub submission: serde_json::Value,
    pub score: u32,
    /// Replace the credited score even if the record is already completed
    pub overwrite_score: bool,
    pub at: DateTime<Utc>,
}

/// Result of a progress upsert
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub progress: Progress,
    /// Status before this write; `None` when the record was created
    pub previous_status: Option<ProgressStatus>,
}

impl UpsertOutcome {
    /// True when this write moved the record into `completed`
    pub fn first_completion(&self) -> bool {
        !matches!(self.previous_status, Some(ProgressStatus::Completed))
    }
}

/// How many points a credit should move onto the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditMode {
    /// Whatever part of the record's score is not credited yet
    Outstanding,
    /// A fixed amount, credited every time
    Amount(u32),
}

/// Result of crediting a progress record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credit {
    pub awarded: u32,
    /// The user's total after this credit
    pub total: u64,
}

/// Document-style persistence collaborator
#[async_trait]
pub trait Store: Send + Sync {
    // Users
    async fn create_user(&self, user: NewUser) -> Result<User>;
    async fn get_user(&self, id: &UserId) -> Result<Option<User>>;

    // Catalog
    async fn upsert_module(&self, module: &Module) -> Result<()>;
    async fn get_module(&self, id: &ModuleId) -> Result<Option<Module>>;
    /// All modules by ascending `order`
    async fn list_modules(&self) -> Result<Vec<Module>>;
    async fn upsert_exercise(&self, exercise: &Exercise) -> Result<()>;
    async fn get_exercise(&self, id: &ExerciseId) -> Result<Option<Exercise>>;
    /// Exercises of one module by ascending `order`
    async fn list_exercises(&self, module: &ModuleId) -> Result<Vec<Exercise>>;
    async fn upsert_badge(&self, badge: &Badge) -> Result<()>;
    async fn list_badges(&self) -> Result<Vec<Badge>>;

    // Progress
    async fn get_progress(&self, user: &UserId, exercise: &ExerciseId)
        -> Result<Option<Progress>>;
    async fn list_progress(&self, user: &UserId) -> Result<Vec<Progress>>;
    /// Find-or-create a `not_started` record
    async fn open_progress(&self, user: &UserId, exercise: &ExerciseId) -> Result<Progress>;
    /// Atomic find-or-create-then-update into `completed`
    async fn upsert_completion(&self, completion: Completion) -> Result<UpsertOutcome>;

    // Points and badges
    /// Atomic increment; returns the new total
    async fn increment_points(&self, user: &UserId, amount: u64) -> Result<u64>;
    /// Credit a progress record's owner and mark the record credited, atomically.
    /// A record that is not completed credits nothing.
    async fn credit_progress(&self, progress: &ProgressId, mode: CreditMode) -> Result<Credit>;
    /// Bounded summary used for badge criteria
    async fn achievement_state(&self, user: &UserId) -> Result<AchievementState>;
    async fn held_badges(&self, user: &UserId) -> Result<HashSet<BadgeId>>;
    /// Set-add; returns false if the user already held the badge
    async fn add_badge(&self, user: &UserId, badge: &BadgeId) -> Result<bool>;
}
