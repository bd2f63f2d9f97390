//! Core domain types for learnpath

mod badge;
mod catalog;
mod ids;
mod progress;
mod user;

pub use badge::{Badge, BadgeCriteria};
pub use catalog::{valid_difficulty, Exercise, ExerciseContent, ExerciseKind, Module};
pub use ids::{BadgeId, ExerciseId, ModuleId, ProgressId, UserId};
pub use progress::{Progress, ProgressStatus};
pub use user::{NewUser, User};
