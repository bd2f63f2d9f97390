//! Badge awards: derived achievement state, criteria checks and grants

mod checker;
mod manager;
mod state;

pub use checker::{criteria_met, newly_satisfied};
pub use manager::BadgeEvaluator;
pub use state::AchievementState;
