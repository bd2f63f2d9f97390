//! Derived achievement state
//!
//! A bounded summary of a user's cumulative progress, computed once per
//! badge evaluation from aggregate queries instead of replaying every
//! progress record.

use std::collections::HashMap;

use crate::domain::ModuleId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AchievementState {
    pub points: u64,
    /// Completed exercises across all modules
    pub completed: u64,
    pub completed_by_module: HashMap<ModuleId, u64>,
    /// Number of exercises each module currently contains
    pub module_sizes: HashMap<ModuleId, u64>,
}

impl AchievementState {
    pub fn completed_in(&self, module: &ModuleId) -> u64 {
        self.completed_by_module.get(module).copied().unwrap_or(0)
    }

    pub fn module_size(&self, module: &ModuleId) -> u64 {
        self.module_sizes.get(module).copied().unwrap_or(0)
    }
}
