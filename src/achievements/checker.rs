//! Badge criteria checking
//!
//! Pure functions over [`AchievementState`]; nothing here touches the store.

use std::collections::HashSet;

use tracing::debug;

use super::state::AchievementState;
use crate::domain::{Badge, BadgeCriteria, BadgeId};

/// Whether a single criterion holds for the given state
pub fn criteria_met(criteria: &BadgeCriteria, state: &AchievementState) -> bool {
    match criteria {
        BadgeCriteria::PointsThreshold { points } => state.points >= *points,
        BadgeCriteria::ExercisesCompleted { count } => state.completed >= *count,
        BadgeCriteria::ModuleCompleted {
            module_id,
            exercise_count,
        } => {
            let required = match exercise_count {
                Some(count) => *count,
                // Whole module; an empty module can never be completed
                None => match state.module_size(module_id) {
                    0 => return false,
                    size => size,
                },
            };
            state.completed_in(module_id) >= required
        }
        BadgeCriteria::ConsecutiveLogins { days } => {
            debug!(
                "[learnpath:badges] Login streak of {} days not evaluated: no login history",
                days
            );
            false
        }
    }
}

/// Catalog badges not yet held whose criteria hold now
pub fn newly_satisfied<'a>(
    catalog: &'a [Badge],
    held: &HashSet<BadgeId>,
    state: &AchievementState,
) -> Vec<&'a Badge> {
    catalog
        .iter()
        .filter(|badge| !held.contains(&badge.id))
        .filter(|badge| criteria_met(&badge.criteria, state))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ModuleId;

    fn badge(id: &str, criteria: BadgeCriteria) -> Badge {
        Badge {
            id: BadgeId::new(id),
            name: id.to_string(),
            description: String::new(),
            image_url: String::new(),
            criteria,
        }
    }

    fn state_with_module(completed_in_module: u64, module_size: u64) -> AchievementState {
        let mut state = AchievementState {
            points: 40,
            completed: completed_in_module,
            ..Default::default()
        };
        state
            .completed_by_module
            .insert(ModuleId::new("m1"), completed_in_module);
        state.module_sizes.insert(ModuleId::new("m1"), module_size);
        state
    }

    #[test]
    fn test_points_threshold_is_inclusive() {
        let state = state_with_module(0, 2);
        assert!(criteria_met(&BadgeCriteria::PointsThreshold { points: 40 }, &state));
        assert!(!criteria_met(&BadgeCriteria::PointsThreshold { points: 41 }, &state));
    }

    #[test]
    fn test_exercises_completed_count() {
        let state = state_with_module(3, 5);
        assert!(criteria_met(&BadgeCriteria::ExercisesCompleted { count: 3 }, &state));
        assert!(!criteria_met(&BadgeCriteria::ExercisesCompleted { count: 4 }, &state));
    }

    #[test]
    fn test_module_completed_explicit_count() {
        let criteria = BadgeCriteria::ModuleCompleted {
            module_id: ModuleId::new("m1"),
            exercise_count: Some(2),
        };
        assert!(!criteria_met(&criteria, &state_with_module(1, 2)));
        assert!(criteria_met(&criteria, &state_with_module(2, 2)));
    }

    #[test]
    fn test_module_completed_defaults_to_whole_module() {
        let criteria = BadgeCriteria::ModuleCompleted {
            module_id: ModuleId::new("m1"),
            exercise_count: None,
        };
        assert!(!criteria_met(&criteria, &state_with_module(2, 3)));
        assert!(criteria_met(&criteria, &state_with_module(3, 3)));
        assert!(!criteria_met(&criteria, &state_with_module(0, 0)));

        let other = BadgeCriteria::ModuleCompleted {
            module_id: ModuleId::new("unknown"),
            exercise_count: None,
        };
        assert!(!criteria_met(&other, &state_with_module(3, 3)));
    }

    #[test]
    fn test_consecutive_logins_never_met() {
        let state = AchievementState {
            points: u64::MAX,
            completed: u64::MAX,
            ..Default::default()
        };
        assert!(!criteria_met(&BadgeCriteria::ConsecutiveLogins { days: 1 }, &state));
    }

    #[test]
    fn test_newly_satisfied_skips_held() {
        let catalog = vec![
            badge("b_points", BadgeCriteria::PointsThreshold { points: 10 }),
            badge("b_count", BadgeCriteria::ExercisesCompleted { count: 1 }),
            badge("b_far", BadgeCriteria::PointsThreshold { points: 1000 }),
        ];
        let held: HashSet<BadgeId> = [BadgeId::new("b_points")].into_iter().collect();
        let found = newly_satisfied(&catalog, &held, &state_with_module(1, 2));
        let ids: Vec<&str> = found.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["b_count"]);
    }
}
