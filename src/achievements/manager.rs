//! Badge evaluator - grants newly satisfied badges exactly once

use std::sync::Arc;

use tracing::{debug, info};

use super::checker::newly_satisfied;
use crate::domain::{Badge, UserId};
use crate::error::Result;
use crate::store::Store;

/// Re-derives a user's achievement state and grants badges
#[derive(Clone)]
pub struct BadgeEvaluator {
    store: Arc<dyn Store>,
}

impl BadgeEvaluator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Grant every catalog badge whose criterion now holds and that the user
    /// does not hold yet. Returns only the badges granted by this call.
    ///
    /// Safe to run concurrently for the same user: each grant is a set-add,
    /// and a badge is reported only by the caller whose add inserted it.
    pub async fn check_achievements(&self, user: &UserId) -> Result<Vec<Badge>> {
        let state = self.store.achievement_state(user).await?;
        let held = self.store.held_badges(user).await?;
        let catalog = self.store.list_badges().await?;

        let mut granted = Vec::new();
        for badge in newly_satisfied(&catalog, &held, &state) {
            if self.store.add_badge(user, &badge.id).await? {
                info!(
                    "[learnpath:badges] Granted '{}' ({}) to user {}",
                    badge.name,
                    badge.criteria.kind(),
                    user
                );
                granted.push(badge.clone());
            } else {
                debug!(
                    "[learnpath:badges] '{}' already granted to {} by a concurrent check",
                    badge.id, user
                );
            }
        }

        Ok(granted)
    }
}
