use std::sync::Arc;

use tracing::debug;

use crate::config::ResubmissionPolicy;
use crate::domain::{Progress, UserId};
use crate::error::Result;
use crate::store::{Credit, CreditMode, Store};

/// Credits points with a single atomic increment
#[derive(Clone)]
pub struct PointsAccumulator {
    store: Arc<dyn Store>,
}

impl PointsAccumulator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Returns the user's new total. Fails with `NotFound` for an unknown user.
    pub async fn add_points(&self, user: &UserId, amount: u32) -> Result<u64> {
        let total = self.store.increment_points(user, u64::from(amount)).await?;
        debug!("[learnpath:points] +{} for {} (total {})", amount, user, total);
        Ok(total)
    }

    /// Credit the owner of a recorded submission.
    ///
    /// Under `award_once` only the part of the record's score not yet credited
    /// moves, so replaying a submission whose credit was lost picks it up and
    /// a replay of a credited one adds nothing. The credit marker and the
    /// user's total change in the same store transaction.
    pub async fn credit_submission(
        &self,
        progress: &Progress,
        score: u32,
        policy: ResubmissionPolicy,
    ) -> Result<Credit> {
        let mode = match policy {
            ResubmissionPolicy::AwardOnce => CreditMode::Outstanding,
            ResubmissionPolicy::AwardEverySubmission => CreditMode::Amount(score),
        };
        let credit = self.store.credit_progress(&progress.id, mode).await?;
        debug!(
            "[learnpath:points] +{} for {} on {} (total {})",
            credit.awarded, progress.user_id, progress.exercise_id, credit.total
        );
        Ok(credit)
    }
}
