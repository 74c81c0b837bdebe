use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobSchedulerError};

use crate::api::middleware::rate_limit::IpRateLimiter;

/// Every five minutes
pub const PRUNE_SCHEDULE: &str = "0 */5 * * * *";

/// Forgets client addresses whose quota has refilled. Returns the remaining key count.
pub fn prune(limiter: &IpRateLimiter) -> usize {
    let before = limiter.len();
    limiter.retain_recent();
    let remaining = limiter.len();

    tracing::debug!(
        removed = before.saturating_sub(remaining),
        remaining,
        "Rate limiter pruned"
    );

    remaining
}

pub fn job(limiter: Arc<IpRateLimiter>) -> Result<Job, JobSchedulerError> {
    Job::new_async(PRUNE_SCHEDULE, move |_id, _scheduler| {
        let limiter = limiter.clone();
        Box::pin(async move {
            prune(&limiter);
        })
    })
}
