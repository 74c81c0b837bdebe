// Background jobs

pub mod limiter_prune;
pub mod otp_cleanup;

use sqlx::PgPool;
use std::sync::Arc;
use tokio_cron_scheduler::{JobScheduler, JobSchedulerError};

use crate::api::middleware::rate_limit::IpRateLimiter;

#[derive(thiserror::Error, Debug)]
pub enum JobError {
    #[error("Scheduler error: {0:?}")]
    Scheduler(JobSchedulerError),
}

impl From<JobSchedulerError> for JobError {
    fn from(e: JobSchedulerError) -> Self {
        JobError::Scheduler(e)
    }
}

/// Starts the background scheduler. The returned handle must be kept alive.
pub async fn start(pool: PgPool, auth_limiter: Arc<IpRateLimiter>) -> Result<JobScheduler, JobError> {
    let scheduler = JobScheduler::new().await?;

    scheduler.add(otp_cleanup::job(pool)?).await?;
    scheduler.add(limiter_prune::job(auth_limiter)?).await?;
    scheduler.start().await?;

    tracing::info!(
        otp_cleanup = otp_cleanup::PURGE_SCHEDULE,
        limiter_prune = limiter_prune::PRUNE_SCHEDULE,
        "Background jobs scheduled"
    );

    Ok(scheduler)
}
