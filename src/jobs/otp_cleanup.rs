use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobSchedulerError};

use crate::models::email_verification::EmailVerification;

/// Top of every hour (sec min hour day month weekday)
pub const PURGE_SCHEDULE: &str = "0 0 * * * *";

/// Deletes verification codes that were used or expired more than a day ago
pub async fn purge_stale_codes(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let removed = EmailVerification::purge_stale(pool).await?;

    tracing::info!(removed, "OTP cleanup job completed");

    Ok(removed)
}

pub fn job(pool: PgPool) -> Result<Job, JobSchedulerError> {
    Job::new_async(PURGE_SCHEDULE, move |_id, _scheduler| {
        let pool = pool.clone();
        Box::pin(async move {
            if let Err(e) = purge_stale_codes(&pool).await {
                tracing::error!(error = %e, "OTP cleanup job failed");
            }
        })
    })
}
