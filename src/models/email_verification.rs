use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    EmailVerification,
    PasswordReset,
}

impl OtpPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::EmailVerification => "email_verification",
            OtpPurpose::PasswordReset => "password_reset",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "email_verification" => Some(OtpPurpose::EmailVerification),
            "password_reset" => Some(OtpPurpose::PasswordReset),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmailVerification {
    pub id: Uuid,
    pub email: String,
    pub purpose: String, // 'email_verification', 'password_reset'
    #[serde(skip_serializing)]
    pub otp_hash: String,
    pub attempts: i32,
    pub used: bool,
    pub verified: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

impl EmailVerification {
    pub fn purpose(&self) -> Option<OtpPurpose> {
        OtpPurpose::parse(&self.purpose)
    }

    /// Stores a new code and invalidates earlier unused codes for the same email and purpose.
    pub async fn issue(
        pool: &PgPool,
        email: &str,
        purpose: OtpPurpose,
        otp_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE email_verifications
            SET used = TRUE, used_at = NOW()
            WHERE email = $1 AND purpose = $2 AND used = FALSE
            "#,
        )
        .bind(email)
        .bind(purpose.as_str())
        .execute(&mut *tx)
        .await?;

        let record = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO email_verifications (email, purpose, otp_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(purpose.as_str())
        .bind(otp_hash)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(record)
    }

    /// Latest code for an email and purpose, locked for the rest of the transaction.
    pub async fn find_latest_for_update<'e, E: PgExecutor<'e>>(
        executor: E,
        email: &str,
        purpose: OtpPurpose,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM email_verifications
            WHERE email = $1 AND purpose = $2
            ORDER BY created_at DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(email)
        .bind(purpose.as_str())
        .fetch_optional(executor)
        .await
    }

    pub async fn increment_attempts<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE email_verifications SET attempts = attempts + 1 WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(())
    }

    /// Whether the email completed verification within `window`.
    pub async fn recently_verified(
        pool: &PgPool,
        email: &str,
        window: Duration,
    ) -> Result<bool, sqlx::Error> {
        let cutoff = Utc::now() - window;

        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM email_verifications
                WHERE email = $1
                  AND purpose = 'email_verification'
                  AND used = TRUE
                  AND used_at IS NOT NULL
                  AND used_at >= $2
                  AND verified = TRUE
            )
            "#,
        )
        .bind(email)
        .bind(cutoff)
        .fetch_one(pool)
        .await
    }

    /// Records that the code was consumed by a successful verification.
    pub async fn consume<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE email_verifications
            SET used = TRUE, used_at = NOW(), verified = TRUE
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Deletes rows that were used or expired more than 24 hours ago.
    pub async fn purge_stale(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let cutoff = Utc::now() - Duration::hours(24);

        let result = sqlx::query(
            r#"
            DELETE FROM email_verifications
            WHERE (used = TRUE AND COALESCE(used_at, created_at) < $1)
               OR expires_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}
