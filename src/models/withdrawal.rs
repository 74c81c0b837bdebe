use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};
use std::str::FromStr;
use uuid::Uuid;

use crate::services::earnings::Balance;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Completed,
    Rejected,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Approved => "approved",
            WithdrawalStatus::Completed => "completed",
            WithdrawalStatus::Rejected => "rejected",
        }
    }

    /// Allowed moves: pending -> approved -> completed, pending|approved -> rejected
    pub fn can_transition_to(&self, next: WithdrawalStatus) -> bool {
        matches!(
            (self, next),
            (WithdrawalStatus::Pending, WithdrawalStatus::Approved)
                | (WithdrawalStatus::Approved, WithdrawalStatus::Completed)
                | (WithdrawalStatus::Pending, WithdrawalStatus::Rejected)
                | (WithdrawalStatus::Approved, WithdrawalStatus::Rejected)
        )
    }
}

impl FromStr for WithdrawalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WithdrawalStatus::Pending),
            "approved" => Ok(WithdrawalStatus::Approved),
            "completed" => Ok(WithdrawalStatus::Completed),
            "rejected" => Ok(WithdrawalStatus::Rejected),
            other => Err(format!("unknown withdrawal status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Withdrawal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub method: String,
    pub account_details: String,
    pub status: String, // 'pending', 'approved', 'completed', 'rejected'
    pub admin_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CreateWithdrawalData {
    pub user_id: Uuid,
    pub amount: i64,
    pub method: String,
    pub account_details: String,
}

impl Withdrawal {
    pub fn status(&self) -> Option<WithdrawalStatus> {
        self.status.parse().ok()
    }

    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        data: CreateWithdrawalData,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO withdrawals (user_id, amount, method, account_details)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(data.user_id)
        .bind(data.amount)
        .bind(data.method)
        .bind(data.account_details)
        .fetch_one(executor)
        .await
    }

    pub async fn find_for_update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM withdrawals WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM withdrawals WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn list_all(
        pool: &PgPool,
        status: Option<WithdrawalStatus>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM withdrawals
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .fetch_all(pool)
        .await
    }

    pub async fn set_status<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        status: WithdrawalStatus,
        admin_note: Option<String>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE withdrawals
            SET
                status = $2,
                admin_note = COALESCE($3, admin_note),
                processed_at = CASE WHEN $2 = 'pending' THEN NULL ELSE NOW() END
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(admin_note)
        .fetch_one(executor)
        .await
    }

    /// Sums the user's media earnings and withdrawals into a balance.
    ///
    /// Approved and completed withdrawals count as withdrawn; rejected ones never count.
    pub async fn balance_for_user<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Balance, sqlx::Error> {
        let (total_earnings, total_withdrawn, pending): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE((SELECT SUM(total_earnings) FROM media WHERE owner_id = $1), 0)::BIGINT,
                COALESCE((SELECT SUM(amount) FROM withdrawals
                          WHERE user_id = $1 AND status IN ('approved', 'completed')), 0)::BIGINT,
                COALESCE((SELECT SUM(amount) FROM withdrawals
                          WHERE user_id = $1 AND status = 'pending'), 0)::BIGINT
            "#,
        )
        .bind(user_id)
        .fetch_one(executor)
        .await?;

        Ok(Balance::new(total_earnings, total_withdrawn, pending))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        use WithdrawalStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Approved.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Rejected));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Pending.can_transition_to(Pending));
    }
}
