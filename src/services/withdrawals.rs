use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    user::User,
    withdrawal::{CreateWithdrawalData, Withdrawal, WithdrawalStatus},
};
use crate::services::earnings::WithdrawalError;

#[derive(thiserror::Error, Debug)]
pub enum WithdrawalServiceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Rejected(#[from] WithdrawalError),

    #[error("User not found")]
    UserNotFound,

    #[error("Withdrawal not found")]
    NotFound,

    #[error("Cannot move withdrawal from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}

/// Creates a withdrawal request after checking the caller's available balance.
///
/// The user row stays locked until commit, so concurrent requests from the
/// same user are checked one after another.
#[tracing::instrument(skip(pool, method, account_details))]
pub async fn request_withdrawal(
    pool: &PgPool,
    user_id: Uuid,
    amount: i64,
    method: String,
    account_details: String,
) -> Result<Withdrawal, WithdrawalServiceError> {
    let mut tx = pool.begin().await?;

    User::lock(&mut *tx, user_id)
        .await?
        .ok_or(WithdrawalServiceError::UserNotFound)?;

    let balance = Withdrawal::balance_for_user(&mut *tx, user_id).await?;
    balance.ensure_can_withdraw(amount)?;

    let withdrawal = Withdrawal::create(
        &mut *tx,
        CreateWithdrawalData {
            user_id,
            amount,
            method,
            account_details,
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        withdrawal_id = %withdrawal.id,
        user_id = %user_id,
        amount,
        available = balance.available_balance,
        "Withdrawal requested"
    );

    Ok(withdrawal)
}

/// Moves a withdrawal to `next` if the transition is allowed.
pub async fn update_status(
    pool: &PgPool,
    id: Uuid,
    next: WithdrawalStatus,
    admin_note: Option<String>,
) -> Result<Withdrawal, WithdrawalServiceError> {
    let mut tx = pool.begin().await?;

    let current = Withdrawal::find_for_update(&mut *tx, id)
        .await?
        .ok_or(WithdrawalServiceError::NotFound)?;

    let allowed = current
        .status()
        .map(|status| status.can_transition_to(next))
        .unwrap_or(false);
    if !allowed {
        return Err(WithdrawalServiceError::InvalidTransition {
            from: current.status.clone(),
            to: next.as_str().to_string(),
        });
    }

    let updated = Withdrawal::set_status(&mut *tx, id, next, admin_note).await?;
    tx.commit().await?;

    tracing::info!(
        withdrawal_id = %id,
        from = %current.status,
        to = %updated.status,
        "Withdrawal status updated"
    );

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_user, test_pool};

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_withdrawal_over_balance_is_rejected() {
        let pool = test_pool().await;
        let user = create_test_user(&pool).await;

        let err = request_withdrawal(&pool, user.id, 500, "bank".into(), "acct".into())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WithdrawalServiceError::Rejected(WithdrawalError::InsufficientBalance {
                requested: 500,
                available: 0,
            })
        ));
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_unknown_user_cannot_withdraw() {
        let pool = test_pool().await;

        let err = request_withdrawal(&pool, Uuid::new_v4(), 1, "bank".into(), "acct".into())
            .await
            .unwrap_err();

        assert!(matches!(err, WithdrawalServiceError::UserNotFound));
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_missing_withdrawal_status_update() {
        let pool = test_pool().await;

        let err = update_status(&pool, Uuid::new_v4(), WithdrawalStatus::Approved, None)
            .await
            .unwrap_err();

        assert!(matches!(err, WithdrawalServiceError::NotFound));
    }
}
