use serde::Serialize;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum WithdrawalError {
    #[error("Withdrawal amount must be greater than zero")]
    InvalidAmount,

    #[error("Insufficient balance")]
    InsufficientBalance { requested: i64, available: i64 },
}

/// Earnings position of a user, summed from media sales and withdrawal records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Balance {
    pub total_earnings: i64,
    pub total_withdrawn: i64,
    pub pending_withdrawals: i64,
    pub available_balance: i64,
}

impl Balance {
    pub fn new(total_earnings: i64, total_withdrawn: i64, pending_withdrawals: i64) -> Self {
        Self {
            total_earnings,
            total_withdrawn,
            pending_withdrawals,
            available_balance: total_earnings - total_withdrawn - pending_withdrawals,
        }
    }

    /// Checks that `amount` may be withdrawn against this balance.
    pub fn ensure_can_withdraw(&self, amount: i64) -> Result<(), WithdrawalError> {
        if amount <= 0 {
            return Err(WithdrawalError::InvalidAmount);
        }
        if amount > self.available_balance {
            return Err(WithdrawalError::InsufficientBalance {
                requested: amount,
                available: self.available_balance,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_balance() {
        let balance = Balance::new(10_000, 3_000, 2_000);
        assert_eq!(balance.available_balance, 5_000);
    }

    #[test]
    fn test_withdraw_within_balance() {
        let balance = Balance::new(10_000, 3_000, 2_000);
        assert!(balance.ensure_can_withdraw(5_000).is_ok());
    }

    #[test]
    fn test_withdraw_over_balance_rejected() {
        let balance = Balance::new(10_000, 3_000, 2_000);
        let err = balance.ensure_can_withdraw(5_001).unwrap_err();
        assert_eq!(
            err,
            WithdrawalError::InsufficientBalance {
                requested: 5_001,
                available: 5_000
            }
        );
        assert_eq!(err.to_string(), "Insufficient balance");
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        let balance = Balance::new(100, 0, 0);
        assert_eq!(
            balance.ensure_can_withdraw(0),
            Err(WithdrawalError::InvalidAmount)
        );
        assert_eq!(
            balance.ensure_can_withdraw(-10),
            Err(WithdrawalError::InvalidAmount)
        );
    }
}
