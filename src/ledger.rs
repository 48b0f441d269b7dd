//! Balance mutation primitives.
//!
//! Every money movement goes through one of the guarded updates below,
//! always inside the same diesel transaction as its audit row. A debit is
//! a single conditional `UPDATE ... SET balance = balance - $amt WHERE id
//! = $id AND balance >= $amt`; zero rows affected means the balance was
//! insufficient and nothing changed, regardless of how many requests race
//! on the same row. There is no read-compute-write path anywhere.

use diesel::prelude::*;
use uuid::Uuid;

use crate::error::ApiError;
use crate::schema::{broker_users, wallets};

fn amount_error(code: &'static str) -> ApiError {
    let mut errs = validator::ValidationErrors::new();
    errs.add("amount", validator::ValidationError::new(code));
    ApiError::Validation(errs)
}

/// Convert an API amount in base units to minor units (cents).
/// Rejects non-positive and non-finite amounts.
pub fn cents_from_amount(amount: f64) -> Result<i64, ApiError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(amount_error("amount must be positive"));
    }
    let cents = (amount * 100.0).round();
    if cents > i64::MAX as f64 {
        return Err(amount_error("amount out of range"));
    }
    Ok(cents as i64)
}

pub fn credit_wallet(
    conn: &mut PgConnection,
    wallet_id: Uuid,
    amount_cents: i64,
) -> Result<(), ApiError> {
    let updated = diesel::update(wallets::table)
        .filter(wallets::id.eq(wallet_id))
        .set(wallets::balance.eq(wallets::balance + amount_cents))
        .execute(conn)?;

    if updated == 0 {
        return Err(ApiError::NotFound("Wallet not found".to_string()));
    }
    Ok(())
}

/// Debit a wallet only if the balance covers the amount. The sufficiency
/// check and the decrement are one statement, so concurrent debits
/// serialize on the row and can never drive the balance negative.
pub fn debit_wallet(
    conn: &mut PgConnection,
    wallet_id: Uuid,
    amount_cents: i64,
) -> Result<(), ApiError> {
    let updated = diesel::update(wallets::table)
        .filter(wallets::id.eq(wallet_id))
        .filter(wallets::balance.ge(amount_cents))
        .set(wallets::balance.eq(wallets::balance - amount_cents))
        .execute(conn)?;

    if updated == 0 {
        return Err(ApiError::InsufficientBalance);
    }
    Ok(())
}

pub fn credit_broker(
    conn: &mut PgConnection,
    broker_user_id: Uuid,
    amount_cents: i64,
) -> Result<(), ApiError> {
    let updated = diesel::update(broker_users::table)
        .filter(broker_users::id.eq(broker_user_id))
        .set(broker_users::balance.eq(broker_users::balance + amount_cents))
        .execute(conn)?;

    if updated == 0 {
        return Err(ApiError::NotFound("Broker user not found".to_string()));
    }
    Ok(())
}

pub fn debit_broker(
    conn: &mut PgConnection,
    broker_user_id: Uuid,
    amount_cents: i64,
) -> Result<(), ApiError> {
    let updated = diesel::update(broker_users::table)
        .filter(broker_users::id.eq(broker_user_id))
        .filter(broker_users::balance.ge(amount_cents))
        .set(broker_users::balance.eq(broker_users::balance - amount_cents))
        .execute(conn)?;

    if updated == 0 {
        return Err(ApiError::InsufficientBalance);
    }
    Ok(())
}

/// Withdrawal lifecycle shared by the generic and broker flows.
///
/// pending -> approved | rejected
/// approved -> completed | failed
///
/// Funds leave the balance on approval and come back on `failed`
/// (compensation); `rejected` never touches the balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
    Failed,
}

impl WithdrawalStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved)
                | (Self::Pending, Self::Rejected)
                | (Self::Approved, Self::Completed)
                | (Self::Approved, Self::Failed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cents_conversion_rounds_to_minor_units() {
        assert_eq!(cents_from_amount(10.99).unwrap(), 1099);
        assert_eq!(cents_from_amount(0.01).unwrap(), 1);
        assert_eq!(cents_from_amount(150.0).unwrap(), 15000);
    }

    #[test]
    fn cents_conversion_rejects_non_positive() {
        for bad in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            match cents_from_amount(bad) {
                Err(ApiError::Validation(_)) => {}
                other => panic!("expected validation error for {}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn status_round_trips() {
        for s in ["pending", "approved", "rejected", "completed", "failed"] {
            assert_eq!(WithdrawalStatus::parse(s).unwrap().as_str(), s);
        }
        assert!(WithdrawalStatus::parse("cancelled").is_none());
    }

    #[test]
    fn pending_only_moves_to_approved_or_rejected() {
        let pending = WithdrawalStatus::Pending;
        assert!(pending.can_transition_to(WithdrawalStatus::Approved));
        assert!(pending.can_transition_to(WithdrawalStatus::Rejected));
        assert!(!pending.can_transition_to(WithdrawalStatus::Completed));
        assert!(!pending.can_transition_to(WithdrawalStatus::Failed));
        assert!(!pending.can_transition_to(WithdrawalStatus::Pending));
    }

    #[test]
    fn approved_only_moves_to_completed_or_failed() {
        let approved = WithdrawalStatus::Approved;
        assert!(approved.can_transition_to(WithdrawalStatus::Completed));
        assert!(approved.can_transition_to(WithdrawalStatus::Failed));
        assert!(!approved.can_transition_to(WithdrawalStatus::Rejected));
    }

    #[test]
    fn terminal_states_do_not_move() {
        for s in [
            WithdrawalStatus::Rejected,
            WithdrawalStatus::Completed,
            WithdrawalStatus::Failed,
        ] {
            for next in [
                WithdrawalStatus::Pending,
                WithdrawalStatus::Approved,
                WithdrawalStatus::Rejected,
                WithdrawalStatus::Completed,
                WithdrawalStatus::Failed,
            ] {
                assert!(!s.can_transition_to(next));
            }
        }
    }
}
