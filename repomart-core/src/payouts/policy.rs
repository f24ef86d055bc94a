//! Payout eligibility rules.
//!
//! Evaluated by the persistence adapters while the seller row is locked, so
//! the snapshot cannot change between the check and the balance update.

use chrono::{DateTime, Duration, Utc};
use repomart_model::Cents;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutPolicy {
    pub minimum: Cents,
    pub cooldown: Duration,
}

/// Seller state the policy needs, read under lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutSnapshot {
    pub balance: Cents,
    pub has_pending_request: bool,
    pub last_counted_request_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum PayoutRejection {
    #[error("amount must be positive")]
    NonPositiveAmount,
    #[error("amount {requested} is below the minimum payout of {minimum}")]
    BelowMinimum { requested: Cents, minimum: Cents },
    #[error("amount {requested} exceeds the available balance of {available}")]
    InsufficientBalance { requested: Cents, available: Cents },
    #[error("a payout request is already pending")]
    RequestAlreadyPending,
    #[error("payout cooldown active until {retry_after}")]
    CooldownActive { retry_after: DateTime<Utc> },
}

impl PayoutPolicy {
    /// Check a request of `amount` at `now` against the locked snapshot.
    /// Rules are applied in a fixed order so callers see the most
    /// actionable rejection first.
    pub fn evaluate(
        &self,
        snapshot: &PayoutSnapshot,
        amount: Cents,
        now: DateTime<Utc>,
    ) -> Result<(), PayoutRejection> {
        if amount.get() <= 0 {
            return Err(PayoutRejection::NonPositiveAmount);
        }
        if amount < self.minimum {
            return Err(PayoutRejection::BelowMinimum {
                requested: amount,
                minimum: self.minimum,
            });
        }
        if snapshot.has_pending_request {
            return Err(PayoutRejection::RequestAlreadyPending);
        }
        if let Some(retry_after) = self.next_eligible_at(snapshot)
            && now < retry_after
        {
            return Err(PayoutRejection::CooldownActive { retry_after });
        }
        if amount > snapshot.balance {
            return Err(PayoutRejection::InsufficientBalance {
                requested: amount,
                available: snapshot.balance.max(Cents::ZERO),
            });
        }
        Ok(())
    }

    /// Earliest instant the cooldown rule passes, if one applies.
    pub fn next_eligible_at(
        &self,
        snapshot: &PayoutSnapshot,
    ) -> Option<DateTime<Utc>> {
        snapshot.last_counted_request_at.map(|at| at + self.cooldown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> PayoutPolicy {
        PayoutPolicy {
            minimum: Cents(1_000),
            cooldown: Duration::days(7),
        }
    }

    fn snapshot(balance: i64) -> PayoutSnapshot {
        PayoutSnapshot {
            balance: Cents(balance),
            has_pending_request: false,
            last_counted_request_at: None,
        }
    }

    #[test]
    fn accepts_request_within_balance() {
        let now = Utc::now();
        assert_eq!(policy().evaluate(&snapshot(5_000), Cents(5_000), now), Ok(()));
    }

    #[test]
    fn rejects_below_minimum() {
        let err = policy()
            .evaluate(&snapshot(50_000), Cents(999), Utc::now())
            .unwrap_err();
        assert_eq!(
            err,
            PayoutRejection::BelowMinimum {
                requested: Cents(999),
                minimum: Cents(1_000)
            }
        );
    }

    #[test]
    fn rejects_zero_and_negative_amounts() {
        let now = Utc::now();
        assert_eq!(
            policy().evaluate(&snapshot(5_000), Cents(0), now),
            Err(PayoutRejection::NonPositiveAmount)
        );
        assert_eq!(
            policy().evaluate(&snapshot(5_000), Cents(-10), now),
            Err(PayoutRejection::NonPositiveAmount)
        );
    }

    #[test]
    fn rejects_insufficient_balance() {
        let err = policy()
            .evaluate(&snapshot(1_500), Cents(2_000), Utc::now())
            .unwrap_err();
        assert!(matches!(err, PayoutRejection::InsufficientBalance { .. }));
    }

    #[test]
    fn negative_balance_reports_zero_available() {
        let err = policy()
            .evaluate(&snapshot(-300), Cents(1_000), Utc::now())
            .unwrap_err();
        assert_eq!(
            err,
            PayoutRejection::InsufficientBalance {
                requested: Cents(1_000),
                available: Cents::ZERO
            }
        );
    }

    #[test]
    fn rejects_when_request_pending() {
        let mut snap = snapshot(10_000);
        snap.has_pending_request = true;
        assert_eq!(
            policy().evaluate(&snap, Cents(1_000), Utc::now()),
            Err(PayoutRejection::RequestAlreadyPending)
        );
    }

    #[test]
    fn cooldown_blocks_until_window_elapses() {
        let now = Utc::now();
        let mut snap = snapshot(10_000);
        snap.last_counted_request_at = Some(now - Duration::days(6));

        let err = policy().evaluate(&snap, Cents(1_000), now).unwrap_err();
        assert_eq!(
            err,
            PayoutRejection::CooldownActive {
                retry_after: now + Duration::days(1)
            }
        );

        let later = now + Duration::days(1);
        assert_eq!(policy().evaluate(&snap, Cents(1_000), later), Ok(()));
    }
}
