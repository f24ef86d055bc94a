use async_trait::async_trait;
use chrono::{DateTime, Utc};
use repomart_model::{
    Cents, LedgerEntry, PayoutId, PayoutRequest, PayoutStatus, UserId,
};

use crate::error::Result;
use crate::payouts::policy::PayoutPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayoutDecision {
    Approve,
    Reject,
}

#[async_trait]
pub trait PayoutsRepository: Send + Sync {
    /// Lock the seller, evaluate `policy` against the locked state and, when
    /// it passes, move `amount` from balance to pending and record the
    /// request. Policy failures surface as `CoreError::Payout`.
    async fn request_payout(
        &self,
        seller_id: UserId,
        amount: Cents,
        policy: &PayoutPolicy,
        at: DateTime<Utc>,
    ) -> Result<PayoutRequest>;

    /// Resolve a pending request. Non-pending requests yield `Conflict`.
    async fn decide(
        &self,
        id: PayoutId,
        decision: PayoutDecision,
        decided_by: UserId,
        note: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<PayoutRequest>;

    async fn get_payout(&self, id: PayoutId) -> Result<Option<PayoutRequest>>;
    async fn list_for_seller(&self, seller_id: UserId) -> Result<Vec<PayoutRequest>>;
    async fn list_by_status(&self, status: PayoutStatus) -> Result<Vec<PayoutRequest>>;
    async fn ledger(&self, seller_id: UserId, limit: i64) -> Result<Vec<LedgerEntry>>;
    /// Requested-at of the newest pending or approved request.
    async fn last_counted_request_at(
        &self,
        seller_id: UserId,
    ) -> Result<Option<DateTime<Utc>>>;
}
