use async_trait::async_trait;
use chrono::{DateTime, Utc};
use repomart_model::{Order, OrderId, OrderStatus, RepoId, UserId};

use crate::error::Result;

/// What a settlement attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// This call moved the order to `paid` and applied every side effect.
    Settled(Order),
    /// The order was already paid; nothing changed.
    AlreadySettled(Order),
    /// The order is in a state that cannot be settled (failed, refunded...).
    NotSettleable(Order),
}

impl SettlementOutcome {
    pub fn order(&self) -> &Order {
        match self {
            SettlementOutcome::Settled(order)
            | SettlementOutcome::AlreadySettled(order)
            | SettlementOutcome::NotSettleable(order) => order,
        }
    }

    pub fn into_order(self) -> Order {
        match self {
            SettlementOutcome::Settled(order)
            | SettlementOutcome::AlreadySettled(order)
            | SettlementOutcome::NotSettleable(order) => order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefundOutcome {
    Refunded(Order),
    AlreadyRefunded(Order),
    NotRefundable(Order),
}

#[async_trait]
pub trait OrdersRepository: Send + Sync {
    async fn insert_order(&self, order: &Order) -> Result<()>;
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;
    async fn find_by_payment_intent(&self, intent_id: &str) -> Result<Option<Order>>;
    async fn find_pending(&self, buyer_id: UserId, repo_id: RepoId) -> Result<Option<Order>>;
    async fn list_for_buyer(&self, buyer_id: UserId) -> Result<Vec<Order>>;
    async fn list_recent_for_seller(&self, seller_id: UserId, limit: i64) -> Result<Vec<Order>>;
    /// Compare-and-set status transition. Returns whether the row changed.
    async fn transition_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool>;

    /// Atomically: mark paid (only from `pending`), credit the seller
    /// balance, append the ledger entry, bump repository sales aggregates
    /// and grant access to the buyer.
    async fn settle(&self, id: OrderId, at: DateTime<Utc>) -> Result<SettlementOutcome>;

    /// Atomically: mark refunded (only from `paid`), debit the seller, append
    /// the ledger entry, decrement aggregates and revoke access.
    async fn refund(&self, id: OrderId, at: DateTime<Utc>) -> Result<RefundOutcome>;
}
