use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{OrderId, RepoId, UserId};
use crate::money::Cents;

string_enum! {
    pub enum OrderStatus: "order status" {
        Pending => "pending",
        Paid => "paid",
        Failed => "failed",
        Canceled => "canceled",
        Refunded => "refunded",
    }
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: UserId,
    pub repo_id: RepoId,
    pub seller_id: UserId,
    pub amount: Cents,
    pub platform_fee: Cents,
    pub seller_amount: Cents,
    pub currency: String,
    pub status: OrderStatus,
    pub payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub user_id: UserId,
    pub repo_id: RepoId,
    pub order_id: Option<OrderId>,
    pub granted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckoutRequest {
    pub repo_id: RepoId,
}

/// Result of starting a checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckoutResponse {
    /// Free listing: access was granted without payment.
    Granted { repo_id: RepoId },
    /// Paid listing: the client completes payment with the provider.
    PaymentRequired {
        order: Order,
        client_secret: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmResponse {
    pub order: Order,
    /// True when this call performed the settlement, false when it had
    /// already happened.
    pub settled_now: bool,
}
