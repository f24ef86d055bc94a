use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{LedgerEntryId, OrderId, PayoutId, UserId};
use crate::money::Cents;

string_enum! {
    pub enum PayoutStatus: "payout status" {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRequest {
    pub id: PayoutId,
    pub seller_id: UserId,
    pub amount: Cents,
    pub status: PayoutStatus,
    pub requested_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<UserId>,
    pub note: Option<String>,
}

string_enum! {
    /// Reason a seller balance moved.
    pub enum LedgerKind: "ledger kind" {
        SaleCredit => "sale_credit",
        RefundDebit => "refund_debit",
        PayoutHold => "payout_hold",
        PayoutRelease => "payout_release",
        PayoutSettled => "payout_settled",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub seller_id: UserId,
    pub kind: LedgerKind,
    /// Signed effect on the available balance.
    pub amount: Cents,
    pub order_id: Option<OrderId>,
    pub payout_id: Option<PayoutId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PayoutRequestBody {
    pub amount: Cents,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PayoutDecisionBody {
    #[serde(default)]
    pub note: Option<String>,
}
