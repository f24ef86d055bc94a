use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::RepoListing;
use crate::ids::UserId;
use crate::money::Cents;

/// Seller account state, including the running balances the payout
/// workflow operates on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerProfile {
    pub user_id: UserId,
    pub store_name: String,
    pub bio: Option<String>,
    pub payout_email: String,
    /// Funds available for a payout request.
    pub balance: Cents,
    /// Funds held by pending payout requests.
    pub pending_payout: Cents,
    pub lifetime_earnings: Cents,
    pub total_paid_out: Cents,
    pub total_sales: i64,
    pub last_payout_requested_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OnboardRequest {
    pub store_name: String,
    #[serde(default)]
    pub bio: Option<String>,
    pub payout_email: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpdateSellerRequest {
    pub bio: Option<String>,
    pub payout_email: Option<String>,
}

/// Public face of a seller: no balances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Storefront {
    pub store_name: String,
    pub bio: Option<String>,
    pub seller_id: UserId,
    pub total_sales: i64,
    pub created_at: DateTime<Utc>,
    pub repositories: Vec<RepoListing>,
}
