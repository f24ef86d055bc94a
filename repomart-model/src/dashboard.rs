use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::comment::{Comment, Review};
use crate::ids::{RepoId, UserId};
use crate::money::Cents;
use crate::order::Order;

/// Marketplace-wide aggregates for the admin dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminOverview {
    pub users_by_role: BTreeMap<String, i64>,
    pub banned_users: i64,
    pub repositories_by_visibility: BTreeMap<String, i64>,
    pub orders_by_status: BTreeMap<String, i64>,
    pub gross_revenue: Cents,
    pub platform_fees: Cents,
    pub outstanding_seller_balances: Cents,
    pub pending_payouts: i64,
    pub pending_payout_total: Cents,
    pub flagged_comments: i64,
    pub flagged_reviews: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySales {
    pub day: NaiveDate,
    pub orders: i64,
    pub gross: Cents,
    pub platform_fees: Cents,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopSeller {
    pub seller_id: UserId,
    pub store_name: String,
    pub total_sales: i64,
    pub lifetime_earnings: Cents,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopRepository {
    pub repo_id: RepoId,
    pub title: String,
    pub seller_id: UserId,
    pub sales_count: i64,
    pub revenue: Cents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationQueue {
    pub comments: Vec<Comment>,
    pub reviews: Vec<Review>,
    pub flagged_comments: i64,
    pub flagged_reviews: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoStats {
    pub repo_id: RepoId,
    pub title: String,
    pub sales_count: i64,
    pub revenue: Cents,
    pub rating_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellerDashboard {
    pub balance: Cents,
    pub pending_payout: Cents,
    pub lifetime_earnings: Cents,
    pub total_paid_out: Cents,
    pub total_sales: i64,
    /// Earliest time a new payout request passes the cooldown check.
    pub next_payout_eligible_at: Option<DateTime<Utc>>,
    pub recent_orders: Vec<Order>,
    pub repositories: Vec<RepoStats>,
}
