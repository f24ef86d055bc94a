use async_trait::async_trait;
use chrono::{DateTime, Utc};
use repomart_model::UserId;
use repomart_model::dashboard::{
    AdminOverview, DailySales, RepoStats, TopRepository, TopSeller,
};

use crate::error::Result;

/// Read-only aggregate queries behind the dashboards.
#[async_trait]
pub trait ReportsRepository: Send + Sync {
    async fn overview(&self) -> Result<AdminOverview>;
    /// Hidden, non-deleted comments and flagged reviews, uncapped.
    async fn flagged_counts(&self) -> Result<(i64, i64)>;
    /// Paid orders grouped by UTC day, oldest first.
    async fn sales_by_day(&self, since: DateTime<Utc>) -> Result<Vec<DailySales>>;
    async fn top_sellers(&self, limit: i64) -> Result<Vec<TopSeller>>;
    async fn top_repositories(&self, limit: i64) -> Result<Vec<TopRepository>>;
    async fn seller_repo_stats(&self, seller_id: UserId) -> Result<Vec<RepoStats>>;
}
