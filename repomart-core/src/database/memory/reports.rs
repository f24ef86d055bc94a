use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use repomart_model::dashboard::{
    AdminOverview, DailySales, RepoStats, TopRepository, TopSeller,
};
use repomart_model::{Cents, OrderStatus, PayoutStatus, UserId};

use super::{MemoryStore, take};
use crate::database::ports::reports::ReportsRepository;
use crate::error::Result;

fn bump(map: &mut BTreeMap<String, i64>, key: &str) {
    *map.entry(key.to_string()).or_default() += 1;
}

#[async_trait]
impl ReportsRepository for MemoryStore {
    async fn overview(&self) -> Result<AdminOverview> {
        let mut overview = AdminOverview::default();
        {
            let state = self.lock();

            for stored in &state.users {
                bump(&mut overview.users_by_role, stored.user.role.as_str());
                if stored.user.is_banned {
                    overview.banned_users += 1;
                }
            }
            for repo in &state.repos {
                bump(&mut overview.repositories_by_visibility, repo.visibility.as_str());
            }
            for order in &state.orders {
                bump(&mut overview.orders_by_status, order.status.as_str());
                if order.status == OrderStatus::Paid {
                    overview.gross_revenue = overview.gross_revenue + order.amount;
                    overview.platform_fees = overview.platform_fees + order.platform_fee;
                }
            }
            overview.outstanding_seller_balances = state
                .sellers
                .iter()
                .fold(Cents::ZERO, |sum, s| sum + s.balance);
            for payout in state.payouts.iter().filter(|p| p.status == PayoutStatus::Pending) {
                overview.pending_payouts += 1;
                overview.pending_payout_total = overview.pending_payout_total + payout.amount;
            }
        }
        (overview.flagged_comments, overview.flagged_reviews) = self.flagged_counts().await?;
        Ok(overview)
    }

    async fn flagged_counts(&self) -> Result<(i64, i64)> {
        let state = self.lock();
        let comments = state
            .comments
            .iter()
            .filter(|c| c.is_flagged && !c.is_deleted)
            .count() as i64;
        let reviews = state.reviews.iter().filter(|r| r.is_flagged).count() as i64;
        Ok((comments, reviews))
    }

    async fn sales_by_day(&self, since: DateTime<Utc>) -> Result<Vec<DailySales>> {
        let state = self.lock();
        let mut days: BTreeMap<_, DailySales> = BTreeMap::new();
        for order in &state.orders {
            let Some(paid_at) = order.paid_at else { continue };
            if order.status != OrderStatus::Paid || paid_at < since {
                continue;
            }
            let day = paid_at.date_naive();
            let entry = days.entry(day).or_insert_with(|| DailySales {
                day,
                orders: 0,
                gross: Cents::ZERO,
                platform_fees: Cents::ZERO,
            });
            entry.orders += 1;
            entry.gross = entry.gross + order.amount;
            entry.platform_fees = entry.platform_fees + order.platform_fee;
        }
        Ok(days.into_values().collect())
    }

    async fn top_sellers(&self, limit: i64) -> Result<Vec<TopSeller>> {
        let state = self.lock();
        let mut sellers: Vec<TopSeller> = state
            .sellers
            .iter()
            .filter(|s| s.total_sales > 0)
            .map(|s| TopSeller {
                seller_id: s.user_id,
                store_name: s.store_name.clone(),
                total_sales: s.total_sales,
                lifetime_earnings: s.lifetime_earnings,
            })
            .collect();
        sellers.sort_by(|a, b| {
            b.lifetime_earnings
                .cmp(&a.lifetime_earnings)
                .then_with(|| b.total_sales.cmp(&a.total_sales))
                .then_with(|| a.store_name.cmp(&b.store_name))
        });
        sellers.truncate(take(limit));
        Ok(sellers)
    }

    async fn top_repositories(&self, limit: i64) -> Result<Vec<TopRepository>> {
        let state = self.lock();
        let mut repos: Vec<TopRepository> = state
            .repos
            .iter()
            .filter(|r| r.sales_count > 0)
            .map(|r| TopRepository {
                repo_id: r.id,
                title: r.title.clone(),
                seller_id: r.seller_id,
                sales_count: r.sales_count,
                revenue: r.revenue,
            })
            .collect();
        repos.sort_by(|a, b| {
            b.revenue
                .cmp(&a.revenue)
                .then_with(|| b.sales_count.cmp(&a.sales_count))
                .then_with(|| a.title.cmp(&b.title))
        });
        repos.truncate(take(limit));
        Ok(repos)
    }

    async fn seller_repo_stats(&self, seller_id: UserId) -> Result<Vec<RepoStats>> {
        let state = self.lock();
        let mut stats: Vec<RepoStats> = state
            .repos
            .iter()
            .filter(|r| r.seller_id == seller_id)
            .map(|r| RepoStats {
                repo_id: r.id,
                title: r.title.clone(),
                sales_count: r.sales_count,
                revenue: r.revenue,
                rating_count: r.rating_count,
            })
            .collect();
        stats.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.title.cmp(&b.title)));
        Ok(stats)
    }
}
