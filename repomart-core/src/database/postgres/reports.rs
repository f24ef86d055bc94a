use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use repomart_model::dashboard::{
    AdminOverview, DailySales, RepoStats, TopRepository, TopSeller,
};
use repomart_model::{Cents, UserId};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::database::ports::reports::ReportsRepository;
use crate::error::Result;

#[derive(Clone, Debug)]
pub struct PostgresReportsRepository {
    pool: PgPool,
}

impl PostgresReportsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn grouped(&self, sql: &str) -> Result<BTreeMap<String, i64>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().collect())
    }
}

#[derive(Debug, FromRow)]
struct TotalsRow {
    banned_users: i64,
    gross_revenue: i64,
    platform_fees: i64,
    outstanding_balances: i64,
    pending_payouts: i64,
    pending_payout_total: i64,
    flagged_comments: i64,
    flagged_reviews: i64,
}

#[derive(Debug, FromRow)]
struct DailyRow {
    day: NaiveDate,
    orders: i64,
    gross: i64,
    platform_fees: i64,
}

#[derive(Debug, FromRow)]
struct TopSellerRow {
    user_id: Uuid,
    store_name: String,
    total_sales: i64,
    lifetime_earnings_cents: i64,
}

#[derive(Debug, FromRow)]
struct RepoAggregateRow {
    id: Uuid,
    title: String,
    seller_id: Uuid,
    sales_count: i64,
    revenue_cents: i64,
    rating_count: i64,
}

const TOTALS_SQL: &str = r#"
SELECT
    (SELECT COUNT(*) FROM users WHERE is_banned) AS banned_users,
    (SELECT COALESCE(SUM(amount_cents), 0)::int8 FROM orders WHERE status = 'paid')
        AS gross_revenue,
    (SELECT COALESCE(SUM(platform_fee_cents), 0)::int8 FROM orders WHERE status = 'paid')
        AS platform_fees,
    (SELECT COALESCE(SUM(balance_cents), 0)::int8 FROM seller_profiles)
        AS outstanding_balances,
    (SELECT COUNT(*) FROM payout_requests WHERE status = 'pending') AS pending_payouts,
    (SELECT COALESCE(SUM(amount_cents), 0)::int8 FROM payout_requests WHERE status = 'pending')
        AS pending_payout_total,
    (SELECT COUNT(*) FROM comments WHERE is_flagged AND NOT is_deleted) AS flagged_comments,
    (SELECT COUNT(*) FROM reviews WHERE is_flagged) AS flagged_reviews
"#;

#[async_trait]
impl ReportsRepository for PostgresReportsRepository {
    async fn overview(&self) -> Result<AdminOverview> {
        let totals: TotalsRow = sqlx::query_as(TOTALS_SQL).fetch_one(&self.pool).await?;

        Ok(AdminOverview {
            users_by_role: self
                .grouped("SELECT role, COUNT(*) FROM users GROUP BY role")
                .await?,
            banned_users: totals.banned_users,
            repositories_by_visibility: self
                .grouped("SELECT visibility, COUNT(*) FROM repositories GROUP BY visibility")
                .await?,
            orders_by_status: self
                .grouped("SELECT status, COUNT(*) FROM orders GROUP BY status")
                .await?,
            gross_revenue: Cents::new(totals.gross_revenue),
            platform_fees: Cents::new(totals.platform_fees),
            outstanding_seller_balances: Cents::new(totals.outstanding_balances),
            pending_payouts: totals.pending_payouts,
            pending_payout_total: Cents::new(totals.pending_payout_total),
            flagged_comments: totals.flagged_comments,
            flagged_reviews: totals.flagged_reviews,
        })
    }

    async fn flagged_counts(&self) -> Result<(i64, i64)> {
        let counts: (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM comments WHERE is_flagged AND NOT is_deleted),
                (SELECT COUNT(*) FROM reviews WHERE is_flagged)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(counts)
    }

    async fn sales_by_day(&self, since: DateTime<Utc>) -> Result<Vec<DailySales>> {
        let rows: Vec<DailyRow> = sqlx::query_as(
            r#"
            SELECT
                (paid_at AT TIME ZONE 'UTC')::date AS day,
                COUNT(*) AS orders,
                COALESCE(SUM(amount_cents), 0)::int8 AS gross,
                COALESCE(SUM(platform_fee_cents), 0)::int8 AS platform_fees
            FROM orders
            WHERE status = 'paid' AND paid_at >= $1
            GROUP BY day
            ORDER BY day ASC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| DailySales {
                day: row.day,
                orders: row.orders,
                gross: Cents::new(row.gross),
                platform_fees: Cents::new(row.platform_fees),
            })
            .collect())
    }

    async fn top_sellers(&self, limit: i64) -> Result<Vec<TopSeller>> {
        let rows: Vec<TopSellerRow> = sqlx::query_as(
            r#"
            SELECT user_id, store_name, total_sales, lifetime_earnings_cents
            FROM seller_profiles
            WHERE total_sales > 0
            ORDER BY lifetime_earnings_cents DESC, total_sales DESC, store_name ASC
            LIMIT $1
            "#,
        )
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| TopSeller {
                seller_id: row.user_id.into(),
                store_name: row.store_name,
                total_sales: row.total_sales,
                lifetime_earnings: Cents::new(row.lifetime_earnings_cents),
            })
            .collect())
    }

    async fn top_repositories(&self, limit: i64) -> Result<Vec<TopRepository>> {
        let rows: Vec<RepoAggregateRow> = sqlx::query_as(
            r#"
            SELECT id, title, seller_id, sales_count, revenue_cents, rating_count
            FROM repositories
            WHERE sales_count > 0
            ORDER BY revenue_cents DESC, sales_count DESC, title ASC
            LIMIT $1
            "#,
        )
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| TopRepository {
                repo_id: row.id.into(),
                title: row.title,
                seller_id: row.seller_id.into(),
                sales_count: row.sales_count,
                revenue: Cents::new(row.revenue_cents),
            })
            .collect())
    }

    async fn seller_repo_stats(&self, seller_id: UserId) -> Result<Vec<RepoStats>> {
        let rows: Vec<RepoAggregateRow> = sqlx::query_as(
            r#"
            SELECT id, title, seller_id, sales_count, revenue_cents, rating_count
            FROM repositories
            WHERE seller_id = $1
            ORDER BY revenue_cents DESC, title ASC
            "#,
        )
        .bind(seller_id.to_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| RepoStats {
                repo_id: row.id.into(),
                title: row.title,
                sales_count: row.sales_count,
                revenue: Cents::new(row.revenue_cents),
                rating_count: row.rating_count,
            })
            .collect())
    }
}
