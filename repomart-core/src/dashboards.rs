//! Read-side aggregates for the admin, moderator and seller dashboards.

use std::sync::Arc;

use chrono::Duration;
use repomart_model::User;
use repomart_model::dashboard::{
    AdminOverview, DailySales, ModerationQueue, SellerDashboard, TopRepository,
    TopSeller,
};

use crate::application::unit_of_work::AppUnitOfWork;
use crate::clock::Clock;
use crate::error::{CoreError, Result};
use crate::payouts::policy::PayoutSnapshot;
use crate::settings::MarketplaceSettings;

const RECENT_ORDERS: i64 = 20;
const QUEUE_LIMIT: i64 = 200;
const MAX_DAYS: i64 = 366;

#[derive(Debug, Clone)]
pub struct DashboardService {
    uow: Arc<AppUnitOfWork>,
    settings: Arc<MarketplaceSettings>,
    clock: Arc<dyn Clock>,
}

fn require_admin(user: &User) -> Result<()> {
    if user.role.is_admin() {
        Ok(())
    } else {
        Err(CoreError::forbidden("Admin access required"))
    }
}

impl DashboardService {
    pub fn new(
        uow: Arc<AppUnitOfWork>,
        settings: Arc<MarketplaceSettings>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            uow,
            settings,
            clock,
        }
    }

    pub async fn overview(&self, admin: &User) -> Result<AdminOverview> {
        require_admin(admin)?;
        self.uow.reports.overview().await
    }

    /// Paid orders per UTC day over the last `days` days (today included).
    pub async fn sales_by_day(&self, admin: &User, days: i64) -> Result<Vec<DailySales>> {
        require_admin(admin)?;
        let days = days.clamp(1, MAX_DAYS);
        let today = self.clock.now().date_naive();
        let start = today - Duration::days(days - 1);
        let since = start.and_hms_opt(0, 0, 0).map(|t| t.and_utc()).ok_or_else(|| {
            CoreError::Internal("invalid start of day".into())
        })?;
        self.uow.reports.sales_by_day(since).await
    }

    pub async fn top_sellers(&self, admin: &User, limit: i64) -> Result<Vec<TopSeller>> {
        require_admin(admin)?;
        self.uow.reports.top_sellers(limit.clamp(1, 100)).await
    }

    pub async fn top_repositories(&self, admin: &User, limit: i64) -> Result<Vec<TopRepository>> {
        require_admin(admin)?;
        self.uow.reports.top_repositories(limit.clamp(1, 100)).await
    }

    pub async fn moderation_queue(&self, moderator: &User) -> Result<ModerationQueue> {
        if !moderator.role.can_moderate() {
            return Err(CoreError::forbidden("Moderator access required"));
        }
        let comments = self.uow.comments.flagged(QUEUE_LIMIT).await?;
        let reviews = self.uow.reviews.flagged(QUEUE_LIMIT).await?;
        let (flagged_comments, flagged_reviews) = self.uow.reports.flagged_counts().await?;
        Ok(ModerationQueue {
            flagged_comments,
            flagged_reviews,
            comments,
            reviews,
        })
    }

    pub async fn seller_dashboard(&self, seller: &User) -> Result<SellerDashboard> {
        if !seller.role.is_seller() {
            return Err(CoreError::forbidden("Seller account required"));
        }
        let profile = self
            .uow
            .sellers
            .get_profile(seller.id)
            .await?
            .ok_or_else(|| CoreError::not_found("Seller profile"))?;

        let snapshot = PayoutSnapshot {
            balance: profile.balance,
            has_pending_request: !profile.pending_payout.is_zero(),
            last_counted_request_at: self
                .uow
                .payouts
                .last_counted_request_at(seller.id)
                .await?,
        };
        let next_payout_eligible_at = self
            .settings
            .payout_policy()
            .next_eligible_at(&snapshot)
            .filter(|at| *at > self.clock.now());

        Ok(SellerDashboard {
            balance: profile.balance,
            pending_payout: profile.pending_payout,
            lifetime_earnings: profile.lifetime_earnings,
            total_paid_out: profile.total_paid_out,
            total_sales: profile.total_sales,
            next_payout_eligible_at,
            recent_orders: self
                .uow
                .orders
                .list_recent_for_seller(seller.id, RECENT_ORDERS)
                .await?,
            repositories: self.uow.reports.seller_repo_stats(seller.id).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use repomart_model::{Cents, OrderStatus, UserRole, Visibility};

    use super::*;
    use crate::test_support::TestMarket;

    #[tokio::test]
    async fn overview_counts_marketplace_state() {
        let market = TestMarket::new();
        let admin = market.admin("overseer").await;
        let seller = market.seller("vendor").await;
        let buyer = market.buyer("customer").await;
        let repo = market.listing(&seller, "Counted Repo", 1_000).await;
        market.purchase(&buyer, &repo).await;

        let overview = market.dashboards.overview(&admin).await.unwrap();
        assert_eq!(overview.users_by_role.get(UserRole::Buyer.as_str()), Some(&1));
        assert_eq!(overview.users_by_role.get(UserRole::Seller.as_str()), Some(&1));
        assert_eq!(overview.users_by_role.get(UserRole::Admin.as_str()), Some(&1));
        assert_eq!(
            overview.repositories_by_visibility.get(Visibility::Public.as_str()),
            Some(&1)
        );
        assert_eq!(overview.orders_by_status.get(OrderStatus::Paid.as_str()), Some(&1));
        assert_eq!(overview.gross_revenue, Cents(1_000));
        assert_eq!(overview.platform_fees, Cents(100));
        assert_eq!(overview.outstanding_seller_balances, Cents(900));

        assert!(matches!(
            market.dashboards.overview(&buyer).await,
            Err(CoreError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn sales_by_day_and_top_lists() {
        let market = TestMarket::new();
        let admin = market.admin("analyst").await;
        let seller = market.seller("topseller").await;
        let big = market.listing(&seller, "Big Repo", 3_000).await;
        let small = market.listing(&seller, "Small Repo", 1_000).await;
        let a = market.buyer("buyer_a").await;
        let b = market.buyer("buyer_b").await;
        market.purchase(&a, &big).await;
        market.purchase(&b, &big).await;
        market.purchase(&a, &small).await;

        let days = market.dashboards.sales_by_day(&admin, 7).await.unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].orders, 3);
        assert_eq!(days[0].gross, Cents(7_000));
        assert_eq!(days[0].platform_fees, Cents(700));

        let repos = market.dashboards.top_repositories(&admin, 10).await.unwrap();
        assert_eq!(repos[0].repo_id, big.id);
        assert_eq!(repos[0].sales_count, 2);

        let sellers = market.dashboards.top_sellers(&admin, 10).await.unwrap();
        assert_eq!(sellers.len(), 1);
        assert_eq!(sellers[0].total_sales, 3);
        assert_eq!(sellers[0].lifetime_earnings, Cents(6_300));
    }

    #[tokio::test]
    async fn seller_dashboard_reports_cooldown() {
        let market = TestMarket::new();
        let seller = market.seller("dash").await;
        let buyer = market.buyer("dashbuyer").await;
        let repo = market.listing(&seller, "Dash Repo", 5_000).await;
        market.purchase(&buyer, &repo).await;

        let before = market.dashboards.seller_dashboard(&seller).await.unwrap();
        assert_eq!(before.balance, Cents(4_500));
        assert_eq!(before.next_payout_eligible_at, None);
        assert_eq!(before.recent_orders.len(), 1);
        assert_eq!(before.repositories.len(), 1);

        market.payouts.request_payout(&seller, Cents(2_000)).await.unwrap();
        let after = market.dashboards.seller_dashboard(&seller).await.unwrap();
        assert_eq!(after.balance, Cents(2_500));
        assert_eq!(after.pending_payout, Cents(2_000));
        assert_eq!(
            after.next_payout_eligible_at,
            Some(market.clock.now() + Duration::hours(market.settings.payout.cooldown_hours))
        );
    }

    #[tokio::test]
    async fn moderation_queue_collects_flags() {
        let market = TestMarket::new();
        let seller = market.seller("queued").await;
        let repo = market.listing(&seller, "Queue Repo", 0).await;
        let buyer = market.buyer("rude").await;
        let moderator = market.moderator("queue_mod").await;
        market.checkout.start_checkout(&buyer, repo.id).await.unwrap();
        market
            .comments
            .post(
                &buyer,
                repo.id,
                repomart_model::comment::NewCommentRequest {
                    body: "fuck this".into(),
                    parent_id: None,
                },
            )
            .await
            .unwrap();
        market
            .reviews
            .submit(
                &buyer,
                repo.id,
                repomart_model::comment::ReviewRequest {
                    rating: 1,
                    body: Some("shit".into()),
                },
            )
            .await
            .unwrap();

        let queue = market.dashboards.moderation_queue(&moderator).await.unwrap();
        assert_eq!(queue.flagged_comments, 1);
        assert_eq!(queue.flagged_reviews, 1);
        assert!(market.dashboards.moderation_queue(&buyer).await.is_err());
    }

    #[tokio::test]
    async fn moderation_queue_counts_past_the_page_limit() {
        let market = TestMarket::new();
        let seller = market.seller("crowded").await;
        let repo = market.listing(&seller, "Crowded Repo", 0).await;
        let buyer = market.buyer("loud").await;
        let moderator = market.moderator("busy_mod").await;

        for n in 0..=QUEUE_LIMIT {
            market
                .comments
                .post(
                    &buyer,
                    repo.id,
                    repomart_model::comment::NewCommentRequest {
                        body: format!("shit number {n}"),
                        parent_id: None,
                    },
                )
                .await
                .unwrap();
        }

        let queue = market.dashboards.moderation_queue(&moderator).await.unwrap();
        assert_eq!(queue.comments.len() as i64, QUEUE_LIMIT);
        assert_eq!(queue.flagged_comments, QUEUE_LIMIT + 1);
        assert_eq!(queue.flagged_reviews, 0);
    }
}
