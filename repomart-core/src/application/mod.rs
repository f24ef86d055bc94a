//! Service composition: one struct owning every application service, built
//! over a unit of work.

pub mod unit_of_work;

use std::sync::Arc;

use tracing::info;

use crate::auth::{AuthCrypto, AuthService, UserAdminService};
use crate::catalog::CatalogService;
use crate::checkout::CheckoutService;
use crate::clock::Clock;
use crate::dashboards::DashboardService;
use crate::error::{CoreError, Result};
use crate::moderation::comments::CommentService;
use crate::moderation::profanity::ProfanityFilter;
use crate::moderation::reviews::ReviewService;
use crate::payments::PaymentGateway;
use crate::payouts::PayoutService;
use crate::search_history::SearchHistoryService;
use crate::sellers::SellerService;
use crate::settings::MarketplaceSettings;

pub use self::unit_of_work::AppUnitOfWork;

#[derive(Debug, Clone)]
pub struct Marketplace {
    pub uow: Arc<AppUnitOfWork>,
    pub settings: Arc<MarketplaceSettings>,
    pub clock: Arc<dyn Clock>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub auth: AuthService,
    pub users: UserAdminService,
    pub sellers: SellerService,
    pub catalog: CatalogService,
    pub search_history: SearchHistoryService,
    pub checkout: CheckoutService,
    pub payouts: PayoutService,
    pub comments: CommentService,
    pub reviews: ReviewService,
    pub dashboards: DashboardService,
}

impl Marketplace {
    pub fn new(
        uow: Arc<AppUnitOfWork>,
        settings: Arc<MarketplaceSettings>,
        crypto: Arc<AuthCrypto>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        settings.validate().map_err(CoreError::Validation)?;
        let filter = ProfanityFilter::from_settings(&settings.moderation)
            .map(Arc::new)
            .map_err(|err| {
                CoreError::Internal(format!("invalid profanity word list: {err}"))
            })?;

        let search_history = SearchHistoryService::new(
            uow.clone(),
            clock.clone(),
            settings.search_history_cap,
        );
        let marketplace = Self {
            auth: AuthService::new(
                uow.clone(),
                crypto,
                clock.clone(),
                settings.sessions.ttl(),
            ),
            users: UserAdminService::new(uow.clone()),
            sellers: SellerService::new(uow.clone(), clock.clone()),
            catalog: CatalogService::new(
                uow.clone(),
                settings.clone(),
                clock.clone(),
                search_history.clone(),
            ),
            search_history,
            checkout: CheckoutService::new(
                uow.clone(),
                gateway.clone(),
                settings.clone(),
                clock.clone(),
            ),
            payouts: PayoutService::new(
                uow.clone(),
                settings.clone(),
                clock.clone(),
            ),
            comments: CommentService::new(
                uow.clone(),
                filter.clone(),
                clock.clone(),
            ),
            reviews: ReviewService::new(uow.clone(), filter, clock.clone()),
            dashboards: DashboardService::new(
                uow.clone(),
                settings.clone(),
                clock.clone(),
            ),
            uow,
            settings,
            clock,
            gateway,
        };

        info!(
            gateway = marketplace.gateway.name(),
            currency = %marketplace.settings.currency,
            platform_fee_bps = marketplace.settings.platform_fee_bps,
            "marketplace services ready"
        );
        Ok(marketplace)
    }
}
