//! Fixtures shared by the service tests: a marketplace wired to the
//! in-memory store, a manual clock and the manual payment gateway.

use std::ops::Deref;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use repomart_model::order::CheckoutResponse;
use repomart_model::seller::OnboardRequest;
use repomart_model::user::RegisterRequest;
use repomart_model::{Cents, Order, RepoDraft, RepoListing, User, UserRole, Visibility};

use crate::application::Marketplace;
use crate::application::unit_of_work::AppUnitOfWork;
use crate::auth::crypto::AuthCrypto;
use crate::auth::service::SessionMeta;
use crate::clock::ManualClock;
use crate::database::MemoryStore;
use crate::payments::IntentStatus;
use crate::payments::manual::ManualGateway;
use crate::settings::MarketplaceSettings;

pub(crate) struct TestMarket {
    market: Marketplace,
    pub clock: Arc<ManualClock>,
    pub gateway: Arc<ManualGateway>,
}

impl Deref for TestMarket {
    type Target = Marketplace;

    fn deref(&self) -> &Marketplace {
        &self.market
    }
}

impl TestMarket {
    pub const PASSWORD: &'static str = "password123";

    pub fn new() -> Self {
        Self::with_settings(MarketplaceSettings::default())
    }

    pub fn with_settings(settings: MarketplaceSettings) -> Self {
        let start = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let gateway = Arc::new(ManualGateway::new("whsec_test"));
        let crypto = AuthCrypto::lightweight("pepper", "token-key").unwrap();
        let uow = AppUnitOfWork::in_memory(Arc::new(MemoryStore::new()));

        let market = Marketplace::new(
            Arc::new(uow),
            Arc::new(settings),
            Arc::new(crypto),
            gateway.clone(),
            clock.clone(),
        )
        .unwrap();

        Self {
            market,
            clock,
            gateway,
        }
    }

    pub async fn buyer_with_token(&self, name: &str) -> (User, String) {
        let session = self
            .auth
            .register(
                RegisterRequest {
                    username: name.to_string(),
                    email: format!("{name}@example.com"),
                    password: Self::PASSWORD.to_string(),
                    display_name: None,
                },
                SessionMeta::default(),
            )
            .await
            .unwrap();
        (session.user, session.session_token)
    }

    pub async fn buyer(&self, name: &str) -> User {
        self.buyer_with_token(name).await.0
    }

    pub async fn seller(&self, name: &str) -> User {
        let user = self.buyer(name).await;
        self.sellers
            .onboard(
                &user,
                OnboardRequest {
                    store_name: format!("{name} store"),
                    bio: None,
                    payout_email: format!("payouts+{name}@example.com"),
                },
            )
            .await
            .unwrap();
        self.reload(&user).await
    }

    pub async fn admin(&self, name: &str) -> User {
        self.staff(name, UserRole::Admin).await
    }

    pub async fn moderator(&self, name: &str) -> User {
        self.staff(name, UserRole::Moderator).await
    }

    async fn staff(&self, name: &str, role: UserRole) -> User {
        let user = self.buyer(name).await;
        self.uow.users.set_role(user.id, role).await.unwrap();
        self.reload(&user).await
    }

    pub async fn reload(&self, user: &User) -> User {
        self.uow.users.get_user(user.id).await.unwrap().unwrap()
    }

    pub async fn listing(&self, seller: &User, title: &str, price: i64) -> RepoListing {
        self.catalog
            .create(
                seller,
                RepoDraft {
                    title: title.to_string(),
                    description: format!("{title} description"),
                    language: "Rust".to_string(),
                    tags: vec!["cli".to_string()],
                    price: Cents(price),
                    visibility: Visibility::Public,
                    source_url: None,
                },
            )
            .await
            .unwrap()
    }

    /// Complete payment at the provider for a pending order.
    pub fn pay(&self, order: &Order) {
        let intent_id = order.payment_intent_id.as_deref().unwrap();
        self.gateway.mark(intent_id, IntentStatus::Succeeded).unwrap();
    }

    /// Checkout, pay and confirm in one go. Returns the paid order.
    pub async fn purchase(&self, buyer: &User, repo: &RepoListing) -> Order {
        let CheckoutResponse::PaymentRequired { order, .. } =
            self.checkout.start_checkout(buyer, repo.id).await.unwrap()
        else {
            panic!("expected a paid checkout");
        };
        self.pay(&order);
        self.checkout.confirm_payment(buyer, order.id).await.unwrap().order
    }
}
