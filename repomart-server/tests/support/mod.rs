#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Result, anyhow};
use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::{TimeZone, Utc};
use repomart_core::application::AppUnitOfWork;
use repomart_core::auth::AuthCrypto;
use repomart_core::clock::ManualClock;
use repomart_core::database::MemoryStore;
use repomart_core::payments::IntentStatus;
use repomart_core::payments::manual::ManualGateway;
use repomart_core::settings::MarketplaceSettings;
use repomart_model::routes::{utils as route_utils, v1};
use repomart_model::{UserId, UserRole};
use repomart_server::{AppState, create_app, infra::config::Config};
use serde_json::{Value, json};

pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub gateway: Arc<ManualGateway>,
    pub clock: Arc<ManualClock>,
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

pub fn build_test_app() -> Result<TestApp> {
    build_test_app_with(MarketplaceSettings::default())
}

pub fn build_test_app_with(settings: MarketplaceSettings) -> Result<TestApp> {
    let config = Arc::new(Config::in_memory(settings));
    let gateway = Arc::new(ManualGateway::new(config.stripe_webhook_secret.as_bytes()));
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
            .single()
            .ok_or_else(|| anyhow!("invalid start time"))?,
    ));
    let crypto = AuthCrypto::lightweight(&config.auth_password_pepper, &config.auth_token_key)
        .map_err(|err| anyhow!(err.to_string()))?;
    let uow = AppUnitOfWork::in_memory(Arc::new(MemoryStore::new()));

    let state = AppState::assemble(
        config,
        uow,
        Arc::new(crypto),
        gateway.clone(),
        clock.clone(),
        None,
    )?;
    let server = TestServer::new(create_app(state.clone()))
        .map_err(|err| anyhow!(err.to_string()))?;

    Ok(TestApp {
        server,
        state,
        gateway,
        clock,
    })
}

/// A registered account with its bearer token.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: UserId,
    pub username: String,
    pub token: String,
}

impl Account {
    pub fn auth(&self) -> String {
        bearer(&self.token)
    }
}

impl TestApp {
    pub async fn register(&self, username: &str) -> Account {
        let response = self
            .server
            .post(v1::auth::REGISTER)
            .json(&json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": PASSWORD,
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        Account {
            id: serde_json::from_value(body["data"]["user"]["id"].clone())
                .expect("user id present"),
            username: username.to_string(),
            token: body["data"]["session_token"]
                .as_str()
                .expect("session token present")
                .to_string(),
        }
    }

    /// Signs in again, returning the account with a fresh session token.
    pub async fn login(&self, account: &Account) -> Account {
        let response = self
            .server
            .post(v1::auth::LOGIN)
            .json(&json!({ "login": account.username, "password": PASSWORD }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        Account {
            token: body["data"]["session_token"]
                .as_str()
                .expect("session token present")
                .to_string(),
            ..account.clone()
        }
    }

    pub async fn seller(&self, username: &str) -> Account {
        let account = self.register(username).await;
        self.server
            .post(v1::sellers::ONBOARD)
            .add_header("Authorization", account.auth())
            .json(&json!({
                "store_name": format!("{username}-store"),
                "payout_email": format!("payouts+{username}@example.com"),
            }))
            .await
            .assert_status(StatusCode::CREATED);
        account
    }

    /// Staff roles cannot be self-assigned; promote directly in storage.
    pub async fn staff(&self, username: &str, role: UserRole) -> Account {
        let account = self.register(username).await;
        self.state
            .market()
            .uow
            .users
            .set_role(account.id, role)
            .await
            .expect("role updated");
        account
    }

    pub async fn list_repo(&self, seller: &Account, title: &str, price: i64) -> Value {
        let response = self
            .server
            .post(v1::repos::COLLECTION)
            .add_header("Authorization", seller.auth())
            .json(&json!({
                "title": title,
                "description": format!("{title} for testing"),
                "language": "Rust",
                "tags": ["cli"],
                "price": price,
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        body["data"].clone()
    }

    /// Starts checkout for `repo_id` and returns the pending order.
    pub async fn start_checkout(&self, buyer: &Account, repo_id: &str) -> Value {
        let response = self
            .server
            .post(v1::orders::CHECKOUT)
            .add_header("Authorization", buyer.auth())
            .json(&json!({ "repo_id": repo_id }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["data"]["kind"], "payment_required");
        body["data"]["order"].clone()
    }

    /// Full paid purchase: checkout, provider success, confirmation.
    pub async fn purchase(&self, buyer: &Account, repo_id: &str) -> Value {
        let order = self.start_checkout(buyer, repo_id).await;
        self.purchase_existing(buyer, &order).await
    }

    /// Marks the order's intent as paid and confirms it.
    pub async fn purchase_existing(&self, buyer: &Account, order: &Value) -> Value {
        let intent = order["payment_intent_id"].as_str().expect("intent id");
        self.gateway
            .mark(intent, IntentStatus::Succeeded)
            .expect("intent exists");

        let order_id = order["id"].as_str().expect("order id");
        let response = self
            .server
            .post(&route_utils::replace_param(v1::orders::CONFIRM, "{id}", order_id))
            .add_header("Authorization", buyer.auth())
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["data"]["settled_now"], true);
        body["data"]["order"].clone()
    }
}
