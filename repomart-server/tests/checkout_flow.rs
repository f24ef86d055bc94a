use anyhow::Result;
use axum::body::Bytes;
use axum::http::StatusCode;
use repomart_core::payments::IntentStatus;
use repomart_model::UserRole;
use repomart_model::routes::{utils as route_utils, v1};
use serde_json::{Value, json};

#[path = "support/mod.rs"]
mod support;
use support::build_test_app;

fn id_of(value: &Value) -> String {
    value["id"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn webhook_settles_order_and_grants_access() -> Result<()> {
    let app = build_test_app()?;
    let seller = app.seller("maker").await;
    let buyer = app.register("shopper").await;
    let repo = app.list_repo(&seller, "Tokio Recipes", 2_500).await;
    let repo_id = id_of(&repo);

    let order = app.start_checkout(&buyer, &repo_id).await;
    assert_eq!(order["status"], "pending");
    assert_eq!(order["amount"], 2_500);
    assert_eq!(order["platform_fee"], 250);
    assert_eq!(order["seller_amount"], 2_250);

    let intent = order["payment_intent_id"].as_str().unwrap_or_default();
    app.gateway.mark(intent, IntentStatus::Succeeded)?;
    let (payload, signature) = app
        .gateway
        .signed_event(intent, "payment_intent.succeeded")?;

    let delivery = app
        .server
        .post(v1::orders::WEBHOOK)
        .add_header("Stripe-Signature", signature.clone())
        .bytes(Bytes::from(payload.clone()))
        .await;
    delivery.assert_status_ok();
    let body: Value = delivery.json();
    assert_eq!(body["result"], "settled");
    assert_eq!(body["order_id"], order["id"]);

    // Provider retries are acknowledged without settling twice.
    let retry: Value = app
        .server
        .post(v1::orders::WEBHOOK)
        .add_header("Stripe-Signature", signature)
        .bytes(Bytes::from(payload))
        .await
        .json();
    assert_eq!(retry["result"], "already_settled");

    let library: Value = app
        .server
        .get(v1::repos::LIBRARY)
        .add_header("Authorization", buyer.auth())
        .await
        .json();
    assert_eq!(library["data"][0]["id"], repo["id"]);

    let dashboard: Value = app
        .server
        .get(v1::sellers::DASHBOARD)
        .add_header("Authorization", seller.auth())
        .await
        .json();
    assert_eq!(dashboard["data"]["balance"], 2_250);
    assert_eq!(dashboard["data"]["total_sales"], 1);

    // Owning the repository blocks a second purchase.
    app.server
        .post(v1::orders::CHECKOUT)
        .add_header("Authorization", buyer.auth())
        .json(&json!({ "repo_id": repo_id }))
        .await
        .assert_status(StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn forged_or_unsigned_webhooks_are_rejected() -> Result<()> {
    let app = build_test_app()?;
    let payload = br#"{"id":"evt_1","type":"payment_intent.succeeded","data":{"object":{"id":"pi_1"}}}"#;

    app.server
        .post(v1::orders::WEBHOOK)
        .bytes(Bytes::from_static(payload))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    app.server
        .post(v1::orders::WEBHOOK)
        .add_header("Stripe-Signature", "t=1700000000,v1=deadbeef")
        .bytes(Bytes::from_static(payload))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn confirm_settles_after_provider_success() -> Result<()> {
    let app = build_test_app()?;
    let seller = app.seller("author").await;
    let buyer = app.register("reader").await;
    let repo = app.list_repo(&seller, "Parser Kit", 1_000).await;

    let order = app.start_checkout(&buyer, &id_of(&repo)).await;
    let confirm_path = route_utils::replace_param(v1::orders::CONFIRM, "{id}", id_of(&order));

    // Still unpaid at the provider.
    let unpaid: Value = app
        .server
        .post(&confirm_path)
        .add_header("Authorization", buyer.auth())
        .await
        .json();
    assert_eq!(unpaid["data"]["order"]["status"], "pending");
    assert_eq!(unpaid["data"]["settled_now"], false);

    let paid = app.purchase_existing(&buyer, &order).await;
    assert_eq!(paid["status"], "paid");

    let orders: Value = app
        .server
        .get(v1::orders::COLLECTION)
        .add_header("Authorization", buyer.auth())
        .await
        .json();
    assert_eq!(orders["data"].as_array().map(Vec::len), Some(1));

    // Other buyers cannot see the order.
    let stranger = app.register("stranger").await;
    app.server
        .get(&route_utils::replace_param(v1::orders::ITEM, "{id}", id_of(&order)))
        .add_header("Authorization", stranger.auth())
        .await
        .assert_status(StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn free_listings_are_granted_without_payment() -> Result<()> {
    let app = build_test_app()?;
    let seller = app.seller("giver").await;
    let buyer = app.register("taker").await;
    let repo = app.list_repo(&seller, "Free Utils", 0).await;

    let response: Value = app
        .server
        .post(v1::orders::CHECKOUT)
        .add_header("Authorization", buyer.auth())
        .json(&json!({ "repo_id": repo["id"] }))
        .await
        .json();
    assert_eq!(response["data"]["kind"], "granted");
    assert_eq!(app.gateway.intent_count(), 0);

    let library: Value = app
        .server
        .get(v1::repos::LIBRARY)
        .add_header("Authorization", buyer.auth())
        .await
        .json();
    assert_eq!(library["data"][0]["id"], repo["id"]);
    Ok(())
}

#[tokio::test]
async fn refund_revokes_access() -> Result<()> {
    let app = build_test_app()?;
    let seller = app.seller("vendor").await;
    let buyer = app.register("customer").await;
    let admin = app.staff("billing-admin", UserRole::Admin).await;
    let repo = app.list_repo(&seller, "Async Book", 3_000).await;
    let order = app.purchase(&buyer, &id_of(&repo)).await;

    let refund_path = route_utils::replace_param(v1::admin::ORDER_REFUND, "{id}", id_of(&order));
    app.server
        .post(&refund_path)
        .add_header("Authorization", buyer.auth())
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let refunded: Value = app
        .server
        .post(&refund_path)
        .add_header("Authorization", admin.auth())
        .await
        .json();
    assert_eq!(refunded["data"]["status"], "refunded");

    let library: Value = app
        .server
        .get(v1::repos::LIBRARY)
        .add_header("Authorization", buyer.auth())
        .await
        .json();
    assert_eq!(library["data"].as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn private_listings_are_hidden_from_strangers() -> Result<()> {
    let app = build_test_app()?;
    let seller = app.seller("hermit").await;
    let repo = app.list_repo(&seller, "Secret Sauce", 1_500).await;
    let item = route_utils::replace_param(v1::repos::ITEM, "{id}", id_of(&repo));

    app.server
        .patch(&item)
        .add_header("Authorization", seller.auth())
        .json(&json!({ "visibility": "private" }))
        .await
        .assert_status_ok();

    app.server.get(&item).await.assert_status(StatusCode::NOT_FOUND);
    app.server
        .get(&item)
        .add_header("Authorization", seller.auth())
        .await
        .assert_status_ok();

    let buyer = app.register("curious").await;
    app.server
        .post(v1::orders::CHECKOUT)
        .add_header("Authorization", buyer.auth())
        .json(&json!({ "repo_id": repo["id"] }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    // Buyers cannot list repositories.
    app.server
        .post(v1::repos::COLLECTION)
        .add_header("Authorization", buyer.auth())
        .json(&json!({ "title": "Nope", "language": "Rust", "price": 500 }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn anonymous_search_sees_public_listings() -> Result<()> {
    let app = build_test_app()?;
    let seller = app.seller("indexer").await;
    app.list_repo(&seller, "Rust Web Starter", 1_200).await;
    app.list_repo(&seller, "Go Web Starter", 900).await;

    let page: Value = app
        .server
        .get(&route_utils::with_query(
            v1::repos::COLLECTION,
            &[("q", "starter"), ("sort", "price_asc")],
        ))
        .await
        .json();
    assert_eq!(page["data"]["total"], 2);
    assert_eq!(page["data"]["items"][0]["title"], "Go Web Starter");

    let storefront: Value = app
        .server
        .get(&route_utils::replace_param(
            v1::sellers::STOREFRONT,
            "{store_name}",
            "indexer-store",
        ))
        .await
        .json();
    assert_eq!(storefront["data"]["repositories"].as_array().map(Vec::len), Some(2));
    Ok(())
}
