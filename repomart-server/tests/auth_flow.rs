use anyhow::Result;
use axum::http::StatusCode;
use repomart_model::routes::v1;
use serde_json::{Value, json};

#[path = "support/mod.rs"]
mod support;
use support::{PASSWORD, bearer, build_test_app};

#[tokio::test]
async fn register_sets_session_cookie_and_bearer_token() -> Result<()> {
    let app = build_test_app()?;

    let response = app
        .server
        .post(v1::auth::REGISTER)
        .json(&json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": PASSWORD,
            "display_name": "Alice",
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let cookie = response.header("set-cookie");
    let cookie = cookie.to_str()?;
    assert!(cookie.starts_with("repomart_session="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains(&format!("Max-Age={}", 72 * 3600)));

    let body: Value = response.json();
    assert_eq!(body["data"]["user"]["role"], "buyer");
    let token = body["data"]["session_token"].as_str().unwrap_or_default();

    let me = app
        .server
        .get(v1::auth::ME)
        .add_header("Authorization", bearer(token))
        .await;
    me.assert_status_ok();
    let me: Value = me.json();
    assert_eq!(me["data"]["username"], "alice");

    let via_cookie = app
        .server
        .get(v1::auth::ME)
        .add_header("Cookie", format!("repomart_session={token}"))
        .await;
    via_cookie.assert_status_ok();
    Ok(())
}

#[tokio::test]
async fn duplicate_and_invalid_registrations_are_rejected() -> Result<()> {
    let app = build_test_app()?;
    app.register("bob").await;

    app.server
        .post(v1::auth::REGISTER)
        .json(&json!({
            "username": "BOB",
            "email": "other@example.com",
            "password": PASSWORD,
        }))
        .await
        .assert_status(StatusCode::CONFLICT);

    app.server
        .post(v1::auth::REGISTER)
        .json(&json!({
            "username": "carol",
            "email": "carol@example.com",
            "password": "short",
        }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn login_accepts_username_or_email() -> Result<()> {
    let app = build_test_app()?;
    app.register("dave").await;

    for login in ["dave", "dave@example.com"] {
        app.server
            .post(v1::auth::LOGIN)
            .json(&json!({ "login": login, "password": PASSWORD }))
            .await
            .assert_status_ok();
    }

    let wrong = app
        .server
        .post(v1::auth::LOGIN)
        .json(&json!({ "login": "dave", "password": "not-the-password1" }))
        .await;
    wrong.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = wrong.json();
    assert_eq!(body["error"]["status"], 401);
    Ok(())
}

#[tokio::test]
async fn logout_revokes_only_the_current_session() -> Result<()> {
    let app = build_test_app()?;
    let first = app.register("erin").await;

    let login = app
        .server
        .post(v1::auth::LOGIN)
        .json(&json!({ "login": "erin", "password": PASSWORD }))
        .await;
    let body: Value = login.json();
    let second = body["data"]["session_token"]
        .as_str()
        .unwrap_or_default()
        .to_string();

    app.server
        .post(v1::auth::LOGOUT)
        .add_header("Authorization", first.auth())
        .await
        .assert_status(StatusCode::NO_CONTENT);

    app.server
        .get(v1::auth::ME)
        .add_header("Authorization", first.auth())
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    app.server
        .get(v1::auth::ME)
        .add_header("Authorization", bearer(&second))
        .await
        .assert_status_ok();

    let all = app
        .server
        .post(v1::auth::LOGOUT_ALL)
        .add_header("Authorization", bearer(&second))
        .await;
    all.assert_status_ok();
    app.server
        .get(v1::auth::ME)
        .add_header("Authorization", bearer(&second))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn password_change_keeps_current_session_and_drops_others() -> Result<()> {
    let app = build_test_app()?;
    let current = app.register("frank").await;
    let other = app
        .server
        .post(v1::auth::LOGIN)
        .json(&json!({ "login": "frank", "password": PASSWORD }))
        .await
        .json::<Value>()["data"]["session_token"]
        .as_str()
        .unwrap_or_default()
        .to_string();

    app.server
        .put(v1::auth::CHANGE_PASSWORD)
        .add_header("Authorization", current.auth())
        .json(&json!({
            "current_password": PASSWORD,
            "new_password": "new-password-456",
        }))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    app.server
        .get(v1::auth::ME)
        .add_header("Authorization", current.auth())
        .await
        .assert_status_ok();
    app.server
        .get(v1::auth::ME)
        .add_header("Authorization", bearer(&other))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    app.server
        .post(v1::auth::LOGIN)
        .json(&json!({ "login": "frank", "password": "new-password-456" }))
        .await
        .assert_status_ok();
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_session() -> Result<()> {
    let app = build_test_app()?;

    app.server
        .get(v1::auth::ME)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    app.server
        .get(v1::auth::ME)
        .add_header("Authorization", bearer("not-a-real-token"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    app.server.get("/ping").await.assert_text("pong");
    let health: Value = app.server.get("/health").await.json();
    assert_eq!(health["database"]["backend"], "memory");
    assert_eq!(health["payments"], "manual");
    Ok(())
}
