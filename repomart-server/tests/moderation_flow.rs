use anyhow::Result;
use axum::http::StatusCode;
use repomart_model::UserRole;
use repomart_model::routes::{utils as route_utils, v1};
use serde_json::{Value, json};

#[path = "support/mod.rs"]
mod support;
use support::build_test_app;

fn path(route: &str, id: &Value) -> String {
    route_utils::replace_param(route, "{id}", id.as_str().unwrap_or_default())
}

#[tokio::test]
async fn flagged_comments_are_hidden_until_reverted() -> Result<()> {
    let app = build_test_app()?;
    let seller = app.seller("publisher").await;
    let author = app.register("commenter").await;
    let moderator = app.staff("warden", UserRole::Moderator).await;
    let repo = app.list_repo(&seller, "Lint Rules", 800).await;
    let comments_path = path(v1::repos::COMMENTS, &repo["id"]);

    let posted = app
        .server
        .post(&comments_path)
        .add_header("Authorization", author.auth())
        .json(&json!({ "body": "Does this support workspaces?" }))
        .await;
    posted.assert_status(StatusCode::CREATED);
    let comment: Value = posted.json();
    let comment_id = comment["data"]["id"].clone();

    // Only moderators may flag.
    app.server
        .post(&path(v1::comments::FLAG, &comment_id))
        .add_header("Authorization", author.auth())
        .json(&json!({ "reason": "spam" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let flagged: Value = app
        .server
        .post(&path(v1::comments::FLAG, &comment_id))
        .add_header("Authorization", moderator.auth())
        .json(&json!({ "reason": "off topic" }))
        .await
        .json();
    assert_eq!(flagged["data"]["is_flagged"], true);

    let public: Value = app.server.get(&comments_path).await.json();
    assert_eq!(public["data"].as_array().map(Vec::len), Some(0));

    let queue: Value = app
        .server
        .get(v1::moderation::QUEUE)
        .add_header("Authorization", moderator.auth())
        .await
        .json();
    assert_eq!(queue["data"]["comments"][0]["id"], comment_id);

    app.server
        .post(&path(v1::comments::UNFLAG, &comment_id))
        .add_header("Authorization", moderator.auth())
        .await
        .assert_status_ok();
    let public: Value = app.server.get(&comments_path).await.json();
    assert_eq!(public["data"][0]["id"], comment_id);
    Ok(())
}

#[tokio::test]
async fn profane_comments_are_held_for_review() -> Result<()> {
    let app = build_test_app()?;
    let seller = app.seller("host").await;
    let author = app.register("ranter").await;
    let repo = app.list_repo(&seller, "Build Scripts", 600).await;

    let comment: Value = app
        .server
        .post(&path(v1::repos::COMMENTS, &repo["id"]))
        .add_header("Authorization", author.auth())
        .json(&json!({ "body": "this is shit" }))
        .await
        .json();
    assert_eq!(comment["data"]["is_flagged"], true);

    // The author still sees their own held comment.
    let own: Value = app
        .server
        .get(&path(v1::repos::COMMENTS, &repo["id"]))
        .add_header("Authorization", author.auth())
        .await
        .json();
    assert_eq!(own["data"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn votes_replace_previous_direction() -> Result<()> {
    let app = build_test_app()?;
    let seller = app.seller("poller").await;
    let author = app.register("asker").await;
    let voter = app.register("voter").await;
    let repo = app.list_repo(&seller, "Vote Target", 700).await;

    let comment: Value = app
        .server
        .post(&path(v1::repos::COMMENTS, &repo["id"]))
        .add_header("Authorization", author.auth())
        .json(&json!({ "body": "Great docs" }))
        .await
        .json();
    let vote_path = path(v1::comments::VOTE, &comment["data"]["id"]);

    let up: Value = app
        .server
        .post(&vote_path)
        .add_header("Authorization", voter.auth())
        .json(&json!({ "direction": "up" }))
        .await
        .json();
    assert_eq!(up["data"]["upvotes"], 1);

    let down: Value = app
        .server
        .post(&vote_path)
        .add_header("Authorization", voter.auth())
        .json(&json!({ "direction": "down" }))
        .await
        .json();
    assert_eq!(down["data"]["upvotes"], 0);
    assert_eq!(down["data"]["downvotes"], 1);

    let cleared: Value = app
        .server
        .post(&vote_path)
        .add_header("Authorization", voter.auth())
        .json(&json!({ "direction": null }))
        .await
        .json();
    assert_eq!(cleared["data"]["downvotes"], 0);
    Ok(())
}

#[tokio::test]
async fn only_buyers_can_review() -> Result<()> {
    let app = build_test_app()?;
    let seller = app.seller("critiqued").await;
    let buyer = app.register("critic").await;
    let stranger = app.register("drive-by").await;
    let repo = app.list_repo(&seller, "Review Me", 1_100).await;
    let reviews_path = path(v1::repos::REVIEWS, &repo["id"]);

    app.server
        .put(&reviews_path)
        .add_header("Authorization", stranger.auth())
        .json(&json!({ "rating": 1 }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.purchase(&buyer, repo["id"].as_str().unwrap_or_default())
        .await;
    app.server
        .put(&reviews_path)
        .add_header("Authorization", buyer.auth())
        .json(&json!({ "rating": 6 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    app.server
        .put(&reviews_path)
        .add_header("Authorization", buyer.auth())
        .json(&json!({ "rating": 4, "body": "Solid" }))
        .await
        .assert_status_ok();

    let listing: Value = app
        .server
        .get(&path(v1::repos::ITEM, &repo["id"]))
        .await
        .json();
    assert_eq!(listing["data"]["rating_count"], 1);
    assert_eq!(listing["data"]["rating_avg"], 4.0);
    Ok(())
}

#[tokio::test]
async fn banned_users_lose_their_sessions() -> Result<()> {
    let app = build_test_app()?;
    let admin = app.staff("chief", UserRole::Admin).await;
    let troll = app.register("troll").await;
    let ban_path = route_utils::replace_param(v1::admin::USER_BAN, "{id}", troll.id.to_string());

    app.server
        .post(&ban_path)
        .add_header("Authorization", troll.auth())
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let banned: Value = app
        .server
        .post(&ban_path)
        .add_header("Authorization", admin.auth())
        .await
        .json();
    assert_eq!(banned["data"]["is_banned"], true);

    app.server
        .get(v1::auth::ME)
        .add_header("Authorization", troll.auth())
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    app.server
        .post(v1::auth::LOGIN)
        .json(&json!({ "login": "troll", "password": support::PASSWORD }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let users: Value = app
        .server
        .get(&route_utils::with_query(v1::admin::USERS, &[("banned", "true")]))
        .add_header("Authorization", admin.auth())
        .await
        .json();
    assert_eq!(users["data"][0]["username"], "troll");
    Ok(())
}
