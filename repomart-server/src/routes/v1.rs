use axum::{
    Router, middleware,
    routing::{delete, get, patch, post, put},
};

use repomart_model::routes::v1;

use crate::{
    AppState,
    handlers::{
        auth, catalog, community, dashboards, orders, payouts, search_history, sellers,
        users,
    },
    middleware::{RoleGate, optional_session_layer, require_role, session_layer},
};

/// Create all v1 API routes
pub fn create_v1_router(state: AppState) -> Router<AppState> {
    Router::new()
        // Public endpoints
        .route(v1::auth::REGISTER, post(auth::register))
        .route(v1::auth::LOGIN, post(auth::login))
        .route(v1::sellers::STOREFRONT, get(sellers::storefront))
        .route(v1::search::TRENDING, get(search_history::trending))
        .route(v1::orders::WEBHOOK, post(orders::webhook))
        .merge(create_browse_routes(state.clone()))
        .merge(create_protected_routes(state.clone()))
        .merge(create_seller_routes(state.clone()))
        .merge(create_moderator_routes(state.clone()))
        .merge(create_admin_routes(state))
}

/// Catalog reads that work anonymously but tailor results to a signed-in
/// viewer (private listings they own or bought, search history recording).
fn create_browse_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(v1::repos::COLLECTION, get(catalog::search))
        .route(v1::repos::ITEM, get(catalog::get_repo))
        .route(v1::repos::COMMENTS, get(community::list_comments))
        .route(v1::repos::REVIEWS, get(community::list_reviews))
        .route_layer(middleware::from_fn_with_state(state, optional_session_layer))
}

/// Create protected routes that require authentication
fn create_protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Session management
        .route(v1::auth::LOGOUT, post(auth::logout))
        .route(v1::auth::LOGOUT_ALL, post(auth::logout_all))
        .route(v1::auth::ME, get(auth::me))
        .route(v1::auth::CHANGE_PASSWORD, put(auth::change_password))
        .route(v1::sellers::ONBOARD, post(sellers::onboard))
        // Buyer library and search history
        .route(v1::repos::LIBRARY, get(catalog::library))
        .route(
            v1::search::HISTORY,
            get(search_history::recent).delete(search_history::clear),
        )
        .route(v1::search::HISTORY_ITEM, delete(search_history::delete_entry))
        // Checkout
        .route(v1::orders::CHECKOUT, post(orders::checkout))
        .route(v1::orders::COLLECTION, get(orders::list_orders))
        .route(v1::orders::ITEM, get(orders::get_order))
        .route(v1::orders::CONFIRM, post(orders::confirm))
        // Community
        .route(v1::repos::COMMENTS, post(community::post_comment))
        .route(
            v1::comments::ITEM,
            patch(community::edit_comment).delete(community::delete_comment),
        )
        .route(v1::comments::VOTE, post(community::vote_comment))
        .route(v1::repos::REVIEWS, put(community::submit_review))
        .route(v1::reviews::ITEM, delete(community::delete_review))
        .route_layer(middleware::from_fn_with_state(state, session_layer))
}

fn create_seller_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            v1::sellers::PROFILE,
            get(sellers::get_profile).patch(sellers::update_profile),
        )
        .route(v1::sellers::DASHBOARD, get(sellers::dashboard))
        .route(v1::sellers::LISTINGS, get(sellers::my_listings))
        .route(
            v1::sellers::PAYOUTS,
            get(payouts::my_payouts).post(payouts::request_payout),
        )
        .route(v1::sellers::LEDGER, get(payouts::ledger))
        .route(v1::repos::COLLECTION, post(catalog::create_repo))
        .route(
            v1::repos::ITEM,
            patch(catalog::update_repo).delete(catalog::delete_repo),
        )
        .route_layer(middleware::from_fn_with_state(RoleGate::Seller, require_role))
        .route_layer(middleware::from_fn_with_state(state, session_layer))
}

fn create_moderator_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(v1::moderation::QUEUE, get(dashboards::moderation_queue))
        .route(v1::comments::FLAG, post(community::flag_comment))
        .route(v1::comments::UNFLAG, post(community::unflag_comment))
        .route(v1::reviews::FLAG, post(community::flag_review))
        .route(v1::reviews::UNFLAG, post(community::unflag_review))
        .route_layer(middleware::from_fn_with_state(RoleGate::Moderator, require_role))
        .route_layer(middleware::from_fn_with_state(state, session_layer))
}

/// Create admin routes
fn create_admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(v1::admin::OVERVIEW, get(dashboards::overview))
        .route(v1::admin::SALES, get(dashboards::sales_by_day))
        .route(v1::admin::TOP_SELLERS, get(dashboards::top_sellers))
        .route(v1::admin::TOP_REPOSITORIES, get(dashboards::top_repositories))
        .route(v1::admin::USERS, get(users::list_users))
        .route(v1::admin::USER_ROLE, put(users::set_role))
        .route(v1::admin::USER_BAN, post(users::ban_user))
        .route(v1::admin::USER_UNBAN, post(users::unban_user))
        .route(v1::admin::PURGE_SESSIONS, post(users::purge_sessions))
        .route(v1::admin::PAYOUTS, get(payouts::pending_queue))
        .route(v1::admin::PAYOUT_APPROVE, post(payouts::approve))
        .route(v1::admin::PAYOUT_REJECT, post(payouts::reject))
        .route(v1::admin::ORDER_REFUND, post(orders::refund))
        .route_layer(middleware::from_fn_with_state(RoleGate::Admin, require_role))
        .route_layer(middleware::from_fn_with_state(state, session_layer))
}
