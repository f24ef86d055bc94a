pub mod auth;
pub mod catalog;
pub mod community;
pub mod dashboards;
pub mod health;
pub mod orders;
pub mod payouts;
pub mod search_history;
pub mod sellers;
pub mod users;

use axum::http::HeaderMap;
use repomart_core::auth::SessionMeta;
use serde::Deserialize;

/// Client details recorded alongside a new session.
pub(crate) fn session_meta(headers: &HeaderMap) -> SessionMeta {
    let header_str = |name: &'static str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    SessionMeta {
        user_agent: header_str("user-agent"),
        ip_address: header_str("x-forwarded-for")
            .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
            .or_else(|| header_str("x-real-ip")),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}
