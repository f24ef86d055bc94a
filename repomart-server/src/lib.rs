//! HTTP surface of the Repomart marketplace: axum handlers, session
//! middleware and configuration over `repomart-core`.

#![allow(missing_docs)]

pub mod handlers;
pub mod infra;
pub mod middleware;
pub mod routes;

pub use infra::app_state::AppState;
pub use routes::create_app;
