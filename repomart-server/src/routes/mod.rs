pub mod v1;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::get,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;
use crate::handlers::health;

/// Create the main API router with all versions
pub fn create_api_router(state: AppState) -> Router<AppState> {
    v1::create_v1_router(state)
}

/// Full application: versioned API, health probes, CORS and request tracing.
pub fn create_app(state: AppState) -> Router {
    let cors_layer = build_cors(&state.config().cors_allowed_origins);

    Router::new()
        .route("/ping", get(health::ping_handler))
        .route("/health", get(health::health_handler))
        .merge(create_api_router(state.clone()))
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Allow-list CORS for the configured origins; permissive when none are set.
fn build_cors(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|s| HeaderValue::from_str(s).ok())
        .collect();

    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
