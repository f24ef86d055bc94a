use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::infra::app_state::AppState;

pub async fn ping_handler() -> &'static str {
    "pong"
}

pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let database = match &state.postgres {
        Some(db) => {
            let stats = db.pool_stats();
            let reachable = sqlx::query_scalar::<_, i32>("SELECT 1")
                .fetch_one(db.pool())
                .await
                .is_ok();
            json!({
                "backend": "postgres",
                "reachable": reachable,
                "pool": {
                    "size": stats.size,
                    "idle": stats.idle,
                    "max_size": stats.max_size,
                    "min_idle": stats.min_idle,
                },
            })
        }
        None => json!({ "backend": "memory", "reachable": true }),
    };

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "payments": state.market().gateway.name(),
        "database": database,
    }))
}
