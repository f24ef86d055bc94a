use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use repomart_model::{ApiResponse, SearchEntryId, SearchHistoryEntry, TrendingQuery};
use serde::Deserialize;
use serde_json::{Value, json};

use super::LimitQuery;
use crate::infra::{app_state::AppState, errors::AppResult};
use crate::middleware::CurrentUser;

pub async fn recent(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<ApiResponse<Vec<SearchHistoryEntry>>>> {
    let entries = state
        .market()
        .search_history
        .recent(&current.user, query.limit)
        .await?;
    Ok(Json(ApiResponse::success(entries)))
}

pub async fn clear(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<Value>>> {
    let removed = state.market().search_history.clear(&current.user).await?;
    Ok(Json(ApiResponse::success(json!({ "removed": removed }))))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(entry_id): Path<SearchEntryId>,
) -> AppResult<StatusCode> {
    state
        .market()
        .search_history
        .delete_entry(&current.user, entry_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct TrendingParams {
    #[serde(default = "default_days")]
    pub days: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_days() -> i64 {
    7
}

fn default_limit() -> i64 {
    10
}

pub async fn trending(
    State(state): State<AppState>,
    Query(params): Query<TrendingParams>,
) -> AppResult<Json<ApiResponse<Vec<TrendingQuery>>>> {
    let trending = state
        .market()
        .search_history
        .trending(params.days, params.limit)
        .await?;
    Ok(Json(ApiResponse::success(trending)))
}
