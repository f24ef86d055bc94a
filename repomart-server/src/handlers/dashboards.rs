use axum::{
    Extension, Json,
    extract::{Query, State},
};
use repomart_model::ApiResponse;
use repomart_model::dashboard::{
    AdminOverview, DailySales, ModerationQueue, TopRepository, TopSeller,
};
use serde::Deserialize;

use super::LimitQuery;
use crate::infra::{app_state::AppState, errors::AppResult};
use crate::middleware::CurrentUser;

const DEFAULT_TOP_LIMIT: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct SalesQuery {
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    30
}

pub async fn overview(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<AdminOverview>>> {
    let overview = state.market().dashboards.overview(&current.user).await?;
    Ok(Json(ApiResponse::success(overview)))
}

pub async fn sales_by_day(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<SalesQuery>,
) -> AppResult<Json<ApiResponse<Vec<DailySales>>>> {
    let sales = state
        .market()
        .dashboards
        .sales_by_day(&current.user, query.days)
        .await?;
    Ok(Json(ApiResponse::success(sales)))
}

pub async fn top_sellers(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<ApiResponse<Vec<TopSeller>>>> {
    let sellers = state
        .market()
        .dashboards
        .top_sellers(&current.user, query.limit.unwrap_or(DEFAULT_TOP_LIMIT))
        .await?;
    Ok(Json(ApiResponse::success(sellers)))
}

pub async fn top_repositories(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<ApiResponse<Vec<TopRepository>>>> {
    let repos = state
        .market()
        .dashboards
        .top_repositories(&current.user, query.limit.unwrap_or(DEFAULT_TOP_LIMIT))
        .await?;
    Ok(Json(ApiResponse::success(repos)))
}

pub async fn moderation_queue(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<ModerationQueue>>> {
    let queue = state
        .market()
        .dashboards
        .moderation_queue(&current.user)
        .await?;
    Ok(Json(ApiResponse::success(queue)))
}
