use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use repomart_model::dashboard::SellerDashboard;
use repomart_model::seller::{OnboardRequest, UpdateSellerRequest};
use repomart_model::{ApiResponse, RepoListing, SellerProfile, Storefront};

use crate::infra::{app_state::AppState, errors::AppResult};
use crate::middleware::CurrentUser;

pub async fn onboard(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<OnboardRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<SellerProfile>>)> {
    let profile = state.market().sellers.onboard(&current.user, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(profile))))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<SellerProfile>>> {
    let profile = state.market().sellers.get_profile(&current.user).await?;
    Ok(Json(ApiResponse::success(profile)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<UpdateSellerRequest>,
) -> AppResult<Json<ApiResponse<SellerProfile>>> {
    let profile = state
        .market()
        .sellers
        .update_profile(&current.user, request)
        .await?;
    Ok(Json(ApiResponse::success(profile)))
}

pub async fn dashboard(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<SellerDashboard>>> {
    let dashboard = state
        .market()
        .dashboards
        .seller_dashboard(&current.user)
        .await?;
    Ok(Json(ApiResponse::success(dashboard)))
}

pub async fn my_listings(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<Vec<RepoListing>>>> {
    let listings = state.market().catalog.list_mine(&current.user).await?;
    Ok(Json(ApiResponse::success(listings)))
}

pub async fn storefront(
    State(state): State<AppState>,
    Path(store_name): Path<String>,
) -> AppResult<Json<ApiResponse<Storefront>>> {
    let storefront = state
        .market()
        .sellers
        .public_storefront(&store_name)
        .await?;
    Ok(Json(ApiResponse::success(storefront)))
}
