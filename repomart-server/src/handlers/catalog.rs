use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use repomart_model::{
    ApiResponse, CatalogQuery, Page, RepoDraft, RepoId, RepoListing, RepoPatch,
};

use crate::infra::{app_state::AppState, errors::AppResult};
use crate::middleware::CurrentUser;

pub async fn search(
    State(state): State<AppState>,
    current: Option<Extension<CurrentUser>>,
    Query(query): Query<CatalogQuery>,
) -> AppResult<Json<ApiResponse<Page<RepoListing>>>> {
    let viewer = current.as_ref().map(|Extension(c)| &c.user);
    let page = state.market().catalog.search(&query, viewer).await?;
    Ok(Json(ApiResponse::success(page)))
}

pub async fn get_repo(
    State(state): State<AppState>,
    current: Option<Extension<CurrentUser>>,
    Path(repo_id): Path<RepoId>,
) -> AppResult<Json<ApiResponse<RepoListing>>> {
    let viewer = current.as_ref().map(|Extension(c)| &c.user);
    let repo = state.market().catalog.get(repo_id, viewer).await?;
    Ok(Json(ApiResponse::success(repo)))
}

pub async fn create_repo(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(draft): Json<RepoDraft>,
) -> AppResult<(StatusCode, Json<ApiResponse<RepoListing>>)> {
    let repo = state.market().catalog.create(&current.user, draft).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(repo))))
}

pub async fn update_repo(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(repo_id): Path<RepoId>,
    Json(patch): Json<RepoPatch>,
) -> AppResult<Json<ApiResponse<RepoListing>>> {
    let repo = state
        .market()
        .catalog
        .update(&current.user, repo_id, patch)
        .await?;
    Ok(Json(ApiResponse::success(repo)))
}

/// Deletes the listing, or hides it when buyers still hold access.
pub async fn delete_repo(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(repo_id): Path<RepoId>,
) -> AppResult<Json<ApiResponse<Option<RepoListing>>>> {
    let retained = state.market().catalog.delete(&current.user, repo_id).await?;
    let message = if retained.is_some() {
        "Repository has buyers and was made private"
    } else {
        "Repository deleted"
    };
    Ok(Json(ApiResponse::success(retained).with_message(message)))
}

pub async fn library(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<Vec<RepoListing>>>> {
    let owned = state.market().catalog.list_owned(&current.user).await?;
    Ok(Json(ApiResponse::success(owned)))
}
