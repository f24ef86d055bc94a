use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use repomart_model::user::{SetRoleRequest, UserFilter};
use repomart_model::{ApiResponse, User, UserId};
use serde_json::{Value, json};
use tracing::info;

use crate::infra::{app_state::AppState, errors::{AppError, AppResult}};
use crate::middleware::CurrentUser;

pub async fn list_users(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(filter): Query<UserFilter>,
) -> AppResult<Json<ApiResponse<Vec<User>>>> {
    let users = state.market().users.list_users(&current.user, filter).await?;
    Ok(Json(ApiResponse::success(users)))
}

pub async fn set_role(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<UserId>,
    Json(request): Json<SetRoleRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let user = state
        .market()
        .users
        .set_role(&current.user, user_id, request.role)
        .await?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn ban_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<UserId>,
) -> AppResult<Json<ApiResponse<User>>> {
    let user = state.market().users.ban(&current.user, user_id).await?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn unban_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<UserId>,
) -> AppResult<Json<ApiResponse<User>>> {
    let user = state.market().users.unban(&current.user, user_id).await?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn purge_sessions(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<Value>>> {
    if !current.user.role.is_admin() {
        return Err(AppError::forbidden("Admin access required"));
    }
    let purged = state.market().auth.purge_expired_sessions().await?;
    info!(purged, admin_id = %current.user.id, "expired sessions purged");
    Ok(Json(ApiResponse::success(json!({ "purged": purged }))))
}
