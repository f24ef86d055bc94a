use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use repomart_model::user::{
    ChangePasswordRequest, LoginRequest, RegisterRequest, SessionResponse,
};
use repomart_model::{ApiResponse, User};

use super::session_meta;
use crate::infra::{app_state::AppState, errors::AppResult};
use crate::middleware::CurrentUser;
use crate::middleware::auth::{cleared_session_cookie, session_cookie};

fn with_session_cookie(
    state: &AppState,
    status: StatusCode,
    session: SessionResponse,
) -> Response {
    let cookie = session_cookie(
        &session.session_token,
        state.config().session_ttl_seconds(),
        state.config().cookie_secure,
    );
    (
        status,
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse::success(session)),
    )
        .into_response()
}

pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RegisterRequest>,
) -> AppResult<Response> {
    let session = state
        .market()
        .auth
        .register(request, session_meta(&headers))
        .await?;
    Ok(with_session_cookie(&state, StatusCode::CREATED, session))
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> AppResult<Response> {
    let session = state
        .market()
        .auth
        .login(request, session_meta(&headers))
        .await?;
    Ok(with_session_cookie(&state, StatusCode::OK, session))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Response> {
    state.market().auth.logout(&current.token).await?;
    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, cleared_session_cookie(state.config().cookie_secure))],
    )
        .into_response())
}

pub async fn logout_all(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Response> {
    let revoked = state.market().auth.logout_all(current.user.id).await?;
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cleared_session_cookie(state.config().cookie_secure))],
        Json(ApiResponse::success(revoked).with_message("All sessions revoked")),
    )
        .into_response())
}

pub async fn me(Extension(current): Extension<CurrentUser>) -> Json<ApiResponse<User>> {
    Json(ApiResponse::success(current.user))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<ChangePasswordRequest>,
) -> AppResult<StatusCode> {
    state
        .market()
        .auth
        .change_password(&current.user, Some(current.session_id), request)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
