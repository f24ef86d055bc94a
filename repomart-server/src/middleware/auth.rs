use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use repomart_core::error::CoreError;
use repomart_model::{ApiResponse, SessionId, User};
use tracing::warn;

use crate::infra::app_state::AppState;
use crate::infra::errors::AppError;

pub const SESSION_COOKIE: &str = "repomart_session";

/// The authenticated caller, inserted into request extensions by
/// [`session_layer`] and [`optional_session_layer`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub session_id: SessionId,
    pub token: String,
}

/// Roles a route group can demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleGate {
    Seller,
    /// Moderators and admins.
    Moderator,
    Admin,
}

impl RoleGate {
    pub fn allows(self, user: &User) -> bool {
        match self {
            RoleGate::Seller => user.role.is_seller(),
            RoleGate::Moderator => user.role.can_moderate(),
            RoleGate::Admin => user.role.is_admin(),
        }
    }

    fn denial(self) -> &'static str {
        match self {
            RoleGate::Seller => "Seller access required",
            RoleGate::Moderator => "Moderator access required",
            RoleGate::Admin => "Admin access required",
        }
    }
}

pub async fn session_layer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_session_token(request.headers())
        .ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let current = resolve(&state, token).await?;
    request.extensions_mut().insert(current);

    Ok(next.run(request).await)
}

pub async fn optional_session_layer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_session_token(request.headers()) {
        match resolve(&state, token).await {
            Ok(current) => {
                request.extensions_mut().insert(current);
            }
            Err(err) if err.status == StatusCode::INTERNAL_SERVER_ERROR => {
                warn!(error = %err, "session lookup failed; continuing anonymously");
            }
            Err(_) => {}
        }
    }

    next.run(request).await
}

/// Role-gated middleware, layered inside [`session_layer`].
pub async fn require_role(
    State(gate): State<RoleGate>,
    request: Request,
    next: Next,
) -> Response {
    let Some(current) = request.extensions().get::<CurrentUser>() else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::<()>::error(
                "Authentication required".to_string(),
            )),
        )
            .into_response();
    };

    if !gate.allows(&current.user) {
        return (
            StatusCode::FORBIDDEN,
            Json(ApiResponse::<()>::error(gate.denial().to_string())),
        )
            .into_response();
    }

    next.run(request).await
}

async fn resolve(state: &AppState, token: String) -> Result<CurrentUser, AppError> {
    let session = state
        .market()
        .auth
        .validate_session(&token)
        .await
        .map_err(|err| match err {
            CoreError::Forbidden(msg) => AppError::forbidden(msg),
            CoreError::Database(_) | CoreError::Internal(_) => AppError::from(err),
            _ => AppError::unauthorized("Invalid or expired session"),
        })?;

    Ok(CurrentUser {
        user: session.user,
        session_id: session.session.id,
        token,
    })
}

/// Session token from `Authorization: Bearer` or the session cookie.
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        && let Some(token) = value.strip_prefix("Bearer ")
        && !token.trim().is_empty()
    {
        return Some(token.trim().to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value carrying a fresh session token.
pub fn session_cookie(token: &str, max_age_seconds: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that expires the session cookie.
pub fn cleared_session_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; repomart_session=xyz"),
        );
        assert_eq!(extract_session_token(&headers).as_deref(), Some("abc"));

        headers.remove(header::AUTHORIZATION);
        assert_eq!(extract_session_token(&headers).as_deref(), Some("xyz"));

        headers.insert(header::COOKIE, HeaderValue::from_static("repomart_session="));
        assert_eq!(extract_session_token(&headers), None);
    }

    #[test]
    fn session_cookie_attributes() {
        let cookie = session_cookie("tok", 3600, true);
        assert_eq!(
            cookie,
            "repomart_session=tok; HttpOnly; SameSite=Lax; Path=/; Max-Age=3600; Secure"
        );
        assert!(cleared_session_cookie(false).contains("Max-Age=0"));
    }
}
