use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use repomart_core::error::CoreError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.message,
                "status": self.status.as_u16(),
            }
        }));

        (self.status, body).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(msg) => Self::not_found(msg),
            CoreError::Conflict(msg) => Self::conflict(msg),
            CoreError::Validation(msg) => Self::bad_request(msg),
            CoreError::Unauthorized(msg) => Self::unauthorized(msg),
            CoreError::Forbidden(msg) => Self::forbidden(msg),
            CoreError::Payment(msg) => Self::new(StatusCode::PAYMENT_REQUIRED, msg),
            CoreError::Payout(rejection) => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, rejection.to_string())
            }
            CoreError::Database(msg) => {
                tracing::error!(error = %msg, "database operation failed");
                Self::internal("Database operation failed")
            }
            CoreError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                Self::internal("Internal server error")
            }
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repomart_core::payouts::policy::PayoutRejection;

    #[test]
    fn core_errors_map_to_statuses() {
        let cases = [
            (CoreError::not_found("Order"), StatusCode::NOT_FOUND),
            (CoreError::Conflict("dup".into()), StatusCode::CONFLICT),
            (CoreError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (CoreError::Unauthorized("who".into()), StatusCode::UNAUTHORIZED),
            (CoreError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (CoreError::Payment("declined".into()), StatusCode::PAYMENT_REQUIRED),
            (
                CoreError::Payout(PayoutRejection::RequestAlreadyPending),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (CoreError::Database("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status, status);
        }
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let err = AppError::from(CoreError::Database("relation users missing".into()));
        assert_eq!(err.message, "Database operation failed");
    }
}
