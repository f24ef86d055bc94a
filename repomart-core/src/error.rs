use repomart_model::ModelError;
use thiserror::Error;

use crate::auth::crypto::AuthCryptoError;
use crate::payouts::policy::PayoutRejection;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Payout rejected: {0}")]
    Payout(#[from] PayoutRejection),

    #[error("Payment provider error: {0}")]
    Payment(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        CoreError::NotFound(what.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        CoreError::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        CoreError::Conflict(message.into())
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error()
            && db_err.is_unique_violation()
        {
            let message = match db_err.constraint() {
                Some("users_username_lower_key") => "Username already exists",
                Some("users_email_lower_key") => "Email already exists",
                Some("seller_profiles_store_name_lower_key") => {
                    "Store name already taken"
                }
                Some("seller_profiles_pkey") => "Already onboarded as a seller",
                Some("repositories_seller_slug_key") => {
                    "A repository with this slug already exists"
                }
                Some("orders_pending_buyer_repo_key") => {
                    "A pending order already exists for this repository"
                }
                Some(other) => return CoreError::Conflict(other.to_string()),
                None => "Duplicate record",
            };
            return CoreError::Conflict(message.to_string());
        }

        match err {
            sqlx::Error::RowNotFound => CoreError::NotFound("row".into()),
            other => CoreError::Database(other.to_string()),
        }
    }
}

impl From<ModelError> for CoreError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::InvalidValue { .. } => {
                CoreError::Validation(err.to_string())
            }
            ModelError::AmountOverflow => CoreError::Internal(err.to_string()),
        }
    }
}

impl From<AuthCryptoError> for CoreError {
    fn from(err: AuthCryptoError) -> Self {
        CoreError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Internal(format!("serialization error: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
