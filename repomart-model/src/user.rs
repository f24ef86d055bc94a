use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::UserId;

string_enum! {
    /// Account role. Every account holds exactly one.
    pub enum UserRole: "role" {
        Buyer => "buyer",
        Seller => "seller",
        Moderator => "moderator",
        Admin => "admin",
    }
}

impl UserRole {
    /// Moderators and admins share the moderation surface.
    pub fn can_moderate(&self) -> bool {
        matches!(self, UserRole::Moderator | UserRole::Admin)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    pub fn is_seller(&self) -> bool {
        matches!(self, UserRole::Seller)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    pub is_banned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginRequest {
    /// Username or email address.
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Returned by register/login; the token is also set as a cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user: User,
    pub session_token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SetRoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub search: Option<String>,
    pub banned: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trips_through_text() {
        for role in UserRole::ALL {
            assert_eq!(UserRole::from_str(role.as_str()).unwrap(), *role);
        }
        assert!(UserRole::from_str("owner").is_err());
    }

    #[test]
    fn admin_can_moderate() {
        assert!(UserRole::Admin.can_moderate());
        assert!(UserRole::Moderator.can_moderate());
        assert!(!UserRole::Seller.can_moderate());
    }
}
