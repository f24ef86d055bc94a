use async_trait::async_trait;
use chrono::{DateTime, Utc};
use repomart_model::user::UserFilter;
use repomart_model::{User, UserId, UserRole};

use crate::error::Result;

/// A user together with its stored credential.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
}

#[async_trait]
pub trait UsersRepository: Send + Sync {
    /// Insert a user and its password hash. Username and email are unique
    /// case-insensitively.
    async fn create_user(&self, user: &User, password_hash: &str) -> Result<()>;
    async fn get_user(&self, id: UserId) -> Result<Option<User>>;
    /// Lookup by username or email, case-insensitive.
    async fn find_credentials(&self, login: &str) -> Result<Option<Credentials>>;
    async fn get_password_hash(&self, id: UserId) -> Result<Option<String>>;
    async fn update_password(&self, id: UserId, password_hash: &str) -> Result<()>;
    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<()>;
    async fn set_role(&self, id: UserId, role: UserRole) -> Result<()>;
    async fn set_banned(&self, id: UserId, banned: bool) -> Result<()>;
    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>>;
}
