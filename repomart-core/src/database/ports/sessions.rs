use async_trait::async_trait;
use chrono::{DateTime, Utc};
use repomart_model::{SessionId, UserId};

use crate::error::Result;

/// Persisted login session. Only the HMAC of the token is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: SessionId,
    pub user_id: UserId,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub revoked: bool,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl SessionRecord {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }
}

#[async_trait]
pub trait SessionsRepository: Send + Sync {
    async fn create_session(&self, session: &SessionRecord) -> Result<()>;
    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<SessionRecord>>;
    async fn touch_session(
        &self,
        id: SessionId,
        last_seen_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;
    /// Revoke by token hash. Returns whether an active session was revoked.
    async fn revoke_session(&self, token_hash: &str) -> Result<bool>;
    /// Revoke every session of a user, optionally keeping one.
    async fn revoke_user_sessions(
        &self,
        user_id: UserId,
        keep: Option<SessionId>,
    ) -> Result<u64>;
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}
