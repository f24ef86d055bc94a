use async_trait::async_trait;
use chrono::{DateTime, Utc};
use repomart_model::{SearchEntryId, SearchHistoryEntry, TrendingQuery, UserId};

use crate::error::Result;

#[async_trait]
pub trait SearchHistoryRepository: Send + Sync {
    /// Append a normalized query. When it equals the user's most recent
    /// entry only the timestamp moves. Entries beyond `cap` are pruned,
    /// oldest first.
    async fn record(
        &self,
        user_id: UserId,
        query: &str,
        filters: &serde_json::Value,
        at: DateTime<Utc>,
        cap: i64,
    ) -> Result<SearchHistoryEntry>;
    async fn recent(&self, user_id: UserId, limit: i64) -> Result<Vec<SearchHistoryEntry>>;
    async fn clear(&self, user_id: UserId) -> Result<u64>;
    async fn delete_entry(&self, user_id: UserId, id: SearchEntryId) -> Result<bool>;
    async fn trending(&self, since: DateTime<Utc>, limit: i64) -> Result<Vec<TrendingQuery>>;
}
