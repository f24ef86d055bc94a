use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{SearchEntryId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHistoryEntry {
    pub id: SearchEntryId,
    pub user_id: UserId,
    pub query: String,
    pub filters: serde_json::Value,
    pub searched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingQuery {
    pub query: String,
    pub searches: i64,
}
