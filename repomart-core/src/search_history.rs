//! Per-user search history and cross-user trending queries.

use std::sync::Arc;

use chrono::Duration;
use repomart_model::{SearchEntryId, SearchHistoryEntry, TrendingQuery, User};

use crate::application::unit_of_work::AppUnitOfWork;
use crate::clock::Clock;
use crate::error::{CoreError, Result};

const DEFAULT_RECENT: i64 = 20;
const MAX_QUERY_LEN: usize = 200;

/// Trim, collapse inner whitespace and lower-case. Overlong queries are
/// truncated on a character boundary.
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .chars()
        .take(MAX_QUERY_LEN)
        .collect()
}

#[derive(Debug, Clone)]
pub struct SearchHistoryService {
    uow: Arc<AppUnitOfWork>,
    clock: Arc<dyn Clock>,
    cap: i64,
}

impl SearchHistoryService {
    pub fn new(uow: Arc<AppUnitOfWork>, clock: Arc<dyn Clock>, cap: i64) -> Self {
        Self { uow, clock, cap }
    }

    /// Store a search. Blank queries are ignored and yield `None`.
    pub async fn record(
        &self,
        user: &User,
        query: &str,
        filters: serde_json::Value,
    ) -> Result<Option<SearchHistoryEntry>> {
        let normalized = normalize_query(query);
        if normalized.is_empty() {
            return Ok(None);
        }
        let entry = self
            .uow
            .search_history
            .record(user.id, &normalized, &filters, self.clock.now(), self.cap)
            .await?;
        Ok(Some(entry))
    }

    pub async fn recent(
        &self,
        user: &User,
        limit: Option<i64>,
    ) -> Result<Vec<SearchHistoryEntry>> {
        let limit = limit.unwrap_or(DEFAULT_RECENT).clamp(1, self.cap.max(1));
        self.uow.search_history.recent(user.id, limit).await
    }

    pub async fn clear(&self, user: &User) -> Result<u64> {
        self.uow.search_history.clear(user.id).await
    }

    pub async fn delete_entry(&self, user: &User, id: SearchEntryId) -> Result<()> {
        if self.uow.search_history.delete_entry(user.id, id).await? {
            Ok(())
        } else {
            Err(CoreError::not_found("Search history entry"))
        }
    }

    /// Most frequent queries over the last `days` days.
    pub async fn trending(&self, days: i64, limit: i64) -> Result<Vec<TrendingQuery>> {
        let since = self.clock.now() - Duration::days(days.clamp(1, 365));
        self.uow
            .search_history
            .trending(since, limit.clamp(1, 100))
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::test_support::TestMarket;

    #[test]
    fn normalizes_queries() {
        assert_eq!(normalize_query("  Async   RUNTIME \t"), "async runtime");
        assert_eq!(normalize_query("   "), "");
        assert_eq!(normalize_query(&"x".repeat(500)).len(), MAX_QUERY_LEN);
    }

    #[tokio::test]
    async fn consecutive_duplicates_move_timestamp() {
        let market = TestMarket::new();
        let user = market.buyer("hist").await;

        let first = market.search_history.record(&user, "Parser", json!({})).await.unwrap().unwrap();
        market.clock.advance(Duration::minutes(5));
        let again = market.search_history.record(&user, " parser ", json!({})).await.unwrap().unwrap();
        assert_eq!(first.id, again.id);
        assert!(again.searched_at > first.searched_at);

        market.search_history.record(&user, "codec", json!({})).await.unwrap();
        market.search_history.record(&user, "parser", json!({})).await.unwrap();

        let recent = market.search_history.recent(&user, Some(10)).await.unwrap();
        let queries: Vec<_> = recent.iter().map(|e| e.query.as_str()).collect();
        assert_eq!(queries, ["parser", "codec", "parser"]);
        assert!(market.search_history.record(&user, "  ", json!({})).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn history_is_capped() {
        let market = TestMarket::new();
        let user = market.buyer("capped").await;
        for i in 0..55 {
            market.clock.advance(Duration::seconds(1));
            market
                .search_history
                .record(&user, &format!("query {i}"), json!({}))
                .await
                .unwrap();
        }
        let recent = market.search_history.recent(&user, Some(100)).await.unwrap();
        assert_eq!(recent.len(), 50);
        assert_eq!(recent[0].query, "query 54");
        assert_eq!(recent[49].query, "query 5");
    }

    #[tokio::test]
    async fn delete_clear_and_trending() {
        let market = TestMarket::new();
        let a = market.buyer("alpha").await;
        let b = market.buyer("bravo").await;
        for (user, q) in [(&a, "rust"), (&b, "rust"), (&b, "go"), (&a, "rust cli")] {
            market.clock.advance(Duration::seconds(1));
            market.search_history.record(user, q, json!({})).await.unwrap();
        }

        let trending = market.search_history.trending(7, 10).await.unwrap();
        assert_eq!(trending[0], TrendingQuery { query: "rust".into(), searches: 2 });

        let entries = market.search_history.recent(&a, None).await.unwrap();
        market.search_history.delete_entry(&a, entries[0].id).await.unwrap();
        assert!(matches!(
            market.search_history.delete_entry(&b, entries[1].id).await,
            Err(CoreError::NotFound(_))
        ));
        assert_eq!(market.search_history.clear(&a).await.unwrap(), 1);
        assert!(market.search_history.recent(&a, None).await.unwrap().is_empty());
    }
}
