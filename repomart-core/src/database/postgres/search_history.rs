use async_trait::async_trait;
use chrono::{DateTime, Utc};
use repomart_model::{SearchEntryId, SearchHistoryEntry, TrendingQuery, UserId};
use sqlx::{FromRow, PgPool};

use super::rows::{SEARCH_COLUMNS, SearchRow};
use crate::database::ports::search_history::SearchHistoryRepository;
use crate::error::Result;

#[derive(Clone, Debug)]
pub struct PostgresSearchHistoryRepository {
    pool: PgPool,
}

impl PostgresSearchHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct TrendingRow {
    query: String,
    searches: i64,
}

#[async_trait]
impl SearchHistoryRepository for PostgresSearchHistoryRepository {
    async fn record(
        &self,
        user_id: UserId,
        query: &str,
        filters: &serde_json::Value,
        at: DateTime<Utc>,
        cap: i64,
    ) -> Result<SearchHistoryEntry> {
        let mut tx = self.pool.begin().await?;

        // Serializes concurrent records of the same user.
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id.to_uuid())
            .execute(&mut *tx)
            .await?;

        let latest: Option<SearchRow> = sqlx::query_as(&format!(
            "SELECT {SEARCH_COLUMNS} FROM search_history WHERE user_id = $1 \
             ORDER BY searched_at DESC, id DESC LIMIT 1"
        ))
        .bind(user_id.to_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        let entry = match latest.map(SearchHistoryEntry::from) {
            Some(mut entry) if entry.query == query => {
                sqlx::query(
                    "UPDATE search_history SET searched_at = $2, filters = $3 WHERE id = $1",
                )
                .bind(entry.id.to_uuid())
                .bind(at)
                .bind(filters)
                .execute(&mut *tx)
                .await?;
                entry.searched_at = at;
                entry.filters = filters.clone();
                entry
            }
            _ => {
                let entry = SearchHistoryEntry {
                    id: SearchEntryId::new(),
                    user_id,
                    query: query.to_string(),
                    filters: filters.clone(),
                    searched_at: at,
                };
                sqlx::query(
                    "INSERT INTO search_history (id, user_id, query, filters, searched_at) \
                     VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(entry.id.to_uuid())
                .bind(user_id.to_uuid())
                .bind(&entry.query)
                .bind(&entry.filters)
                .bind(at)
                .execute(&mut *tx)
                .await?;

                sqlx::query(
                    r#"
                    DELETE FROM search_history
                    WHERE user_id = $1
                      AND id NOT IN (
                        SELECT id FROM search_history
                        WHERE user_id = $1
                        ORDER BY searched_at DESC, id DESC
                        LIMIT $2
                      )
                    "#,
                )
                .bind(user_id.to_uuid())
                .bind(cap)
                .execute(&mut *tx)
                .await?;
                entry
            }
        };

        tx.commit().await?;
        Ok(entry)
    }

    async fn recent(&self, user_id: UserId, limit: i64) -> Result<Vec<SearchHistoryEntry>> {
        let rows: Vec<SearchRow> = sqlx::query_as(&format!(
            "SELECT {SEARCH_COLUMNS} FROM search_history WHERE user_id = $1 \
             ORDER BY searched_at DESC, id DESC LIMIT $2"
        ))
        .bind(user_id.to_uuid())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn clear(&self, user_id: UserId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM search_history WHERE user_id = $1")
            .bind(user_id.to_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_entry(&self, user_id: UserId, id: SearchEntryId) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM search_history WHERE id = $1 AND user_id = $2")
                .bind(id.to_uuid())
                .bind(user_id.to_uuid())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn trending(&self, since: DateTime<Utc>, limit: i64) -> Result<Vec<TrendingQuery>> {
        let rows: Vec<TrendingRow> = sqlx::query_as(
            r#"
            SELECT query, COUNT(*) AS searches
            FROM search_history
            WHERE searched_at >= $1
            GROUP BY query
            ORDER BY searches DESC, query ASC
            LIMIT $2
            "#,
        )
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| TrendingQuery {
                query: r.query,
                searches: r.searches,
            })
            .collect())
    }
}
