use async_trait::async_trait;
use chrono::{DateTime, Utc};
use repomart_model::{SessionId, UserId};
use sqlx::PgPool;

use super::rows::{SESSION_COLUMNS, SessionRow};
use crate::database::ports::sessions::{SessionRecord, SessionsRepository};
use crate::error::Result;

#[derive(Clone, Debug)]
pub struct PostgresSessionsRepository {
    pool: PgPool,
}

impl PostgresSessionsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionsRepository for PostgresSessionsRepository {
    async fn create_session(&self, session: &SessionRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (
                id, user_id, token_hash, created_at, expires_at,
                last_seen_at, revoked, user_agent, ip_address
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(session.id.to_uuid())
        .bind(session.user_id.to_uuid())
        .bind(&session.token_hash)
        .bind(session.created_at)
        .bind(session.expires_at)
        .bind(session.last_seen_at)
        .bind(session.revoked)
        .bind(&session.user_agent)
        .bind(&session.ip_address)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<SessionRecord>> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE token_hash = $1"
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn touch_session(
        &self,
        id: SessionId,
        last_seen_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE sessions SET last_seen_at = $2, expires_at = $3 WHERE id = $1",
        )
        .bind(id.to_uuid())
        .bind(last_seen_at)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn revoke_session(&self, token_hash: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE sessions SET revoked = TRUE WHERE token_hash = $1 AND NOT revoked",
        )
        .bind(token_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn revoke_user_sessions(
        &self,
        user_id: UserId,
        keep: Option<SessionId>,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE sessions SET revoked = TRUE
            WHERE user_id = $1
              AND NOT revoked
              AND ($2::uuid IS NULL OR id <> $2)
            "#,
        )
        .bind(user_id.to_uuid())
        .bind(keep.map(|id| id.to_uuid()))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM sessions WHERE revoked OR expires_at <= $1")
                .bind(now)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}
