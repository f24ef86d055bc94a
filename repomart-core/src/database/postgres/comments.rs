use async_trait::async_trait;
use repomart_model::{Comment, CommentId, RepoId, UserId, VoteDirection};
use sqlx::PgPool;

use super::rows::{COMMENT_COLUMNS, CommentRow};
use crate::database::ports::comments::CommentsRepository;
use crate::error::{CoreError, Result};

#[derive(Clone, Debug)]
pub struct PostgresCommentsRepository {
    pool: PgPool,
}

impl PostgresCommentsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn tally_delta(direction: Option<VoteDirection>) -> (i64, i64) {
    match direction {
        Some(VoteDirection::Up) => (1, 0),
        Some(VoteDirection::Down) => (0, 1),
        None => (0, 0),
    }
}

#[async_trait]
impl CommentsRepository for PostgresCommentsRepository {
    async fn insert_comment(&self, comment: &Comment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO comments (
                id, repo_id, author_id, parent_id, body, is_flagged,
                flag_reason, is_deleted, upvotes, downvotes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, 0, $9, $10)
            "#,
        )
        .bind(comment.id.to_uuid())
        .bind(comment.repo_id.to_uuid())
        .bind(comment.author_id.to_uuid())
        .bind(comment.parent_id.map(|id| id.to_uuid()))
        .bind(&comment.body)
        .bind(comment.is_flagged)
        .bind(&comment.flag_reason)
        .bind(comment.is_deleted)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_comment(&self, id: CommentId) -> Result<Option<Comment>> {
        let row: Option<CommentRow> =
            sqlx::query_as(&format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"))
                .bind(id.to_uuid())
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Into::into))
    }

    async fn update_comment(&self, comment: &Comment) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE comments
            SET body = $2, is_flagged = $3, flag_reason = $4, is_deleted = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(comment.id.to_uuid())
        .bind(&comment.body)
        .bind(comment.is_flagged)
        .bind(&comment.flag_reason)
        .bind(comment.is_deleted)
        .bind(comment.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("Comment"));
        }
        Ok(())
    }

    async fn list_for_repo(&self, repo_id: RepoId) -> Result<Vec<Comment>> {
        let rows: Vec<CommentRow> = sqlx::query_as(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE repo_id = $1 \
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(repo_id.to_uuid())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn set_vote(
        &self,
        comment_id: CommentId,
        user_id: UserId,
        direction: Option<VoteDirection>,
    ) -> Result<Comment> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<uuid::Uuid> =
            sqlx::query_scalar("SELECT id FROM comments WHERE id = $1 FOR UPDATE")
                .bind(comment_id.to_uuid())
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Err(CoreError::not_found("Comment"));
        }

        let previous: Option<String> = sqlx::query_scalar(
            "SELECT direction FROM comment_votes WHERE comment_id = $1 AND user_id = $2",
        )
        .bind(comment_id.to_uuid())
        .bind(user_id.to_uuid())
        .fetch_optional(&mut *tx)
        .await?;
        let previous: Option<VoteDirection> =
            previous.map(|d| d.parse()).transpose()?;

        match direction {
            Some(direction) => {
                sqlx::query(
                    r#"
                    INSERT INTO comment_votes (comment_id, user_id, direction)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (comment_id, user_id) DO UPDATE SET direction = EXCLUDED.direction
                    "#,
                )
                .bind(comment_id.to_uuid())
                .bind(user_id.to_uuid())
                .bind(direction.as_str())
                .execute(&mut *tx)
                .await?;
            }
            None => {
                sqlx::query(
                    "DELETE FROM comment_votes WHERE comment_id = $1 AND user_id = $2",
                )
                .bind(comment_id.to_uuid())
                .bind(user_id.to_uuid())
                .execute(&mut *tx)
                .await?;
            }
        }

        let (old_up, old_down) = tally_delta(previous);
        let (new_up, new_down) = tally_delta(direction);
        let row: CommentRow = sqlx::query_as(&format!(
            "UPDATE comments SET upvotes = upvotes + $2, downvotes = downvotes + $3 \
             WHERE id = $1 RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(comment_id.to_uuid())
        .bind(new_up - old_up)
        .bind(new_down - old_down)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn flagged(&self, limit: i64) -> Result<Vec<Comment>> {
        let rows: Vec<CommentRow> = sqlx::query_as(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments \
             WHERE is_flagged AND NOT is_deleted \
             ORDER BY created_at ASC, id ASC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
