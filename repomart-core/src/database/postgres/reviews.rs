use async_trait::async_trait;
use repomart_model::{RepoId, Review, ReviewId, UserId};
use sqlx::{PgPool, Postgres, Transaction};

use super::rows::{REVIEW_COLUMNS, ReviewRow};
use crate::database::ports::reviews::ReviewsRepository;
use crate::error::{CoreError, Result};

#[derive(Clone, Debug)]
pub struct PostgresReviewsRepository {
    pool: PgPool,
}

impl PostgresReviewsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn recompute_rating(
        tx: &mut Transaction<'_, Postgres>,
        repo_id: RepoId,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE repositories r
            SET rating_avg = agg.avg_rating, rating_count = agg.review_count
            FROM (
                SELECT AVG(rating)::float8 AS avg_rating, COUNT(*) AS review_count
                FROM reviews
                WHERE repo_id = $1 AND NOT is_flagged
            ) agg
            WHERE r.id = $1
            "#,
        )
        .bind(repo_id.to_uuid())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ReviewsRepository for PostgresReviewsRepository {
    async fn upsert_review(&self, review: &Review) -> Result<Review> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT id FROM repositories WHERE id = $1 FOR UPDATE")
            .bind(review.repo_id.to_uuid())
            .execute(&mut *tx)
            .await?;

        let row: ReviewRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO reviews (
                id, repo_id, author_id, rating, body, is_flagged, flag_reason,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (repo_id, author_id) DO UPDATE
            SET rating = EXCLUDED.rating,
                body = EXCLUDED.body,
                is_flagged = EXCLUDED.is_flagged,
                flag_reason = EXCLUDED.flag_reason,
                updated_at = EXCLUDED.updated_at
            RETURNING {REVIEW_COLUMNS}
            "#
        ))
        .bind(review.id.to_uuid())
        .bind(review.repo_id.to_uuid())
        .bind(review.author_id.to_uuid())
        .bind(review.rating)
        .bind(&review.body)
        .bind(review.is_flagged)
        .bind(&review.flag_reason)
        .bind(review.created_at)
        .bind(review.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        Self::recompute_rating(&mut tx, review.repo_id).await?;
        tx.commit().await?;
        Ok(row.into())
    }

    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>> {
        let row: Option<ReviewRow> =
            sqlx::query_as(&format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"))
                .bind(id.to_uuid())
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Into::into))
    }

    async fn find_by_author(&self, repo_id: RepoId, author_id: UserId) -> Result<Option<Review>> {
        let row: Option<ReviewRow> = sqlx::query_as(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE repo_id = $1 AND author_id = $2"
        ))
        .bind(repo_id.to_uuid())
        .bind(author_id.to_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn list_for_repo(&self, repo_id: RepoId, include_flagged: bool) -> Result<Vec<Review>> {
        let rows: Vec<ReviewRow> = sqlx::query_as(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews \
             WHERE repo_id = $1 AND ($2 OR NOT is_flagged) \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(repo_id.to_uuid())
        .bind(include_flagged)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn set_flag(&self, id: ReviewId, reason: Option<String>) -> Result<Review> {
        let mut tx = self.pool.begin().await?;
        let row: Option<ReviewRow> = sqlx::query_as(&format!(
            "UPDATE reviews SET is_flagged = $2, flag_reason = $3 \
             WHERE id = $1 RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(id.to_uuid())
        .bind(reason.is_some())
        .bind(&reason)
        .fetch_optional(&mut *tx)
        .await?;
        let review: Review = row
            .map(Into::into)
            .ok_or_else(|| CoreError::not_found("Review"))?;

        Self::recompute_rating(&mut tx, review.repo_id).await?;
        tx.commit().await?;
        Ok(review)
    }

    async fn delete_review(&self, id: ReviewId) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let repo_id: Option<uuid::Uuid> =
            sqlx::query_scalar("DELETE FROM reviews WHERE id = $1 RETURNING repo_id")
                .bind(id.to_uuid())
                .fetch_optional(&mut *tx)
                .await?;
        let repo_id = repo_id.ok_or_else(|| CoreError::not_found("Review"))?;

        Self::recompute_rating(&mut tx, repo_id.into()).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn flagged(&self, limit: i64) -> Result<Vec<Review>> {
        let rows: Vec<ReviewRow> = sqlx::query_as(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE is_flagged \
             ORDER BY created_at ASC, id ASC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
