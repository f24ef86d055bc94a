use async_trait::async_trait;
use repomart_model::{AccessGrant, RepoId, RepoListing, UserId};
use sqlx::PgPool;

use super::rows::{RepoRow, convert_all};
use crate::catalog::filter::{CatalogFilter, LISTING_COLUMNS, escape_like};
use crate::database::ports::catalog::CatalogRepository;
use crate::error::{CoreError, Result};

#[derive(Clone, Debug)]
pub struct PostgresCatalogRepository {
    pool: PgPool,
}

impl PostgresCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PostgresCatalogRepository {
    async fn insert_repo(&self, repo: &RepoListing) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO repositories (
                id, seller_id, slug, title, description, language, tags,
                price_cents, visibility, source_url, sales_count,
                revenue_cents, rating_avg, rating_count, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 0, 0, NULL, 0, $11, $12)
            "#,
        )
        .bind(repo.id.to_uuid())
        .bind(repo.seller_id.to_uuid())
        .bind(&repo.slug)
        .bind(&repo.title)
        .bind(&repo.description)
        .bind(&repo.language)
        .bind(&repo.tags)
        .bind(repo.price.get())
        .bind(repo.visibility.as_str())
        .bind(&repo.source_url)
        .bind(repo.created_at)
        .bind(repo.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_repo(&self, id: RepoId) -> Result<Option<RepoListing>> {
        let row: Option<RepoRow> = sqlx::query_as(&format!(
            "SELECT {LISTING_COLUMNS} FROM repositories r WHERE r.id = $1"
        ))
        .bind(id.to_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(RepoListing::try_from).transpose()
    }

    async fn update_repo(&self, repo: &RepoListing) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE repositories
            SET title = $2, description = $3, language = $4, tags = $5,
                price_cents = $6, visibility = $7, source_url = $8,
                updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(repo.id.to_uuid())
        .bind(&repo.title)
        .bind(&repo.description)
        .bind(&repo.language)
        .bind(&repo.tags)
        .bind(repo.price.get())
        .bind(repo.visibility.as_str())
        .bind(&repo.source_url)
        .bind(repo.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("Repository"));
        }
        Ok(())
    }

    async fn delete_repo(&self, id: RepoId) -> Result<()> {
        let result = sqlx::query("DELETE FROM repositories WHERE id = $1")
            .bind(id.to_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("Repository"));
        }
        Ok(())
    }

    async fn slugs_with_prefix(
        &self,
        seller_id: UserId,
        prefix: &str,
    ) -> Result<Vec<String>> {
        Ok(sqlx::query_scalar(
            "SELECT slug FROM repositories WHERE seller_id = $1 AND slug LIKE $2",
        )
        .bind(seller_id.to_uuid())
        .bind(format!("{}%", escape_like(prefix)))
        .fetch_all(&self.pool)
        .await?)
    }

    async fn search(&self, filter: &CatalogFilter) -> Result<(Vec<RepoListing>, i64)> {
        let total: i64 = filter
            .count_query()
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;
        if total == 0 {
            return Ok((Vec::new(), 0));
        }

        let rows: Vec<RepoRow> = filter
            .page_query()
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;
        Ok((convert_all(rows)?, total))
    }

    async fn list_by_seller(&self, seller_id: UserId) -> Result<Vec<RepoListing>> {
        let rows: Vec<RepoRow> = sqlx::query_as(&format!(
            "SELECT {LISTING_COLUMNS} FROM repositories r \
             WHERE r.seller_id = $1 ORDER BY r.created_at DESC, r.id DESC"
        ))
        .bind(seller_id.to_uuid())
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn has_access(&self, user_id: UserId, repo_id: RepoId) -> Result<bool> {
        Ok(sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM access_grants WHERE user_id = $1 AND repo_id = $2)",
        )
        .bind(user_id.to_uuid())
        .bind(repo_id.to_uuid())
        .fetch_one(&self.pool)
        .await?)
    }

    async fn grant_access(&self, grant: &AccessGrant) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO access_grants (user_id, repo_id, order_id, granted_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, repo_id) DO NOTHING
            "#,
        )
        .bind(grant.user_id.to_uuid())
        .bind(grant.repo_id.to_uuid())
        .bind(grant.order_id.map(|id| id.to_uuid()))
        .bind(grant.granted_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn access_count(&self, repo_id: RepoId) -> Result<i64> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(*) FROM access_grants WHERE repo_id = $1")
                .bind(repo_id.to_uuid())
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn list_owned(&self, user_id: UserId) -> Result<Vec<RepoListing>> {
        let rows: Vec<RepoRow> = sqlx::query_as(&format!(
            "SELECT {LISTING_COLUMNS} FROM repositories r \
             JOIN access_grants g ON g.repo_id = r.id \
             WHERE g.user_id = $1 ORDER BY g.granted_at DESC, r.id DESC"
        ))
        .bind(user_id.to_uuid())
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }
}
