use async_trait::async_trait;
use repomart_model::{AccessGrant, RepoId, RepoListing, UserId};

use crate::catalog::filter::CatalogFilter;
use crate::error::Result;

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn insert_repo(&self, repo: &RepoListing) -> Result<()>;
    async fn get_repo(&self, id: RepoId) -> Result<Option<RepoListing>>;
    /// Persist editable fields. Aggregates (sales, rating) are untouched.
    async fn update_repo(&self, repo: &RepoListing) -> Result<()>;
    async fn delete_repo(&self, id: RepoId) -> Result<()>;
    /// Existing slugs of this seller that start with `prefix`.
    async fn slugs_with_prefix(
        &self,
        seller_id: UserId,
        prefix: &str,
    ) -> Result<Vec<String>>;
    /// One page of matches plus the total match count.
    async fn search(&self, filter: &CatalogFilter) -> Result<(Vec<RepoListing>, i64)>;
    async fn list_by_seller(&self, seller_id: UserId) -> Result<Vec<RepoListing>>;

    async fn has_access(&self, user_id: UserId, repo_id: RepoId) -> Result<bool>;
    /// Returns false when the grant already existed.
    async fn grant_access(&self, grant: &AccessGrant) -> Result<bool>;
    /// Number of users currently holding access.
    async fn access_count(&self, repo_id: RepoId) -> Result<i64>;
    async fn list_owned(&self, user_id: UserId) -> Result<Vec<RepoListing>>;
}
