use async_trait::async_trait;
use repomart_model::{RepoId, Review, ReviewId, UserId};

use crate::error::Result;

/// Every mutating method recomputes the repository's rating aggregates over
/// unflagged reviews in the same transaction.
#[async_trait]
pub trait ReviewsRepository: Send + Sync {
    /// Insert, or update the existing review of the same author and repo.
    async fn upsert_review(&self, review: &Review) -> Result<Review>;
    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>>;
    async fn find_by_author(&self, repo_id: RepoId, author_id: UserId) -> Result<Option<Review>>;
    async fn list_for_repo(&self, repo_id: RepoId, include_flagged: bool) -> Result<Vec<Review>>;
    async fn set_flag(&self, id: ReviewId, reason: Option<String>) -> Result<Review>;
    async fn delete_review(&self, id: ReviewId) -> Result<()>;
    async fn flagged(&self, limit: i64) -> Result<Vec<Review>>;
}
