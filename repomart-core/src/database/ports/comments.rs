use async_trait::async_trait;
use repomart_model::{Comment, CommentId, RepoId, UserId, VoteDirection};

use crate::error::Result;

#[async_trait]
pub trait CommentsRepository: Send + Sync {
    async fn insert_comment(&self, comment: &Comment) -> Result<()>;
    async fn get_comment(&self, id: CommentId) -> Result<Option<Comment>>;
    /// Persist body, flag and deletion state.
    async fn update_comment(&self, comment: &Comment) -> Result<()>;
    async fn list_for_repo(&self, repo_id: RepoId) -> Result<Vec<Comment>>;
    /// Replace the user's vote (`None` clears it) and adjust the tallies in
    /// the same transaction. Returns the updated comment.
    async fn set_vote(
        &self,
        comment_id: CommentId,
        user_id: UserId,
        direction: Option<VoteDirection>,
    ) -> Result<Comment>;
    async fn flagged(&self, limit: i64) -> Result<Vec<Comment>>;
}
