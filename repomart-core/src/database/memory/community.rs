use async_trait::async_trait;
use repomart_model::{
    Comment, CommentId, RepoId, Review, ReviewId, UserId, VoteDirection,
};

use super::{MemoryStore, State, newest_first, oldest_first, take};
use crate::database::ports::comments::CommentsRepository;
use crate::database::ports::reviews::ReviewsRepository;
use crate::error::{CoreError, Result};

fn recompute_rating(state: &mut State, repo_id: RepoId) {
    let ratings: Vec<i64> = state
        .reviews
        .iter()
        .filter(|r| r.repo_id == repo_id && !r.is_flagged)
        .map(|r| i64::from(r.rating))
        .collect();
    if let Some(repo) = state.repos.iter_mut().find(|r| r.id == repo_id) {
        repo.rating_count = ratings.len() as i64;
        repo.rating_avg = if ratings.is_empty() {
            None
        } else {
            Some(ratings.iter().sum::<i64>() as f64 / ratings.len() as f64)
        };
    }
}

#[async_trait]
impl CommentsRepository for MemoryStore {
    async fn insert_comment(&self, comment: &Comment) -> Result<()> {
        let mut state = self.lock();
        if !state.repos.iter().any(|r| r.id == comment.repo_id) {
            return Err(CoreError::not_found("Repository"));
        }
        state.comments.push(comment.clone());
        Ok(())
    }

    async fn get_comment(&self, id: CommentId) -> Result<Option<Comment>> {
        Ok(self.lock().comments.iter().find(|c| c.id == id).cloned())
    }

    async fn update_comment(&self, comment: &Comment) -> Result<()> {
        let mut state = self.lock();
        let stored = state
            .comments
            .iter_mut()
            .find(|c| c.id == comment.id)
            .ok_or_else(|| CoreError::not_found("Comment"))?;
        stored.body = comment.body.clone();
        stored.is_flagged = comment.is_flagged;
        stored.flag_reason = comment.flag_reason.clone();
        stored.is_deleted = comment.is_deleted;
        stored.updated_at = comment.updated_at;
        Ok(())
    }

    async fn list_for_repo(&self, repo_id: RepoId) -> Result<Vec<Comment>> {
        let state = self.lock();
        Ok(oldest_first(&state.comments, |c| c.repo_id == repo_id, |c| c.created_at))
    }

    async fn set_vote(
        &self,
        comment_id: CommentId,
        user_id: UserId,
        direction: Option<VoteDirection>,
    ) -> Result<Comment> {
        let mut state = self.lock();
        if !state.comments.iter().any(|c| c.id == comment_id) {
            return Err(CoreError::not_found("Comment"));
        }
        let previous = match direction {
            Some(direction) => state.votes.insert((comment_id, user_id), direction),
            None => state.votes.remove(&(comment_id, user_id)),
        };

        let comment = state
            .comments
            .iter_mut()
            .find(|c| c.id == comment_id)
            .ok_or_else(|| CoreError::not_found("Comment"))?;
        match previous {
            Some(VoteDirection::Up) => comment.upvotes -= 1,
            Some(VoteDirection::Down) => comment.downvotes -= 1,
            None => {}
        }
        match direction {
            Some(VoteDirection::Up) => comment.upvotes += 1,
            Some(VoteDirection::Down) => comment.downvotes += 1,
            None => {}
        }
        Ok(comment.clone())
    }

    async fn flagged(&self, limit: i64) -> Result<Vec<Comment>> {
        let state = self.lock();
        let mut comments = oldest_first(
            &state.comments,
            |c| c.is_flagged && !c.is_deleted,
            |c| c.created_at,
        );
        comments.truncate(take(limit));
        Ok(comments)
    }
}

#[async_trait]
impl ReviewsRepository for MemoryStore {
    async fn upsert_review(&self, review: &Review) -> Result<Review> {
        let mut state = self.lock();
        if !state.repos.iter().any(|r| r.id == review.repo_id) {
            return Err(CoreError::not_found("Repository"));
        }
        let stored = match state
            .reviews
            .iter_mut()
            .find(|r| r.repo_id == review.repo_id && r.author_id == review.author_id)
        {
            Some(existing) => {
                existing.rating = review.rating;
                existing.body = review.body.clone();
                existing.is_flagged = review.is_flagged;
                existing.flag_reason = review.flag_reason.clone();
                existing.updated_at = review.updated_at;
                existing.clone()
            }
            None => {
                state.reviews.push(review.clone());
                review.clone()
            }
        };
        recompute_rating(&mut state, review.repo_id);
        Ok(stored)
    }

    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>> {
        Ok(self.lock().reviews.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_author(&self, repo_id: RepoId, author_id: UserId) -> Result<Option<Review>> {
        Ok(self
            .lock()
            .reviews
            .iter()
            .find(|r| r.repo_id == repo_id && r.author_id == author_id)
            .cloned())
    }

    async fn list_for_repo(&self, repo_id: RepoId, include_flagged: bool) -> Result<Vec<Review>> {
        let state = self.lock();
        Ok(newest_first(
            &state.reviews,
            |r| r.repo_id == repo_id && (include_flagged || !r.is_flagged),
            |r| r.created_at,
        ))
    }

    async fn set_flag(&self, id: ReviewId, reason: Option<String>) -> Result<Review> {
        let mut state = self.lock();
        let review = state
            .reviews
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| CoreError::not_found("Review"))?;
        review.is_flagged = reason.is_some();
        review.flag_reason = reason;
        let review = review.clone();
        recompute_rating(&mut state, review.repo_id);
        Ok(review)
    }

    async fn delete_review(&self, id: ReviewId) -> Result<()> {
        let mut state = self.lock();
        let repo_id = state
            .reviews
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.repo_id)
            .ok_or_else(|| CoreError::not_found("Review"))?;
        state.reviews.retain(|r| r.id != id);
        recompute_rating(&mut state, repo_id);
        Ok(())
    }

    async fn flagged(&self, limit: i64) -> Result<Vec<Review>> {
        let state = self.lock();
        let mut reviews = oldest_first(&state.reviews, |r| r.is_flagged, |r| r.created_at);
        reviews.truncate(take(limit));
        Ok(reviews)
    }
}
