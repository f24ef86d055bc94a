use std::sync::Arc;

use repomart_model::comment::ReviewRequest;
use repomart_model::{RepoId, Review, ReviewId, User};
use tracing::info;

use super::PROFANITY_REASON;
use super::comments::validate_flag_reason;
use super::profanity::ProfanityFilter;
use crate::application::unit_of_work::AppUnitOfWork;
use crate::clock::Clock;
use crate::error::{CoreError, Result};

const MAX_REVIEW_LEN: usize = 5_000;
const QUEUE_LIMIT: i64 = 200;

/// Ratings and written reviews. Every write path recomputes the listing's
/// `rating_avg`/`rating_count` over unflagged reviews in the same
/// transaction.
#[derive(Debug, Clone)]
pub struct ReviewService {
    uow: Arc<AppUnitOfWork>,
    filter: Arc<ProfanityFilter>,
    clock: Arc<dyn Clock>,
}

impl ReviewService {
    pub fn new(
        uow: Arc<AppUnitOfWork>,
        filter: Arc<ProfanityFilter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { uow, filter, clock }
    }

    async fn load(&self, review_id: ReviewId) -> Result<Review> {
        self.uow
            .reviews
            .get_review(review_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Review"))
    }

    /// Create or replace the caller's review of a listing they own.
    pub async fn submit(
        &self,
        reviewer: &User,
        repo_id: RepoId,
        request: ReviewRequest,
    ) -> Result<Review> {
        if !(1..=5).contains(&request.rating) {
            return Err(CoreError::validation("Rating must be between 1 and 5"));
        }
        let body = request
            .body
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty());
        if body
            .as_deref()
            .is_some_and(|b| b.chars().count() > MAX_REVIEW_LEN)
        {
            return Err(CoreError::validation(format!(
                "Review cannot exceed {MAX_REVIEW_LEN} characters"
            )));
        }

        let repo = self
            .uow
            .catalog
            .get_repo(repo_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Repository"))?;
        if repo.seller_id == reviewer.id {
            return Err(CoreError::forbidden("Sellers cannot review their own repositories"));
        }
        if !self.uow.catalog.has_access(reviewer.id, repo_id).await? {
            return Err(CoreError::forbidden(
                "Only buyers of this repository can review it",
            ));
        }

        let flagged = body.as_deref().is_some_and(|b| self.filter.is_profane(b));
        let now = self.clock.now();
        let existing = self.uow.reviews.find_by_author(repo_id, reviewer.id).await?;

        let review = match existing {
            Some(mut review) => {
                review.rating = request.rating;
                review.body = body;
                if flagged {
                    review.is_flagged = true;
                    review.flag_reason = Some(PROFANITY_REASON.to_string());
                } else if review.flag_reason.as_deref() == Some(PROFANITY_REASON) {
                    review.is_flagged = false;
                    review.flag_reason = None;
                }
                review.updated_at = now;
                review
            }
            None => Review {
                id: ReviewId::new(),
                repo_id,
                author_id: reviewer.id,
                rating: request.rating,
                body,
                is_flagged: flagged,
                flag_reason: flagged.then(|| PROFANITY_REASON.to_string()),
                created_at: now,
                updated_at: now,
            },
        };

        let saved = self.uow.reviews.upsert_review(&review).await?;
        info!(
            review_id = %saved.id,
            repo_id = %repo_id,
            rating = saved.rating,
            flagged = saved.is_flagged,
            "review saved"
        );
        Ok(saved)
    }

    /// Unflagged reviews, newest first.
    pub async fn list(&self, repo_id: RepoId) -> Result<Vec<Review>> {
        self.uow.reviews.list_for_repo(repo_id, false).await
    }

    pub async fn flag(&self, moderator: &User, review_id: ReviewId, reason: &str) -> Result<Review> {
        if !moderator.role.can_moderate() {
            return Err(CoreError::forbidden("Moderator access required"));
        }
        let reason = validate_flag_reason(reason)?;
        self.load(review_id).await?;
        let review = self.uow.reviews.set_flag(review_id, Some(reason)).await?;
        info!(review_id = %review_id, moderator_id = %moderator.id, "review flagged");
        Ok(review)
    }

    /// Unhide a review; the listing's rating aggregates include it again.
    pub async fn revert_flag(&self, moderator: &User, review_id: ReviewId) -> Result<Review> {
        if !moderator.role.can_moderate() {
            return Err(CoreError::forbidden("Moderator access required"));
        }
        self.load(review_id).await?;
        let review = self.uow.reviews.set_flag(review_id, None).await?;
        info!(review_id = %review_id, moderator_id = %moderator.id, "review flag reverted");
        Ok(review)
    }

    pub async fn delete(&self, actor: &User, review_id: ReviewId) -> Result<()> {
        let review = self.load(review_id).await?;
        if review.author_id != actor.id && !actor.role.can_moderate() {
            return Err(CoreError::forbidden("Not allowed to delete this review"));
        }
        self.uow.reviews.delete_review(review_id).await?;
        info!(review_id = %review_id, actor_id = %actor.id, "review deleted");
        Ok(())
    }

    pub async fn flagged_queue(&self, moderator: &User) -> Result<Vec<Review>> {
        if !moderator.role.can_moderate() {
            return Err(CoreError::forbidden("Moderator access required"));
        }
        self.uow.reviews.flagged(QUEUE_LIMIT).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestMarket;

    fn rating(stars: i16, body: Option<&str>) -> ReviewRequest {
        ReviewRequest {
            rating: stars,
            body: body.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn review_requires_purchase() {
        let market = TestMarket::new();
        let seller = market.seller("critic_target").await;
        let repo = market.listing(&seller, "Reviewed Repo", 500).await;
        let buyer = market.buyer("critic").await;

        assert!(matches!(
            market.reviews.submit(&buyer, repo.id, rating(5, None)).await,
            Err(CoreError::Forbidden(_))
        ));
        assert!(matches!(
            market.reviews.submit(&seller, repo.id, rating(5, None)).await,
            Err(CoreError::Forbidden(_))
        ));

        market.purchase(&buyer, &repo).await;
        assert!(matches!(
            market.reviews.submit(&buyer, repo.id, rating(6, None)).await,
            Err(CoreError::Validation(_))
        ));
        let review = market.reviews.submit(&buyer, repo.id, rating(4, Some("Solid"))).await.unwrap();
        assert_eq!(review.rating, 4);
    }

    #[tokio::test]
    async fn resubmitting_updates_and_recomputes() {
        let market = TestMarket::new();
        let seller = market.seller("rated").await;
        let repo = market.listing(&seller, "Rated Repo", 0).await;
        let first = market.buyer("rater_one").await;
        let second = market.buyer("rater_two").await;
        market.checkout.start_checkout(&first, repo.id).await.unwrap();
        market.checkout.start_checkout(&second, repo.id).await.unwrap();

        let original = market.reviews.submit(&first, repo.id, rating(2, None)).await.unwrap();
        market.reviews.submit(&second, repo.id, rating(5, None)).await.unwrap();
        let updated = market.reviews.submit(&first, repo.id, rating(4, None)).await.unwrap();
        assert_eq!(original.id, updated.id);

        let listing = market.uow.catalog.get_repo(repo.id).await.unwrap().unwrap();
        assert_eq!(listing.rating_count, 2);
        assert_eq!(listing.rating_avg, Some(4.5));
        assert_eq!(market.reviews.list(repo.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn flagged_reviews_are_excluded_until_reverted() {
        let market = TestMarket::new();
        let seller = market.seller("flagged_target").await;
        let repo = market.listing(&seller, "Flag Repo", 0).await;
        let buyer = market.buyer("angry").await;
        let moderator = market.moderator("calm").await;
        market.checkout.start_checkout(&buyer, repo.id).await.unwrap();

        let review = market
            .reviews
            .submit(&buyer, repo.id, rating(1, Some("total shit")))
            .await
            .unwrap();
        assert!(review.is_flagged);

        let listing = market.uow.catalog.get_repo(repo.id).await.unwrap().unwrap();
        assert_eq!(listing.rating_count, 0);
        assert_eq!(listing.rating_avg, None);
        assert!(market.reviews.list(repo.id).await.unwrap().is_empty());
        assert_eq!(market.reviews.flagged_queue(&moderator).await.unwrap().len(), 1);

        market.reviews.revert_flag(&moderator, review.id).await.unwrap();
        let listing = market.uow.catalog.get_repo(repo.id).await.unwrap().unwrap();
        assert_eq!(listing.rating_count, 1);
        assert_eq!(listing.rating_avg, Some(1.0));

        market.reviews.delete(&moderator, review.id).await.unwrap();
        let listing = market.uow.catalog.get_repo(repo.id).await.unwrap().unwrap();
        assert_eq!(listing.rating_count, 0);
    }
}
