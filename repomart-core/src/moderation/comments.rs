use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use repomart_model::comment::{EditCommentRequest, NewCommentRequest};
use repomart_model::{
    Comment, CommentId, RepoId, RepoListing, User, Visibility, VoteDirection,
};
use tracing::info;

use super::profanity::ProfanityFilter;
use super::{DELETED_BODY, PROFANITY_REASON};
use crate::application::unit_of_work::AppUnitOfWork;
use crate::clock::Clock;
use crate::error::{CoreError, Result};

pub const MAX_COMMENT_LEN: usize = 5_000;
const MAX_FLAG_REASON_LEN: usize = 200;
const QUEUE_LIMIT: i64 = 200;

fn validate_body(body: &str) -> Result<String> {
    let body = body.trim();
    let length = body.chars().count();
    if length == 0 || length > MAX_COMMENT_LEN {
        return Err(CoreError::validation(format!(
            "Comment must be between 1 and {MAX_COMMENT_LEN} characters"
        )));
    }
    Ok(body.to_string())
}

pub(crate) fn validate_flag_reason(reason: &str) -> Result<String> {
    let reason = reason.trim();
    if reason.is_empty() || reason.chars().count() > MAX_FLAG_REASON_LEN {
        return Err(CoreError::validation(format!(
            "Flag reason must be between 1 and {MAX_FLAG_REASON_LEN} characters"
        )));
    }
    Ok(reason.to_string())
}

/// Order comments as a thread: top-level comments oldest first, each
/// followed depth-first by its replies (also oldest first). A comment whose
/// parent is absent from `comments` is treated as top-level.
pub fn thread_order(mut comments: Vec<Comment>) -> Vec<Comment> {
    comments.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.to_uuid().cmp(&b.id.to_uuid()))
    });
    let present: HashSet<CommentId> = comments.iter().map(|c| c.id).collect();

    let mut children: HashMap<Option<CommentId>, Vec<Comment>> = HashMap::new();
    for comment in comments {
        let parent = comment.parent_id.filter(|p| present.contains(p));
        children.entry(parent).or_default().push(comment);
    }
    for siblings in children.values_mut() {
        siblings.reverse();
    }

    let mut ordered = Vec::with_capacity(present.len());
    let mut stack: Vec<Comment> = children.remove(&None).unwrap_or_default();
    while let Some(comment) = stack.pop() {
        if let Some(replies) = children.remove(&Some(comment.id)) {
            stack.extend(replies);
        }
        ordered.push(comment);
    }
    ordered
}

#[derive(Debug, Clone)]
pub struct CommentService {
    uow: Arc<AppUnitOfWork>,
    filter: Arc<ProfanityFilter>,
    clock: Arc<dyn Clock>,
}

impl CommentService {
    pub fn new(
        uow: Arc<AppUnitOfWork>,
        filter: Arc<ProfanityFilter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { uow, filter, clock }
    }

    fn require_moderator(actor: &User) -> Result<()> {
        if actor.role.can_moderate() {
            Ok(())
        } else {
            Err(CoreError::forbidden("Moderator access required"))
        }
    }

    /// The listing, if `viewer` may see it at all.
    async fn visible_repo(&self, repo_id: RepoId, viewer: Option<&User>) -> Result<RepoListing> {
        let repo = self
            .uow
            .catalog
            .get_repo(repo_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Repository"))?;
        if repo.visibility != Visibility::Private {
            return Ok(repo);
        }
        if let Some(user) = viewer
            && (user.id == repo.seller_id
                || user.role.can_moderate()
                || self.uow.catalog.has_access(user.id, repo_id).await?)
        {
            return Ok(repo);
        }
        Err(CoreError::not_found("Repository"))
    }

    async fn load(&self, comment_id: CommentId) -> Result<Comment> {
        self.uow
            .comments
            .get_comment(comment_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Comment"))
    }

    pub async fn post(
        &self,
        author: &User,
        repo_id: RepoId,
        request: NewCommentRequest,
    ) -> Result<Comment> {
        self.visible_repo(repo_id, Some(author)).await?;
        let body = validate_body(&request.body)?;

        if let Some(parent_id) = request.parent_id {
            let parent = self.load(parent_id).await?;
            if parent.repo_id != repo_id {
                return Err(CoreError::validation(
                    "Parent comment belongs to another repository",
                ));
            }
            if parent.is_deleted {
                return Err(CoreError::validation("Cannot reply to a deleted comment"));
            }
        }

        let flagged = self.filter.is_profane(&body);
        let now = self.clock.now();
        let comment = Comment {
            id: CommentId::new(),
            repo_id,
            author_id: author.id,
            parent_id: request.parent_id,
            body,
            is_flagged: flagged,
            flag_reason: flagged.then(|| PROFANITY_REASON.to_string()),
            is_deleted: false,
            upvotes: 0,
            downvotes: 0,
            created_at: now,
            updated_at: now,
        };
        self.uow.comments.insert_comment(&comment).await?;

        if flagged {
            info!(comment_id = %comment.id, author_id = %author.id, "comment held by profanity filter");
        }
        Ok(comment)
    }

    /// Author-only edit. The profanity filter runs again: it can flag the
    /// comment or lift a previous profanity flag, but never a manual one.
    pub async fn edit(
        &self,
        author: &User,
        comment_id: CommentId,
        request: EditCommentRequest,
    ) -> Result<Comment> {
        let mut comment = self.load(comment_id).await?;
        if comment.author_id != author.id {
            return Err(CoreError::forbidden("Only the author can edit a comment"));
        }
        if comment.is_deleted {
            return Err(CoreError::validation("Deleted comments cannot be edited"));
        }

        comment.body = validate_body(&request.body)?;
        if self.filter.is_profane(&comment.body) {
            if !comment.is_flagged {
                comment.is_flagged = true;
                comment.flag_reason = Some(PROFANITY_REASON.to_string());
            }
        } else if comment.flag_reason.as_deref() == Some(PROFANITY_REASON) {
            comment.is_flagged = false;
            comment.flag_reason = None;
        }
        comment.updated_at = self.clock.now();

        self.uow.comments.update_comment(&comment).await?;
        Ok(comment)
    }

    /// Soft delete by the author or a moderator. Replies stay in place.
    pub async fn delete(&self, actor: &User, comment_id: CommentId) -> Result<Comment> {
        let mut comment = self.load(comment_id).await?;
        if comment.author_id != actor.id && !actor.role.can_moderate() {
            return Err(CoreError::forbidden("Not allowed to delete this comment"));
        }
        if comment.is_deleted {
            return Ok(comment);
        }

        comment.is_deleted = true;
        comment.body = DELETED_BODY.to_string();
        comment.updated_at = self.clock.now();
        self.uow.comments.update_comment(&comment).await?;

        info!(comment_id = %comment.id, actor_id = %actor.id, "comment deleted");
        Ok(comment)
    }

    /// Set or clear (`None`) the caller's vote.
    pub async fn vote(
        &self,
        voter: &User,
        comment_id: CommentId,
        direction: Option<VoteDirection>,
    ) -> Result<Comment> {
        let comment = self.load(comment_id).await?;
        if comment.author_id == voter.id {
            return Err(CoreError::forbidden("You cannot vote on your own comment"));
        }
        if comment.is_deleted {
            return Err(CoreError::validation("Cannot vote on a deleted comment"));
        }
        self.uow.comments.set_vote(comment_id, voter.id, direction).await
    }

    /// Thread for a listing. Flagged comments are only shown to their author
    /// and to moderators.
    pub async fn list(&self, repo_id: RepoId, viewer: Option<&User>) -> Result<Vec<Comment>> {
        self.visible_repo(repo_id, viewer).await?;
        let staff = viewer.is_some_and(|user| user.role.can_moderate());

        let visible = self
            .uow
            .comments
            .list_for_repo(repo_id)
            .await?
            .into_iter()
            .filter(|comment| {
                !comment.is_flagged
                    || staff
                    || viewer.is_some_and(|user| user.id == comment.author_id)
            })
            .collect();
        Ok(thread_order(visible))
    }

    pub async fn flag(
        &self,
        moderator: &User,
        comment_id: CommentId,
        reason: &str,
    ) -> Result<Comment> {
        Self::require_moderator(moderator)?;
        let reason = validate_flag_reason(reason)?;
        let mut comment = self.load(comment_id).await?;
        comment.is_flagged = true;
        comment.flag_reason = Some(reason);
        comment.updated_at = self.clock.now();
        self.uow.comments.update_comment(&comment).await?;

        info!(comment_id = %comment.id, moderator_id = %moderator.id, "comment flagged");
        Ok(comment)
    }

    /// Clear a flag, whether set by the filter or by a moderator.
    pub async fn revert_flag(&self, moderator: &User, comment_id: CommentId) -> Result<Comment> {
        Self::require_moderator(moderator)?;
        let mut comment = self.load(comment_id).await?;
        if !comment.is_flagged {
            return Ok(comment);
        }
        comment.is_flagged = false;
        comment.flag_reason = None;
        comment.updated_at = self.clock.now();
        self.uow.comments.update_comment(&comment).await?;

        info!(comment_id = %comment.id, moderator_id = %moderator.id, "comment flag reverted");
        Ok(comment)
    }

    /// Flagged, non-deleted comments, oldest first.
    pub async fn flagged_queue(&self, moderator: &User) -> Result<Vec<Comment>> {
        Self::require_moderator(moderator)?;
        self.uow.comments.flagged(QUEUE_LIMIT).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::test_support::TestMarket;

    fn raw(id: CommentId, parent: Option<CommentId>, minute: i64) -> Comment {
        let at = Utc::now() + Duration::minutes(minute);
        Comment {
            id,
            repo_id: RepoId::new(),
            author_id: repomart_model::UserId::new(),
            parent_id: parent,
            body: format!("c{minute}"),
            is_flagged: false,
            flag_reason: None,
            is_deleted: false,
            upvotes: 0,
            downvotes: 0,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn thread_order_nests_replies() {
        let (a, b, a1, a2, a1x) = (
            CommentId::new(),
            CommentId::new(),
            CommentId::new(),
            CommentId::new(),
            CommentId::new(),
        );
        let orphan_parent = CommentId::new();
        let comments = vec![
            raw(a2, Some(a), 4),
            raw(b, None, 2),
            raw(a1x, Some(a1), 5),
            raw(a, None, 1),
            raw(a1, Some(a), 3),
            raw(CommentId::new(), Some(orphan_parent), 6),
        ];

        let bodies: Vec<_> = thread_order(comments).into_iter().map(|c| c.body).collect();
        assert_eq!(bodies, ["c1", "c3", "c5", "c4", "c2", "c6"]);
    }

    fn new(body: &str) -> NewCommentRequest {
        NewCommentRequest { body: body.into(), parent_id: None }
    }

    #[tokio::test]
    async fn profane_comments_are_hidden_from_others() {
        let market = TestMarket::new();
        let seller = market.seller("host").await;
        let repo = market.listing(&seller, "Commented Repo", 500).await;
        let author = market.buyer("potty").await;
        let other = market.buyer("reader").await;
        let moderator = market.moderator("watcher").await;

        let clean = market.comments.post(&author, repo.id, new("Nice work")).await.unwrap();
        let dirty = market.comments.post(&author, repo.id, new("This is sh1t")).await.unwrap();
        assert!(!clean.is_flagged);
        assert!(dirty.is_flagged);
        assert_eq!(dirty.flag_reason.as_deref(), Some(PROFANITY_REASON));

        assert_eq!(market.comments.list(repo.id, Some(&other)).await.unwrap().len(), 1);
        assert_eq!(market.comments.list(repo.id, None).await.unwrap().len(), 1);
        assert_eq!(market.comments.list(repo.id, Some(&author)).await.unwrap().len(), 2);
        assert_eq!(market.comments.list(repo.id, Some(&moderator)).await.unwrap().len(), 2);

        let queue = market.comments.flagged_queue(&moderator).await.unwrap();
        assert_eq!(queue.len(), 1);
        let reverted = market.comments.revert_flag(&moderator, dirty.id).await.unwrap();
        assert!(!reverted.is_flagged);
        assert_eq!(market.comments.list(repo.id, Some(&other)).await.unwrap().len(), 2);
        assert!(matches!(
            market.comments.flagged_queue(&other).await,
            Err(CoreError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn editing_reruns_filter_but_keeps_manual_flags() {
        let market = TestMarket::new();
        let seller = market.seller("edits").await;
        let repo = market.listing(&seller, "Edited Repo", 500).await;
        let author = market.buyer("editor").await;
        let moderator = market.moderator("editmod").await;

        let comment = market.comments.post(&author, repo.id, new("fine")).await.unwrap();
        let dirty = market
            .comments
            .edit(&author, comment.id, EditCommentRequest { body: "bullshit".into() })
            .await
            .unwrap();
        assert!(dirty.is_flagged);
        let cleaned = market
            .comments
            .edit(&author, comment.id, EditCommentRequest { body: "fine again".into() })
            .await
            .unwrap();
        assert!(!cleaned.is_flagged);

        market.comments.flag(&moderator, comment.id, "spam").await.unwrap();
        let still = market
            .comments
            .edit(&author, comment.id, EditCommentRequest { body: "buy my stuff".into() })
            .await
            .unwrap();
        assert!(still.is_flagged);
        assert_eq!(still.flag_reason.as_deref(), Some("spam"));

        let stranger = market.buyer("notauthor").await;
        assert!(matches!(
            market
                .comments
                .edit(&stranger, comment.id, EditCommentRequest { body: "x".into() })
                .await,
            Err(CoreError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn replies_must_share_repository() {
        let market = TestMarket::new();
        let seller = market.seller("threads").await;
        let first = market.listing(&seller, "First Repo", 500).await;
        let second = market.listing(&seller, "Second Repo", 500).await;
        let author = market.buyer("replier").await;

        let parent = market.comments.post(&author, first.id, new("root")).await.unwrap();
        let reply = market
            .comments
            .post(&author, first.id, NewCommentRequest { body: "child".into(), parent_id: Some(parent.id) })
            .await
            .unwrap();
        assert_eq!(reply.parent_id, Some(parent.id));

        assert!(matches!(
            market
                .comments
                .post(&author, second.id, NewCommentRequest { body: "x".into(), parent_id: Some(parent.id) })
                .await,
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            market.comments.post(&author, first.id, new("   ")).await,
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            market.comments.post(&author, first.id, new(&"x".repeat(MAX_COMMENT_LEN + 1))).await,
            Err(CoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn voting_rules() {
        let market = TestMarket::new();
        let seller = market.seller("votes").await;
        let repo = market.listing(&seller, "Voted Repo", 500).await;
        let author = market.buyer("votee").await;
        let voter = market.buyer("voter").await;
        let comment = market.comments.post(&author, repo.id, new("vote on me")).await.unwrap();

        assert!(matches!(
            market.comments.vote(&author, comment.id, Some(VoteDirection::Up)).await,
            Err(CoreError::Forbidden(_))
        ));

        let up = market.comments.vote(&voter, comment.id, Some(VoteDirection::Up)).await.unwrap();
        assert_eq!((up.upvotes, up.downvotes), (1, 0));
        let same = market.comments.vote(&voter, comment.id, Some(VoteDirection::Up)).await.unwrap();
        assert_eq!((same.upvotes, same.downvotes), (1, 0));
        let switched = market.comments.vote(&voter, comment.id, Some(VoteDirection::Down)).await.unwrap();
        assert_eq!((switched.upvotes, switched.downvotes), (0, 1));
        let cleared = market.comments.vote(&voter, comment.id, None).await.unwrap();
        assert_eq!((cleared.upvotes, cleared.downvotes), (0, 0));
    }

    #[tokio::test]
    async fn delete_is_soft_and_restricted() {
        let market = TestMarket::new();
        let seller = market.seller("deletes").await;
        let repo = market.listing(&seller, "Deleted Repo", 500).await;
        let author = market.buyer("remover").await;
        let other = market.buyer("bystander").await;
        let moderator = market.moderator("janitor").await;
        let comment = market.comments.post(&author, repo.id, new("oops")).await.unwrap();

        assert!(matches!(
            market.comments.delete(&other, comment.id).await,
            Err(CoreError::Forbidden(_))
        ));
        let deleted = market.comments.delete(&moderator, comment.id).await.unwrap();
        assert!(deleted.is_deleted);
        assert_eq!(deleted.body, DELETED_BODY);

        let listed = market.comments.list(repo.id, None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].is_deleted);
    }
}
