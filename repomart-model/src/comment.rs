use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CommentId, RepoId, ReviewId, UserId};

string_enum! {
    pub enum VoteDirection: "vote direction" {
        Up => "up",
        Down => "down",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub repo_id: RepoId,
    pub author_id: UserId,
    pub parent_id: Option<CommentId>,
    pub body: String,
    pub is_flagged: bool,
    pub flag_reason: Option<String>,
    pub is_deleted: bool,
    pub upvotes: i64,
    pub downvotes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn score(&self) -> i64 {
        self.upvotes - self.downvotes
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewCommentRequest {
    pub body: String,
    #[serde(default)]
    pub parent_id: Option<CommentId>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EditCommentRequest {
    pub body: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VoteRequest {
    /// `None` clears the caller's vote.
    pub direction: Option<VoteDirection>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlagRequest {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub repo_id: RepoId,
    pub author_id: UserId,
    pub rating: i16,
    pub body: Option<String>,
    pub is_flagged: bool,
    pub flag_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReviewRequest {
    pub rating: i16,
    #[serde(default)]
    pub body: Option<String>,
}
