//! Comments, reviews and the profanity filter that screens both.

pub mod comments;
pub mod profanity;
pub mod reviews;

pub use comments::CommentService;
pub use profanity::ProfanityFilter;
pub use reviews::ReviewService;

/// `flag_reason` stored when the profanity filter hides content.
pub const PROFANITY_REASON: &str = "profanity";

/// Placeholder body of a soft-deleted comment.
pub const DELETED_BODY: &str = "[deleted]";
