//! Repository ports grouped by bounded context.
//!
//! Services depend only on these traits. Implementations live in
//! `database::postgres` (production) and `database::memory` (local
//! development and tests). Operations that must be atomic are expressed as a
//! single port method so each adapter can wrap them in one transaction.

pub mod catalog;
pub mod comments;
pub mod orders;
pub mod payouts;
pub mod reports;
pub mod reviews;
pub mod search_history;
pub mod sellers;
pub mod sessions;
pub mod users;
