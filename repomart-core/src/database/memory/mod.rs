//! In-process adapter for every repository port.
//!
//! All tables live behind one mutex, so every port method is trivially
//! atomic: the lock is taken once per call and never held across an await.
//! Uniqueness and ordering rules mirror the PostgreSQL schema.

mod accounts;
mod catalog;
mod commerce;
mod community;
mod reports;

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use repomart_model::{
    AccessGrant, Cents, Comment, CommentId, LedgerEntry, LedgerEntryId,
    LedgerKind, Order, OrderId, PayoutId, PayoutRequest, RepoId, RepoListing,
    Review, SearchHistoryEntry, SellerProfile, User, UserId, VoteDirection,
};

use crate::database::ports::sessions::SessionRecord;
use crate::error::{CoreError, Result};

#[derive(Debug, Clone)]
struct StoredUser {
    user: User,
    password_hash: String,
}

#[derive(Debug, Default)]
struct State {
    users: Vec<StoredUser>,
    sessions: Vec<SessionRecord>,
    sellers: Vec<SellerProfile>,
    repos: Vec<RepoListing>,
    access: Vec<AccessGrant>,
    searches: Vec<SearchHistoryEntry>,
    orders: Vec<Order>,
    payouts: Vec<PayoutRequest>,
    ledger: Vec<LedgerEntry>,
    comments: Vec<Comment>,
    votes: HashMap<(CommentId, UserId), VoteDirection>,
    reviews: Vec<Review>,
}

impl State {
    fn user_mut(&mut self, id: UserId) -> Result<&mut StoredUser> {
        self.users
            .iter_mut()
            .find(|u| u.user.id == id)
            .ok_or_else(|| CoreError::not_found("User"))
    }

    fn seller_mut(&mut self, id: UserId) -> Result<&mut SellerProfile> {
        self.sellers
            .iter_mut()
            .find(|s| s.user_id == id)
            .ok_or_else(|| CoreError::not_found("Seller profile"))
    }

    fn repo_mut(&mut self, id: RepoId) -> Result<&mut RepoListing> {
        self.repos
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| CoreError::not_found("Repository"))
    }

    fn order_mut(&mut self, id: OrderId) -> Result<&mut Order> {
        self.orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| CoreError::not_found("Order"))
    }

    fn append_ledger(
        &mut self,
        seller_id: UserId,
        kind: LedgerKind,
        amount: Cents,
        order_id: Option<OrderId>,
        payout_id: Option<PayoutId>,
        at: DateTime<Utc>,
    ) {
        self.ledger.push(LedgerEntry {
            id: LedgerEntryId::new(),
            seller_id,
            kind,
            amount,
            order_id,
            payout_id,
            created_at: at,
        });
    }
}

/// Newest first; ties keep reverse insertion order.
fn newest_first<T: Clone>(
    rows: &[T],
    keep: impl Fn(&T) -> bool,
    at: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    let mut out: Vec<T> = rows.iter().rev().filter(|r| keep(r)).cloned().collect();
    out.sort_by(|a, b| at(b).cmp(&at(a)));
    out
}

/// Oldest first; ties keep insertion order.
fn oldest_first<T: Clone>(
    rows: &[T],
    keep: impl Fn(&T) -> bool,
    at: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    let mut out: Vec<T> = rows.iter().filter(|r| keep(r)).cloned().collect();
    out.sort_by_key(|r| at(r));
    out
}

fn take(limit: i64) -> usize {
    usize::try_from(limit.max(0)).unwrap_or(usize::MAX)
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryStore")
            .field("users", &state.users.len())
            .field("repos", &state.repos.len())
            .field("orders", &state.orders.len())
            .finish()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock()
    }
}
