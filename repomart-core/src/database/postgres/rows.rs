//! Raw row shapes and their conversion into model types.

use chrono::{DateTime, Utc};
use repomart_model::{
    Cents, Comment, LedgerEntry, Order, PayoutRequest, RepoListing, Review,
    SearchHistoryEntry, SellerProfile, User,
};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::ports::sessions::SessionRecord;
use crate::error::{CoreError, Result};

pub(super) const USER_COLUMNS: &str = "id, username, email, display_name, role, is_banned, \
     created_at, updated_at, last_login";

pub(super) const SESSION_COLUMNS: &str = "id, user_id, token_hash, created_at, expires_at, \
     last_seen_at, revoked, user_agent, ip_address";

pub(super) const SELLER_COLUMNS: &str = "user_id, store_name, bio, payout_email, \
     balance_cents, pending_payout_cents, lifetime_earnings_cents, \
     total_paid_out_cents, total_sales, last_payout_requested_at, created_at, updated_at";

pub(super) const ORDER_COLUMNS: &str = "id, buyer_id, repo_id, seller_id, amount_cents, \
     platform_fee_cents, seller_amount_cents, currency, status, payment_intent_id, \
     created_at, paid_at";

pub(super) const PAYOUT_COLUMNS: &str = "id, seller_id, amount_cents, status, requested_at, \
     decided_at, decided_by, note";

pub(super) const COMMENT_COLUMNS: &str = "id, repo_id, author_id, parent_id, body, \
     is_flagged, flag_reason, is_deleted, upvotes, downvotes, created_at, updated_at";

pub(super) const REVIEW_COLUMNS: &str = "id, repo_id, author_id, rating, body, is_flagged, \
     flag_reason, created_at, updated_at";

pub(super) const SEARCH_COLUMNS: &str = "id, user_id, query, filters, searched_at";

#[derive(Debug, FromRow)]
pub(super) struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    display_name: String,
    role: String,
    is_banned: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = CoreError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: row.id.into(),
            username: row.username,
            email: row.email,
            display_name: row.display_name,
            role: row.role.parse()?,
            is_banned: row.is_banned,
            created_at: row.created_at,
            updated_at: row.updated_at,
            last_login: row.last_login,
        })
    }
}

#[derive(Debug, FromRow)]
pub(super) struct SessionRow {
    id: Uuid,
    user_id: Uuid,
    token_hash: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    last_seen_at: DateTime<Utc>,
    revoked: bool,
    user_agent: Option<String>,
    ip_address: Option<String>,
}

impl From<SessionRow> for SessionRecord {
    fn from(row: SessionRow) -> Self {
        SessionRecord {
            id: row.id.into(),
            user_id: row.user_id.into(),
            token_hash: row.token_hash,
            created_at: row.created_at,
            expires_at: row.expires_at,
            last_seen_at: row.last_seen_at,
            revoked: row.revoked,
            user_agent: row.user_agent,
            ip_address: row.ip_address,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct SellerRow {
    user_id: Uuid,
    store_name: String,
    bio: Option<String>,
    payout_email: String,
    balance_cents: i64,
    pending_payout_cents: i64,
    lifetime_earnings_cents: i64,
    total_paid_out_cents: i64,
    total_sales: i64,
    last_payout_requested_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SellerRow> for SellerProfile {
    fn from(row: SellerRow) -> Self {
        SellerProfile {
            user_id: row.user_id.into(),
            store_name: row.store_name,
            bio: row.bio,
            payout_email: row.payout_email,
            balance: Cents(row.balance_cents),
            pending_payout: Cents(row.pending_payout_cents),
            lifetime_earnings: Cents(row.lifetime_earnings_cents),
            total_paid_out: Cents(row.total_paid_out_cents),
            total_sales: row.total_sales,
            last_payout_requested_at: row.last_payout_requested_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Matches `catalog::filter::LISTING_COLUMNS`.
#[derive(Debug, FromRow)]
pub(super) struct RepoRow {
    id: Uuid,
    seller_id: Uuid,
    slug: String,
    title: String,
    description: String,
    language: String,
    tags: Vec<String>,
    price_cents: i64,
    visibility: String,
    source_url: Option<String>,
    sales_count: i64,
    revenue_cents: i64,
    rating_avg: Option<f64>,
    rating_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RepoRow> for RepoListing {
    type Error = CoreError;

    fn try_from(row: RepoRow) -> Result<Self> {
        Ok(RepoListing {
            id: row.id.into(),
            seller_id: row.seller_id.into(),
            slug: row.slug,
            title: row.title,
            description: row.description,
            language: row.language,
            tags: row.tags,
            price: Cents(row.price_cents),
            visibility: row.visibility.parse()?,
            source_url: row.source_url,
            sales_count: row.sales_count,
            revenue: Cents(row.revenue_cents),
            rating_avg: row.rating_avg,
            rating_count: row.rating_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(super) struct SearchRow {
    id: Uuid,
    user_id: Uuid,
    query: String,
    filters: serde_json::Value,
    searched_at: DateTime<Utc>,
}

impl From<SearchRow> for SearchHistoryEntry {
    fn from(row: SearchRow) -> Self {
        SearchHistoryEntry {
            id: row.id.into(),
            user_id: row.user_id.into(),
            query: row.query,
            filters: row.filters,
            searched_at: row.searched_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct OrderRow {
    id: Uuid,
    buyer_id: Uuid,
    repo_id: Uuid,
    seller_id: Uuid,
    amount_cents: i64,
    platform_fee_cents: i64,
    seller_amount_cents: i64,
    currency: String,
    status: String,
    payment_intent_id: Option<String>,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
}

impl TryFrom<OrderRow> for Order {
    type Error = CoreError;

    fn try_from(row: OrderRow) -> Result<Self> {
        Ok(Order {
            id: row.id.into(),
            buyer_id: row.buyer_id.into(),
            repo_id: row.repo_id.into(),
            seller_id: row.seller_id.into(),
            amount: Cents(row.amount_cents),
            platform_fee: Cents(row.platform_fee_cents),
            seller_amount: Cents(row.seller_amount_cents),
            currency: row.currency,
            status: row.status.parse()?,
            payment_intent_id: row.payment_intent_id,
            created_at: row.created_at,
            paid_at: row.paid_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(super) struct PayoutRow {
    id: Uuid,
    seller_id: Uuid,
    amount_cents: i64,
    status: String,
    requested_at: DateTime<Utc>,
    decided_at: Option<DateTime<Utc>>,
    decided_by: Option<Uuid>,
    note: Option<String>,
}

impl TryFrom<PayoutRow> for PayoutRequest {
    type Error = CoreError;

    fn try_from(row: PayoutRow) -> Result<Self> {
        Ok(PayoutRequest {
            id: row.id.into(),
            seller_id: row.seller_id.into(),
            amount: Cents(row.amount_cents),
            status: row.status.parse()?,
            requested_at: row.requested_at,
            decided_at: row.decided_at,
            decided_by: row.decided_by.map(Into::into),
            note: row.note,
        })
    }
}

#[derive(Debug, FromRow)]
pub(super) struct LedgerRow {
    id: Uuid,
    seller_id: Uuid,
    kind: String,
    amount_cents: i64,
    order_id: Option<Uuid>,
    payout_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<LedgerRow> for LedgerEntry {
    type Error = CoreError;

    fn try_from(row: LedgerRow) -> Result<Self> {
        Ok(LedgerEntry {
            id: row.id.into(),
            seller_id: row.seller_id.into(),
            kind: row.kind.parse()?,
            amount: Cents(row.amount_cents),
            order_id: row.order_id.map(Into::into),
            payout_id: row.payout_id.map(Into::into),
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(super) struct CommentRow {
    id: Uuid,
    repo_id: Uuid,
    author_id: Uuid,
    parent_id: Option<Uuid>,
    body: String,
    is_flagged: bool,
    flag_reason: Option<String>,
    is_deleted: bool,
    upvotes: i64,
    downvotes: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id.into(),
            repo_id: row.repo_id.into(),
            author_id: row.author_id.into(),
            parent_id: row.parent_id.map(Into::into),
            body: row.body,
            is_flagged: row.is_flagged,
            flag_reason: row.flag_reason,
            is_deleted: row.is_deleted,
            upvotes: row.upvotes,
            downvotes: row.downvotes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct ReviewRow {
    id: Uuid,
    repo_id: Uuid,
    author_id: Uuid,
    rating: i16,
    body: Option<String>,
    is_flagged: bool,
    flag_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Review {
            id: row.id.into(),
            repo_id: row.repo_id.into(),
            author_id: row.author_id.into(),
            rating: row.rating,
            body: row.body,
            is_flagged: row.is_flagged,
            flag_reason: row.flag_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Convert every row, failing on the first bad enum value.
pub(super) fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = CoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}
