//! Catalog search: query-string normalization and the dynamic SQL builder.
//!
//! [`CatalogFilter`] is the validated form of a [`CatalogQuery`] with the
//! viewer's visibility scope resolved. The Postgres adapter turns it into a
//! single `QueryBuilder` statement; the in-memory adapter evaluates
//! [`CatalogFilter::matches`] and [`CatalogFilter::sort`] instead, so both
//! backends agree on semantics.

use std::cmp::Ordering;
use std::fmt;

use repomart_model::{
    CatalogQuery, Cents, RepoListing, SortOrder, User, UserId, Visibility,
};
use serde_json::json;
use sqlx::{Postgres, QueryBuilder};

use crate::error::{CoreError, Result};

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;

/// Columns selected for a [`RepoListing`] row.
pub const LISTING_COLUMNS: &str = "r.id, r.seller_id, r.slug, r.title, r.description, \
     r.language, r.tags, r.price_cents, r.visibility, r.source_url, \
     r.sales_count, r.revenue_cents, r.rating_avg, r.rating_count, \
     r.created_at, r.updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityScope {
    /// Exactly this visibility.
    Only(Visibility),
    /// Every visibility (owners browsing their own store, staff).
    Any,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogFilter {
    /// Free-text term, already trimmed.
    pub text: Option<String>,
    /// Every tag must be present.
    pub tags: Vec<String>,
    pub language: Option<String>,
    pub min_price: Option<Cents>,
    pub max_price: Option<Cents>,
    pub free_only: bool,
    pub visibility: VisibilityScope,
    pub seller_id: Option<UserId>,
    pub sort: SortOrder,
    pub page: i64,
    pub per_page: i64,
}

impl Default for CatalogFilter {
    fn default() -> Self {
        Self {
            text: None,
            tags: Vec::new(),
            language: None,
            min_price: None,
            max_price: None,
            free_only: false,
            visibility: VisibilityScope::Only(Visibility::Public),
            seller_id: None,
            sort: SortOrder::Newest,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// Split a comma separated tag list into lower-cased, unique tags.
pub fn parse_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(',') {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// Escape `\`, `%` and `_` for use inside an ILIKE pattern.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl CatalogFilter {
    /// Validate query-string input and resolve what `viewer` may see.
    pub fn from_query(query: &CatalogQuery, viewer: Option<&User>) -> Result<Self> {
        let page = query.page.unwrap_or(1);
        if page < 1 {
            return Err(CoreError::validation("page must be at least 1"));
        }
        let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE);
        if !(1..=MAX_PER_PAGE).contains(&per_page) {
            return Err(CoreError::validation(format!(
                "per_page must be between 1 and {MAX_PER_PAGE}"
            )));
        }

        let min_price = query.min_price.map(Cents);
        let max_price = query.max_price.map(Cents);
        if min_price.is_some_and(Cents::is_negative)
            || max_price.is_some_and(Cents::is_negative)
        {
            return Err(CoreError::validation("prices cannot be negative"));
        }
        if let (Some(min), Some(max)) = (min_price, max_price)
            && min > max
        {
            return Err(CoreError::validation(
                "min_price cannot exceed max_price",
            ));
        }

        let is_staff = viewer.is_some_and(|user| user.role.can_moderate());
        let is_owner = match (viewer, query.seller_id) {
            (Some(user), Some(seller)) => user.id == seller,
            _ => false,
        };
        let visibility = match query.visibility {
            Some(Visibility::Public) => VisibilityScope::Only(Visibility::Public),
            Some(other) if is_staff || is_owner => VisibilityScope::Only(other),
            Some(_) => {
                return Err(CoreError::forbidden(
                    "Only public listings can be searched",
                ));
            }
            None if is_owner => VisibilityScope::Any,
            None => VisibilityScope::Only(Visibility::Public),
        };

        Ok(Self {
            text: query
                .q
                .as_deref()
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_string),
            tags: query.tags.as_deref().map(parse_tags).unwrap_or_default(),
            language: query
                .language
                .as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string),
            min_price,
            max_price,
            free_only: query.free_only,
            visibility,
            seller_id: query.seller_id,
            sort: query.sort,
            page,
            per_page,
        })
    }

    /// Rows to skip. Pages far past the end saturate and yield an empty page.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    /// Filters worth remembering next to a search-history entry.
    pub fn history_filters(&self) -> serde_json::Value {
        json!({
            "tags": self.tags,
            "language": self.language,
            "min_price": self.min_price,
            "max_price": self.max_price,
            "free_only": self.free_only,
            "sort": self.sort,
        })
    }

    /// Append every `AND ...` predicate. The builder must already hold a
    /// `WHERE` clause (e.g. `WHERE TRUE`) over the `repositories r` alias.
    pub fn push_predicates(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(text) = &self.text {
            let pattern = format!("%{}%", escape_like(text));
            qb.push(" AND (r.title ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR r.description ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }

        if !self.tags.is_empty() {
            qb.push(" AND r.tags @> ");
            qb.push_bind(self.tags.clone());
        }

        if let Some(language) = &self.language {
            qb.push(" AND lower(r.language) = lower(");
            qb.push_bind(language.clone());
            qb.push(")");
        }

        if self.free_only {
            qb.push(" AND r.price_cents = 0");
        }
        if let Some(min) = self.min_price {
            qb.push(" AND r.price_cents >= ");
            qb.push_bind(min.get());
        }
        if let Some(max) = self.max_price {
            qb.push(" AND r.price_cents <= ");
            qb.push_bind(max.get());
        }

        if let VisibilityScope::Only(visibility) = self.visibility {
            qb.push(" AND r.visibility = ");
            qb.push_bind(visibility.as_str());
        }

        if let Some(seller_id) = self.seller_id {
            qb.push(" AND r.seller_id = ");
            qb.push_bind(seller_id.to_uuid());
        }
    }

    pub fn order_by_sql(&self) -> &'static str {
        match self.sort {
            SortOrder::Newest => " ORDER BY r.created_at DESC, r.id DESC",
            SortOrder::PriceAsc => {
                " ORDER BY r.price_cents ASC, r.created_at DESC, r.id DESC"
            }
            SortOrder::PriceDesc => {
                " ORDER BY r.price_cents DESC, r.created_at DESC, r.id DESC"
            }
            SortOrder::BestSelling => {
                " ORDER BY r.sales_count DESC, r.created_at DESC, r.id DESC"
            }
            SortOrder::TopRated => {
                " ORDER BY r.rating_avg DESC NULLS LAST, r.rating_count DESC, \
                 r.created_at DESC, r.id DESC"
            }
        }
    }

    /// `SELECT <columns> ... ORDER BY ... LIMIT/OFFSET` for one page.
    pub fn page_query(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {LISTING_COLUMNS} FROM repositories r WHERE TRUE"
        ));
        self.push_predicates(&mut qb);
        qb.push(self.order_by_sql());
        qb.push(" LIMIT ");
        qb.push_bind(self.per_page);
        qb.push(" OFFSET ");
        qb.push_bind(self.offset());
        qb
    }

    pub fn count_query(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb =
            QueryBuilder::new("SELECT COUNT(*) FROM repositories r WHERE TRUE");
        self.push_predicates(&mut qb);
        qb
    }

    /// In-process equivalent of [`Self::push_predicates`].
    pub fn matches(&self, repo: &RepoListing) -> bool {
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            if !repo.title.to_lowercase().contains(&needle)
                && !repo.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if !self.tags.iter().all(|tag| repo.tags.contains(tag)) {
            return false;
        }
        if let Some(language) = &self.language
            && !repo.language.eq_ignore_ascii_case(language)
        {
            return false;
        }
        if self.free_only && !repo.is_free() {
            return false;
        }
        if self.min_price.is_some_and(|min| repo.price < min)
            || self.max_price.is_some_and(|max| repo.price > max)
        {
            return false;
        }
        if let VisibilityScope::Only(visibility) = self.visibility
            && repo.visibility != visibility
        {
            return false;
        }
        self.seller_id.is_none_or(|seller| repo.seller_id == seller)
    }

    /// In-process equivalent of [`Self::order_by_sql`].
    pub fn sort(&self, repos: &mut [RepoListing]) {
        let newest = |a: &RepoListing, b: &RepoListing| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.to_uuid().cmp(&a.id.to_uuid()))
        };
        match self.sort {
            SortOrder::Newest => repos.sort_by(newest),
            SortOrder::PriceAsc => {
                repos.sort_by(|a, b| a.price.cmp(&b.price).then_with(|| newest(a, b)))
            }
            SortOrder::PriceDesc => {
                repos.sort_by(|a, b| b.price.cmp(&a.price).then_with(|| newest(a, b)))
            }
            SortOrder::BestSelling => repos.sort_by(|a, b| {
                b.sales_count
                    .cmp(&a.sales_count)
                    .then_with(|| newest(a, b))
            }),
            SortOrder::TopRated => repos.sort_by(|a, b| {
                compare_rating(b.rating_avg, a.rating_avg)
                    .then_with(|| b.rating_count.cmp(&a.rating_count))
                    .then_with(|| newest(a, b))
            }),
        }
    }
}

/// Ascending comparison with unrated listings last when used descending.
fn compare_rating(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

impl fmt::Display for VisibilityScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisibilityScope::Only(visibility) => write!(f, "{visibility}"),
            VisibilityScope::Any => f.write_str("any"),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use repomart_model::{RepoId, UserRole};

    use super::*;

    fn user(role: UserRole) -> User {
        let now = Utc::now();
        User {
            id: UserId::new(),
            username: "viewer".into(),
            email: "viewer@example.com".into(),
            display_name: "viewer".into(),
            role,
            is_banned: false,
            created_at: now,
            updated_at: now,
            last_login: None,
        }
    }

    fn listing(title: &str, price: i64, age_minutes: i64) -> RepoListing {
        let at = Utc::now() - Duration::minutes(age_minutes);
        RepoListing {
            id: RepoId::new(),
            seller_id: UserId::new(),
            slug: title.to_lowercase(),
            title: title.into(),
            description: "A handy crate".into(),
            language: "Rust".into(),
            tags: vec!["cli".into(), "async".into()],
            price: Cents(price),
            visibility: Visibility::Public,
            source_url: None,
            sales_count: 0,
            revenue: Cents::ZERO,
            rating_avg: None,
            rating_count: 0,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn defaults_to_public_first_page() {
        let filter = CatalogFilter::from_query(&CatalogQuery::default(), None).unwrap();
        assert_eq!(filter.page, 1);
        assert_eq!(filter.per_page, DEFAULT_PER_PAGE);
        assert_eq!(filter.visibility, VisibilityScope::Only(Visibility::Public));
        assert_eq!(filter.offset(), 0);
    }

    #[test]
    fn huge_page_saturates_offset() {
        let query = CatalogQuery {
            page: Some(i64::MAX),
            per_page: Some(100),
            ..Default::default()
        };
        let filter = CatalogFilter::from_query(&query, None).unwrap();
        assert_eq!(filter.offset(), i64::MAX);

        let third = CatalogQuery { page: Some(3), per_page: Some(25), ..Default::default() };
        assert_eq!(CatalogFilter::from_query(&third, None).unwrap().offset(), 50);
    }

    #[test]
    fn rejects_bad_pagination_and_ranges() {
        let bad = [
            CatalogQuery { page: Some(0), ..Default::default() },
            CatalogQuery { per_page: Some(101), ..Default::default() },
            CatalogQuery { per_page: Some(0), ..Default::default() },
            CatalogQuery { min_price: Some(-1), ..Default::default() },
            CatalogQuery {
                min_price: Some(500),
                max_price: Some(100),
                ..Default::default()
            },
        ];
        for query in bad {
            assert!(matches!(
                CatalogFilter::from_query(&query, None),
                Err(CoreError::Validation(_))
            ));
        }
    }

    #[test]
    fn private_visibility_needs_staff_or_owner() {
        let query = CatalogQuery {
            visibility: Some(Visibility::Private),
            ..Default::default()
        };
        let buyer = user(UserRole::Buyer);
        assert!(matches!(
            CatalogFilter::from_query(&query, Some(&buyer)),
            Err(CoreError::Forbidden(_))
        ));

        let moderator = user(UserRole::Moderator);
        let filter = CatalogFilter::from_query(&query, Some(&moderator)).unwrap();
        assert_eq!(filter.visibility, VisibilityScope::Only(Visibility::Private));

        let seller = user(UserRole::Seller);
        let own = CatalogQuery {
            seller_id: Some(seller.id),
            ..Default::default()
        };
        let filter = CatalogFilter::from_query(&own, Some(&seller)).unwrap();
        assert_eq!(filter.visibility, VisibilityScope::Any);
    }

    #[test]
    fn tags_are_normalized() {
        assert_eq!(parse_tags(" CLI, async ,cli,, "), vec!["cli", "async"]);
    }

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(escape_like("100%_done\\"), "100\\%\\_done\\\\");
    }

    #[test]
    fn builds_parameterized_sql() {
        let filter = CatalogFilter {
            text: Some("parser".into()),
            tags: vec!["cli".into()],
            language: Some("rust".into()),
            min_price: Some(Cents(100)),
            max_price: Some(Cents(900)),
            sort: SortOrder::TopRated,
            ..Default::default()
        };
        let qb = filter.page_query();
        let sql = qb.sql();

        assert!(sql.starts_with("SELECT r.id, r.seller_id"));
        assert!(sql.contains("(r.title ILIKE $1 OR r.description ILIKE $2)"));
        assert!(sql.contains("r.tags @> $3"));
        assert!(sql.contains("lower(r.language) = lower($4)"));
        assert!(sql.contains("r.price_cents >= $5"));
        assert!(sql.contains("r.price_cents <= $6"));
        assert!(sql.contains("r.visibility = $7"));
        assert!(sql.contains("ORDER BY r.rating_avg DESC NULLS LAST"));
        assert!(sql.ends_with("LIMIT $8 OFFSET $9"));
        assert!(!sql.contains("parser"));

        let count = filter.count_query();
        assert!(count.sql().starts_with("SELECT COUNT(*)"));
        assert!(!count.sql().contains("LIMIT"));
    }

    #[test]
    fn owner_scope_skips_visibility_predicate() {
        let filter = CatalogFilter {
            visibility: VisibilityScope::Any,
            seller_id: Some(UserId::new()),
            ..Default::default()
        };
        let qb = filter.count_query();
        assert!(!qb.sql().contains("visibility"));
        assert!(qb.sql().contains("r.seller_id = $1"));
    }

    #[test]
    fn in_memory_matching_mirrors_predicates() {
        let repo = listing("Fast Parser", 500, 0);
        let mut filter = CatalogFilter {
            text: Some("PARSER".into()),
            tags: vec!["cli".into()],
            language: Some("rust".into()),
            ..Default::default()
        };
        assert!(filter.matches(&repo));

        filter.tags.push("web".into());
        assert!(!filter.matches(&repo));

        let free = CatalogFilter {
            free_only: true,
            ..Default::default()
        };
        assert!(!free.matches(&repo));
        assert!(free.matches(&listing("Gratis", 0, 0)));
    }

    #[test]
    fn sorts_like_sql() {
        let mut old_cheap = listing("Old", 100, 30);
        old_cheap.rating_avg = Some(4.5);
        let mut new_pricey = listing("New", 900, 0);
        new_pricey.sales_count = 3;
        let unrated = listing("Unrated", 500, 10);
        let repos = vec![old_cheap, new_pricey, unrated];

        let order = |sort: SortOrder| {
            let filter = CatalogFilter { sort, ..Default::default() };
            let mut sorted = repos.clone();
            filter.sort(&mut sorted);
            sorted.into_iter().map(|r| r.title).collect::<Vec<_>>()
        };

        assert_eq!(order(SortOrder::Newest), ["New", "Unrated", "Old"]);
        assert_eq!(order(SortOrder::PriceAsc), ["Old", "Unrated", "New"]);
        assert_eq!(order(SortOrder::PriceDesc), ["New", "Unrated", "Old"]);
        assert_eq!(order(SortOrder::BestSelling), ["New", "Unrated", "Old"]);
        assert_eq!(order(SortOrder::TopRated)[0], "Old");
    }
}
