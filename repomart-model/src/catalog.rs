use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{RepoId, UserId};
use crate::money::Cents;

string_enum! {
    pub enum Visibility: "visibility" {
        Public => "public",
        Unlisted => "unlisted",
        Private => "private",
    }
}

impl Visibility {
    /// Whether a listing with this visibility can be bought.
    pub fn is_purchasable(&self) -> bool {
        !matches!(self, Visibility::Private)
    }
}

string_enum! {
    pub enum SortOrder: "sort order" {
        Newest => "newest",
        PriceAsc => "price_asc",
        PriceDesc => "price_desc",
        BestSelling => "best_selling",
        TopRated => "top_rated",
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Newest
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoListing {
    pub id: RepoId,
    pub seller_id: UserId,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub language: String,
    pub tags: Vec<String>,
    pub price: Cents,
    pub visibility: Visibility,
    pub source_url: Option<String>,
    pub sales_count: i64,
    pub revenue: Cents,
    pub rating_avg: Option<f64>,
    pub rating_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RepoListing {
    pub fn is_free(&self) -> bool {
        self.price.is_zero()
    }
}

/// Payload for creating a listing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepoDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub language: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub price: Cents,
    #[serde(default = "default_visibility")]
    pub visibility: Visibility,
    #[serde(default)]
    pub source_url: Option<String>,
}

fn default_visibility() -> Visibility {
    Visibility::Public
}

/// Partial update of a listing; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RepoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub tags: Option<Vec<String>>,
    pub price: Option<Cents>,
    pub visibility: Option<Visibility>,
    pub source_url: Option<String>,
}

/// Catalog search parameters as accepted on the query string.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CatalogQuery {
    pub q: Option<String>,
    /// Comma separated list, every tag must match.
    pub tags: Option<String>,
    pub language: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    #[serde(default)]
    pub free_only: bool,
    pub visibility: Option<Visibility>,
    pub seller_id: Option<UserId>,
    #[serde(default)]
    pub sort: SortOrder,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> i64 {
        if self.per_page <= 0 {
            return 0;
        }
        (self.total + self.per_page - 1) / self.per_page
    }
}
