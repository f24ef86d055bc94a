//! Data model definitions shared between the Repomart server and its clients.
#![allow(missing_docs)]

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident : $kind:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash,
            serde::Serialize, serde::Deserialize,
        )]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::error::ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::error::ModelError::invalid($kind, other)),
                }
            }
        }
    };
}

pub mod api;
pub mod catalog;
pub mod comment;
pub mod dashboard;
pub mod error;
pub mod ids;
pub mod money;
pub mod order;
pub mod payout;
pub mod routes;
pub mod search;
pub mod seller;
pub mod user;

pub use api::ApiResponse;
pub use catalog::{
    CatalogQuery, Page, RepoDraft, RepoListing, RepoPatch, SortOrder,
    Visibility,
};
pub use comment::{Comment, Review, VoteDirection};
pub use error::{ModelError, Result as ModelResult};
pub use ids::{
    CommentId, LedgerEntryId, OrderId, PayoutId, RepoId, ReviewId,
    SearchEntryId, SessionId, UserId,
};
pub use money::Cents;
pub use order::{AccessGrant, Order, OrderStatus};
pub use payout::{LedgerEntry, LedgerKind, PayoutRequest, PayoutStatus};
pub use search::{SearchHistoryEntry, TrendingQuery};
pub use seller::{SellerProfile, Storefront};
pub use user::{User, UserRole};
