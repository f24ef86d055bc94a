//! Repository listings: creation, editing, visibility and search.

pub mod filter;
pub mod service;
pub mod slug;

pub use filter::{CatalogFilter, VisibilityScope};
pub use service::CatalogService;
