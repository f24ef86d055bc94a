//! # Repomart Core
//!
//! Domain rules and persistence for the Repomart marketplace: accounts and
//! sessions, seller storefronts, the repository catalog, checkout with a
//! hosted payment provider, seller balances and payouts, and community
//! moderation.
//!
//! Services depend on the repository ports in [`database::ports`]. The
//! [`application::AppUnitOfWork`] bundles one implementation of each port,
//! either PostgreSQL ([`database::PostgresDatabase`]) or the in-memory
//! [`database::MemoryStore`], and [`application::Marketplace`] wires every
//! service on top of it.

#![allow(missing_docs)]

/// Service wiring and the unit of work
pub mod application;

/// Registration, sessions and user administration
pub mod auth;

/// Listing management and catalog search
pub mod catalog;

/// Orders, settlement and refunds
pub mod checkout;

pub mod clock;

/// Admin and seller reporting
pub mod dashboards;

/// Repository ports and their PostgreSQL / in-memory adapters
pub mod database;

/// Error types and error handling utilities
pub mod error;

/// Comments, votes, reviews and the profanity filter
pub mod moderation;

/// Payment provider integration
pub mod payments;

/// Seller payout requests and the payout ledger
pub mod payouts;

pub mod search_history;

pub mod sellers;

/// Marketplace-wide policy knobs
pub mod settings;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[cfg(test)]
pub(crate) mod test_support;

pub use application::{AppUnitOfWork, Marketplace};
pub use clock::{Clock, ManualClock, SystemClock};
pub use database::{MemoryStore, PostgresDatabase};
pub use error::{CoreError, Result};
pub use settings::MarketplaceSettings;
