//! Accounts, credentials and login sessions.

pub mod crypto;
pub mod service;
pub mod users;
pub mod validation;

pub use crypto::{AuthCrypto, AuthCryptoError};
pub use service::{AuthService, AuthenticatedSession, SessionMeta};
pub use users::UserAdminService;
