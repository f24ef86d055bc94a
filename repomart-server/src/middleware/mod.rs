pub mod auth;

pub use auth::{
    CurrentUser, RoleGate, SESSION_COOKIE, optional_session_layer, require_role,
    session_layer,
};
