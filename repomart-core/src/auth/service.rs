use std::sync::Arc;

use chrono::Duration;
use repomart_model::user::{
    ChangePasswordRequest, LoginRequest, RegisterRequest, SessionResponse,
};
use repomart_model::{SessionId, User, UserId, UserRole};
use tracing::{debug, info, warn};

use super::crypto::AuthCrypto;
use super::validation::{
    normalize_display_name, normalize_email, validate_password,
    validate_username,
};
use crate::application::unit_of_work::AppUnitOfWork;
use crate::clock::Clock;
use crate::database::ports::sessions::SessionRecord;
use crate::error::{CoreError, Result};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Client details recorded with a new session.
#[derive(Debug, Clone, Default)]
pub struct SessionMeta {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

/// A validated session together with its owner.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub user: User,
    pub session: SessionRecord,
}

#[derive(Debug, Clone)]
pub struct AuthService {
    uow: Arc<AppUnitOfWork>,
    crypto: Arc<AuthCrypto>,
    clock: Arc<dyn Clock>,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(
        uow: Arc<AppUnitOfWork>,
        crypto: Arc<AuthCrypto>,
        clock: Arc<dyn Clock>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            uow,
            crypto,
            clock,
            session_ttl,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub async fn register(
        &self,
        request: RegisterRequest,
        meta: SessionMeta,
    ) -> Result<SessionResponse> {
        validate_username(&request.username)?;
        let email = normalize_email(&request.email)?;
        validate_password(&request.password)?;
        let username = request.username.trim().to_string();
        let display_name =
            normalize_display_name(request.display_name.as_deref(), &username)?;

        let password_hash = self.crypto.hash_password(&request.password)?;
        let now = self.clock.now();
        let user = User {
            id: UserId::new(),
            username,
            email,
            display_name,
            role: UserRole::Buyer,
            is_banned: false,
            created_at: now,
            updated_at: now,
            last_login: Some(now),
        };

        self.uow.users.create_user(&user, &password_hash).await?;
        info!(user_id = %user.id, username = %user.username, "user registered");

        self.issue_session(user, meta).await
    }

    pub async fn login(
        &self,
        request: LoginRequest,
        meta: SessionMeta,
    ) -> Result<SessionResponse> {
        let login = request.login.trim();
        if login.is_empty() || request.password.is_empty() {
            return Err(CoreError::Unauthorized(INVALID_CREDENTIALS.into()));
        }

        let Some(credentials) = self.uow.users.find_credentials(login).await?
        else {
            debug!("login attempt for unknown account");
            return Err(CoreError::Unauthorized(INVALID_CREDENTIALS.into()));
        };

        if !self
            .crypto
            .verify_password(&request.password, &credentials.password_hash)?
        {
            warn!(user_id = %credentials.user.id, "failed login attempt");
            return Err(CoreError::Unauthorized(INVALID_CREDENTIALS.into()));
        }

        let mut user = credentials.user;
        if user.is_banned {
            return Err(CoreError::forbidden("Account is banned"));
        }

        let now = self.clock.now();
        self.uow.users.record_login(user.id, now).await?;
        user.last_login = Some(now);

        info!(user_id = %user.id, "user logged in");
        self.issue_session(user, meta).await
    }

    async fn issue_session(
        &self,
        user: User,
        meta: SessionMeta,
    ) -> Result<SessionResponse> {
        let token = self.crypto.generate_session_token()?;
        let now = self.clock.now();
        let session = SessionRecord {
            id: SessionId::new(),
            user_id: user.id,
            token_hash: self.crypto.hash_token(&token),
            created_at: now,
            expires_at: now + self.session_ttl,
            last_seen_at: now,
            revoked: false,
            user_agent: meta.user_agent,
            ip_address: meta.ip_address,
        };
        self.uow.sessions.create_session(&session).await?;

        Ok(SessionResponse {
            user,
            session_token: token,
            expires_at: session.expires_at,
        })
    }

    /// Resolve a bearer/cookie token to its user. Expiry slides forward by a
    /// full TTL once less than half of it remains.
    pub async fn validate_session(
        &self,
        token: &str,
    ) -> Result<AuthenticatedSession> {
        if token.is_empty() {
            return Err(CoreError::Unauthorized("Missing session token".into()));
        }

        let token_hash = self.crypto.hash_token(token);
        let mut session = self
            .uow
            .sessions
            .find_by_token_hash(&token_hash)
            .await?
            .ok_or_else(|| CoreError::Unauthorized("Invalid session".into()))?;

        let now = self.clock.now();
        if !session.is_active(now) {
            return Err(CoreError::Unauthorized("Session expired".into()));
        }

        let user = self
            .uow
            .users
            .get_user(session.user_id)
            .await?
            .ok_or_else(|| CoreError::Unauthorized("Invalid session".into()))?;
        if user.is_banned {
            return Err(CoreError::forbidden("Account is banned"));
        }

        if session.expires_at - now < self.session_ttl / 2 {
            session.expires_at = now + self.session_ttl;
        }
        session.last_seen_at = now;
        self.uow
            .sessions
            .touch_session(session.id, session.last_seen_at, session.expires_at)
            .await?;

        Ok(AuthenticatedSession { user, session })
    }

    /// Revoke the session behind `token`. Unknown or already revoked tokens
    /// are not an error.
    pub async fn logout(&self, token: &str) -> Result<bool> {
        let revoked = self
            .uow
            .sessions
            .revoke_session(&self.crypto.hash_token(token))
            .await?;
        Ok(revoked)
    }

    pub async fn logout_all(&self, user_id: UserId) -> Result<u64> {
        let revoked = self
            .uow
            .sessions
            .revoke_user_sessions(user_id, None)
            .await?;
        info!(user_id = %user_id, revoked, "all sessions revoked");
        Ok(revoked)
    }

    /// Change the password and revoke every other session of the user.
    pub async fn change_password(
        &self,
        user: &User,
        current_session: Option<SessionId>,
        request: ChangePasswordRequest,
    ) -> Result<()> {
        let stored = self
            .uow
            .users
            .get_password_hash(user.id)
            .await?
            .ok_or_else(|| CoreError::not_found("User"))?;

        if !self
            .crypto
            .verify_password(&request.current_password, &stored)?
        {
            return Err(CoreError::Unauthorized(
                "Current password is incorrect".into(),
            ));
        }
        validate_password(&request.new_password)?;
        if request.new_password == request.current_password {
            return Err(CoreError::validation(
                "New password must differ from the current password",
            ));
        }

        let hash = self.crypto.hash_password(&request.new_password)?;
        self.uow.users.update_password(user.id, &hash).await?;
        let revoked = self
            .uow
            .sessions
            .revoke_user_sessions(user.id, current_session)
            .await?;

        info!(user_id = %user.id, revoked, "password changed");
        Ok(())
    }

    pub async fn purge_expired_sessions(&self) -> Result<u64> {
        self.uow.sessions.purge_expired(self.clock.now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestMarket;

    fn register_request(username: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: format!("{username}@example.com"),
            password: "password123".into(),
            display_name: None,
        }
    }

    #[tokio::test]
    async fn register_then_validate_session() {
        let market = TestMarket::new();
        let response = market
            .auth
            .register(register_request("alice"), SessionMeta::default())
            .await
            .unwrap();

        assert_eq!(response.user.role, UserRole::Buyer);
        let session = market
            .auth
            .validate_session(&response.session_token)
            .await
            .unwrap();
        assert_eq!(session.user.id, response.user.id);
    }

    #[tokio::test]
    async fn duplicate_username_is_case_insensitive() {
        let market = TestMarket::new();
        market
            .auth
            .register(register_request("alice"), SessionMeta::default())
            .await
            .unwrap();
        let mut again = register_request("ALICE");
        again.email = "other@example.com".into();

        let err = market
            .auth
            .register(again, SessionMeta::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn login_accepts_username_or_email() {
        let market = TestMarket::new();
        market
            .auth
            .register(register_request("bob"), SessionMeta::default())
            .await
            .unwrap();

        for login in ["bob", "BOB@example.com"] {
            let response = market
                .auth
                .login(
                    LoginRequest {
                        login: login.into(),
                        password: "password123".into(),
                    },
                    SessionMeta::default(),
                )
                .await
                .unwrap();
            assert_eq!(response.user.username, "bob");
            assert!(response.user.last_login.is_some());
        }

        let err = market
            .auth
            .login(
                LoginRequest {
                    login: "bob".into(),
                    password: "wrong-password1".into(),
                },
                SessionMeta::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn sessions_expire_and_slide() {
        let market = TestMarket::new();
        let response = market
            .auth
            .register(register_request("carol"), SessionMeta::default())
            .await
            .unwrap();
        let ttl = market.auth.session_ttl();

        // Past the halfway mark the expiry is pushed out again.
        market.clock.advance(ttl * 3 / 4);
        let refreshed = market
            .auth
            .validate_session(&response.session_token)
            .await
            .unwrap();
        assert_eq!(refreshed.session.expires_at, market.clock.now() + ttl);

        market.clock.advance(ttl + Duration::minutes(1));
        let err = market
            .auth
            .validate_session(&response.session_token)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn logout_revokes_token() {
        let market = TestMarket::new();
        let response = market
            .auth
            .register(register_request("dave"), SessionMeta::default())
            .await
            .unwrap();

        assert!(market.auth.logout(&response.session_token).await.unwrap());
        assert!(!market.auth.logout(&response.session_token).await.unwrap());
        assert!(
            market
                .auth
                .validate_session(&response.session_token)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn change_password_keeps_current_session_only() {
        let market = TestMarket::new();
        let first = market
            .auth
            .register(register_request("erin"), SessionMeta::default())
            .await
            .unwrap();
        let second = market
            .auth
            .login(
                LoginRequest {
                    login: "erin".into(),
                    password: "password123".into(),
                },
                SessionMeta::default(),
            )
            .await
            .unwrap();
        let current = market
            .auth
            .validate_session(&first.session_token)
            .await
            .unwrap();

        market
            .auth
            .change_password(
                &current.user,
                Some(current.session.id),
                ChangePasswordRequest {
                    current_password: "password123".into(),
                    new_password: "newpassword456".into(),
                },
            )
            .await
            .unwrap();

        assert!(market.auth.validate_session(&first.session_token).await.is_ok());
        assert!(market.auth.validate_session(&second.session_token).await.is_err());
        assert!(
            market
                .auth
                .login(
                    LoginRequest {
                        login: "erin".into(),
                        password: "newpassword456".into(),
                    },
                    SessionMeta::default(),
                )
                .await
                .is_ok()
        );
    }
}
