//! Admin-side account management: listing, role changes and bans.

use std::sync::Arc;

use repomart_model::user::UserFilter;
use repomart_model::{User, UserId, UserRole};
use tracing::info;

use crate::application::unit_of_work::AppUnitOfWork;
use crate::error::{CoreError, Result};

const DEFAULT_PAGE: i64 = 50;
const MAX_PAGE: i64 = 500;

#[derive(Debug, Clone)]
pub struct UserAdminService {
    uow: Arc<AppUnitOfWork>,
}

impl UserAdminService {
    pub fn new(uow: Arc<AppUnitOfWork>) -> Self {
        Self { uow }
    }

    fn require_admin(actor: &User) -> Result<()> {
        if actor.role.is_admin() {
            Ok(())
        } else {
            Err(CoreError::forbidden("Admin access required"))
        }
    }

    async fn target(&self, user_id: UserId) -> Result<User> {
        self.uow
            .users
            .get_user(user_id)
            .await?
            .ok_or_else(|| CoreError::not_found("User"))
    }

    pub async fn list_users(
        &self,
        admin: &User,
        mut filter: UserFilter,
    ) -> Result<Vec<User>> {
        Self::require_admin(admin)?;
        filter.limit = Some(filter.limit.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE));
        filter.offset = Some(filter.offset.unwrap_or(0).max(0));
        filter.search = filter
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self.uow.users.list_users(&filter).await
    }

    pub async fn set_role(
        &self,
        admin: &User,
        user_id: UserId,
        role: UserRole,
    ) -> Result<User> {
        Self::require_admin(admin)?;
        if user_id == admin.id && role != admin.role {
            return Err(CoreError::forbidden("Admins cannot change their own role"));
        }

        let mut user = self.target(user_id).await?;
        if role == UserRole::Seller
            && self.uow.sellers.get_profile(user_id).await?.is_none()
        {
            return Err(CoreError::validation(
                "User must complete seller onboarding before becoming a seller",
            ));
        }

        self.uow.users.set_role(user_id, role).await?;
        info!(
            admin_id = %admin.id,
            user_id = %user_id,
            from = %user.role,
            to = %role,
            "user role changed"
        );
        user.role = role;
        Ok(user)
    }

    /// Ban an account and revoke all of its sessions.
    pub async fn ban(&self, admin: &User, user_id: UserId) -> Result<User> {
        Self::require_admin(admin)?;
        if user_id == admin.id {
            return Err(CoreError::forbidden("Admins cannot ban themselves"));
        }
        let mut user = self.target(user_id).await?;
        if user.role.is_admin() {
            return Err(CoreError::forbidden("Admins cannot ban other admins"));
        }

        self.uow.users.set_banned(user_id, true).await?;
        let revoked = self
            .uow
            .sessions
            .revoke_user_sessions(user_id, None)
            .await?;
        info!(admin_id = %admin.id, user_id = %user_id, revoked, "user banned");
        user.is_banned = true;
        Ok(user)
    }

    pub async fn unban(&self, admin: &User, user_id: UserId) -> Result<User> {
        Self::require_admin(admin)?;
        let mut user = self.target(user_id).await?;
        self.uow.users.set_banned(user_id, false).await?;
        info!(admin_id = %admin.id, user_id = %user_id, "user unbanned");
        user.is_banned = false;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestMarket;

    #[tokio::test]
    async fn ban_revokes_sessions_and_blocks_login() {
        let market = TestMarket::new();
        let admin = market.admin("root_admin").await;
        let (user, token) = market.buyer_with_token("mallory").await;

        market.users.ban(&admin, user.id).await.unwrap();

        assert!(market.auth.validate_session(&token).await.is_err());
        let err = market
            .auth
            .login(
                repomart_model::user::LoginRequest {
                    login: "mallory".into(),
                    password: TestMarket::PASSWORD.into(),
                },
                Default::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));

        market.users.unban(&admin, user.id).await.unwrap();
        assert!(
            market
                .auth
                .login(
                    repomart_model::user::LoginRequest {
                        login: "mallory".into(),
                        password: TestMarket::PASSWORD.into(),
                    },
                    Default::default(),
                )
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn admins_cannot_ban_or_demote_admins_carelessly() {
        let market = TestMarket::new();
        let admin = market.admin("first_admin").await;
        let other = market.admin("second_admin").await;

        assert!(matches!(
            market.users.ban(&admin, admin.id).await,
            Err(CoreError::Forbidden(_))
        ));
        assert!(matches!(
            market.users.ban(&admin, other.id).await,
            Err(CoreError::Forbidden(_))
        ));
        assert!(matches!(
            market.users.set_role(&admin, admin.id, UserRole::Buyer).await,
            Err(CoreError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn promote_to_moderator_and_filter() {
        let market = TestMarket::new();
        let admin = market.admin("boss").await;
        let user = market.buyer("helper").await;

        let updated = market
            .users
            .set_role(&admin, user.id, UserRole::Moderator)
            .await
            .unwrap();
        assert_eq!(updated.role, UserRole::Moderator);

        let moderators = market
            .users
            .list_users(
                &admin,
                UserFilter {
                    role: Some(UserRole::Moderator),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moderators.len(), 1);
        assert_eq!(moderators[0].id, user.id);

        assert!(matches!(
            market.users.set_role(&admin, user.id, UserRole::Seller).await,
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            market.users.list_users(&user, UserFilter::default()).await,
            Err(CoreError::Forbidden(_))
        ));
    }
}
