use async_trait::async_trait;
use chrono::{DateTime, Utc};
use repomart_model::user::UserFilter;
use repomart_model::{SellerProfile, SessionId, User, UserId, UserRole};

use super::{MemoryStore, StoredUser, oldest_first, take};
use crate::database::ports::sellers::SellersRepository;
use crate::database::ports::sessions::{SessionRecord, SessionsRepository};
use crate::database::ports::users::{Credentials, UsersRepository};
use crate::error::{CoreError, Result};

#[async_trait]
impl UsersRepository for MemoryStore {
    async fn create_user(&self, user: &User, password_hash: &str) -> Result<()> {
        let mut state = self.lock();
        for existing in &state.users {
            if existing.user.username.eq_ignore_ascii_case(&user.username) {
                return Err(CoreError::conflict("Username already exists"));
            }
            if existing.user.email.eq_ignore_ascii_case(&user.email) {
                return Err(CoreError::conflict("Email already exists"));
            }
        }
        state.users.push(StoredUser {
            user: user.clone(),
            password_hash: password_hash.to_string(),
        });
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| u.user.id == id)
            .map(|u| u.user.clone()))
    }

    async fn find_credentials(&self, login: &str) -> Result<Option<Credentials>> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| {
                u.user.username.eq_ignore_ascii_case(login)
                    || u.user.email.eq_ignore_ascii_case(login)
            })
            .map(|u| Credentials {
                user: u.user.clone(),
                password_hash: u.password_hash.clone(),
            }))
    }

    async fn get_password_hash(&self, id: UserId) -> Result<Option<String>> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| u.user.id == id)
            .map(|u| u.password_hash.clone()))
    }

    async fn update_password(&self, id: UserId, password_hash: &str) -> Result<()> {
        self.lock().user_mut(id)?.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<()> {
        self.lock().user_mut(id)?.user.last_login = Some(at);
        Ok(())
    }

    async fn set_role(&self, id: UserId, role: UserRole) -> Result<()> {
        self.lock().user_mut(id)?.user.role = role;
        Ok(())
    }

    async fn set_banned(&self, id: UserId, banned: bool) -> Result<()> {
        self.lock().user_mut(id)?.user.is_banned = banned;
        Ok(())
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let state = self.lock();
        let needle = filter.search.as_ref().map(|s| s.to_lowercase());
        let users = oldest_first(
            &state.users,
            |u| {
                filter.role.is_none_or(|role| u.user.role == role)
                    && filter.banned.is_none_or(|b| u.user.is_banned == b)
                    && needle.as_ref().is_none_or(|n| {
                        u.user.username.to_lowercase().contains(n)
                            || u.user.email.to_lowercase().contains(n)
                            || u.user.display_name.to_lowercase().contains(n)
                    })
            },
            |u| u.user.created_at,
        );
        Ok(users
            .into_iter()
            .skip(take(filter.offset.unwrap_or(0)))
            .take(take(filter.limit.unwrap_or(50)))
            .map(|u| u.user)
            .collect())
    }
}

#[async_trait]
impl SessionsRepository for MemoryStore {
    async fn create_session(&self, session: &SessionRecord) -> Result<()> {
        self.lock().sessions.push(session.clone());
        Ok(())
    }

    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<SessionRecord>> {
        Ok(self
            .lock()
            .sessions
            .iter()
            .find(|s| s.token_hash == token_hash)
            .cloned())
    }

    async fn touch_session(
        &self,
        id: SessionId,
        last_seen_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.lock();
        if let Some(session) = state.sessions.iter_mut().find(|s| s.id == id) {
            session.last_seen_at = last_seen_at;
            session.expires_at = expires_at;
        }
        Ok(())
    }

    async fn revoke_session(&self, token_hash: &str) -> Result<bool> {
        let mut state = self.lock();
        match state
            .sessions
            .iter_mut()
            .find(|s| s.token_hash == token_hash && !s.revoked)
        {
            Some(session) => {
                session.revoked = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn revoke_user_sessions(
        &self,
        user_id: UserId,
        keep: Option<SessionId>,
    ) -> Result<u64> {
        let mut state = self.lock();
        let mut revoked = 0;
        for session in state.sessions.iter_mut().filter(|s| {
            s.user_id == user_id && !s.revoked && Some(s.id) != keep
        }) {
            session.revoked = true;
            revoked += 1;
        }
        Ok(revoked)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut state = self.lock();
        let before = state.sessions.len();
        state.sessions.retain(|s| s.is_active(now));
        Ok((before - state.sessions.len()) as u64)
    }
}

#[async_trait]
impl SellersRepository for MemoryStore {
    async fn onboard(&self, profile: &SellerProfile) -> Result<()> {
        let mut state = self.lock();
        for existing in &state.sellers {
            if existing.user_id == profile.user_id {
                return Err(CoreError::conflict("Already onboarded as a seller"));
            }
            if existing.store_name.to_lowercase() == profile.store_name.to_lowercase() {
                return Err(CoreError::conflict("Store name already taken"));
            }
        }
        let user = state.user_mut(profile.user_id)?;
        user.user.role = UserRole::Seller;
        user.user.updated_at = profile.created_at;
        state.sellers.push(profile.clone());
        Ok(())
    }

    async fn get_profile(&self, user_id: UserId) -> Result<Option<SellerProfile>> {
        Ok(self
            .lock()
            .sellers
            .iter()
            .find(|s| s.user_id == user_id)
            .cloned())
    }

    async fn get_by_store_name(
        &self,
        store_name: &str,
    ) -> Result<Option<SellerProfile>> {
        Ok(self
            .lock()
            .sellers
            .iter()
            .find(|s| s.store_name.to_lowercase() == store_name.to_lowercase())
            .cloned())
    }

    async fn update_profile(&self, profile: &SellerProfile) -> Result<()> {
        let mut state = self.lock();
        let stored = state.seller_mut(profile.user_id)?;
        stored.bio = profile.bio.clone();
        stored.payout_email = profile.payout_email.clone();
        stored.updated_at = profile.updated_at;
        Ok(())
    }
}
