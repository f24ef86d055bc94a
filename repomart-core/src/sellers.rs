//! Seller onboarding and storefront profiles.

use std::sync::Arc;

use repomart_model::seller::{OnboardRequest, UpdateSellerRequest};
use repomart_model::{Cents, SellerProfile, Storefront, User, Visibility};
use tracing::info;

use crate::application::unit_of_work::AppUnitOfWork;
use crate::auth::validation::normalize_email;
use crate::clock::Clock;
use crate::error::{CoreError, Result};

const MAX_STORE_NAME_LEN: usize = 64;
const MAX_BIO_LEN: usize = 2_000;

#[derive(Debug, Clone)]
pub struct SellerService {
    uow: Arc<AppUnitOfWork>,
    clock: Arc<dyn Clock>,
}

fn validate_store_name(name: &str) -> Result<String> {
    let name = name.trim();
    let length = name.chars().count();
    if !(3..=MAX_STORE_NAME_LEN).contains(&length) {
        return Err(CoreError::validation(format!(
            "Store name must be between 3 and {MAX_STORE_NAME_LEN} characters"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.' | '\''))
    {
        return Err(CoreError::validation(
            "Store name contains unsupported characters",
        ));
    }
    Ok(name.to_string())
}

fn normalize_bio(bio: Option<String>) -> Result<Option<String>> {
    let bio = bio.map(|b| b.trim().to_string()).filter(|b| !b.is_empty());
    if let Some(bio) = &bio
        && bio.chars().count() > MAX_BIO_LEN
    {
        return Err(CoreError::validation(format!(
            "Bio cannot exceed {MAX_BIO_LEN} characters"
        )));
    }
    Ok(bio)
}

impl SellerService {
    pub fn new(uow: Arc<AppUnitOfWork>, clock: Arc<dyn Clock>) -> Self {
        Self { uow, clock }
    }

    /// Turn a buyer into a seller. The profile insert and the role switch
    /// commit together.
    pub async fn onboard(
        &self,
        user: &User,
        request: OnboardRequest,
    ) -> Result<SellerProfile> {
        if user.role.can_moderate() {
            return Err(CoreError::forbidden(
                "Staff accounts cannot open a store",
            ));
        }
        if user.role.is_seller()
            || self.uow.sellers.get_profile(user.id).await?.is_some()
        {
            return Err(CoreError::conflict("Already onboarded as a seller"));
        }

        let now = self.clock.now();
        let profile = SellerProfile {
            user_id: user.id,
            store_name: validate_store_name(&request.store_name)?,
            bio: normalize_bio(request.bio)?,
            payout_email: normalize_email(&request.payout_email)?,
            balance: Cents::ZERO,
            pending_payout: Cents::ZERO,
            lifetime_earnings: Cents::ZERO,
            total_paid_out: Cents::ZERO,
            total_sales: 0,
            last_payout_requested_at: None,
            created_at: now,
            updated_at: now,
        };

        self.uow.sellers.onboard(&profile).await?;
        info!(user_id = %user.id, store = %profile.store_name, "seller onboarded");
        Ok(profile)
    }

    pub async fn get_profile(&self, user: &User) -> Result<SellerProfile> {
        self.uow
            .sellers
            .get_profile(user.id)
            .await?
            .ok_or_else(|| CoreError::not_found("Seller profile"))
    }

    pub async fn update_profile(
        &self,
        user: &User,
        request: UpdateSellerRequest,
    ) -> Result<SellerProfile> {
        let mut profile = self.get_profile(user).await?;
        if let Some(bio) = request.bio {
            profile.bio = normalize_bio(Some(bio))?;
        }
        if let Some(email) = request.payout_email {
            profile.payout_email = normalize_email(&email)?;
        }
        profile.updated_at = self.clock.now();
        self.uow.sellers.update_profile(&profile).await?;
        Ok(profile)
    }

    /// Public profile plus public listings. Balances are never exposed.
    pub async fn public_storefront(&self, store_name: &str) -> Result<Storefront> {
        let profile = self
            .uow
            .sellers
            .get_by_store_name(store_name.trim())
            .await?
            .ok_or_else(|| CoreError::not_found("Store"))?;

        let repositories = self
            .uow
            .catalog
            .list_by_seller(profile.user_id)
            .await?
            .into_iter()
            .filter(|repo| repo.visibility == Visibility::Public)
            .collect();

        Ok(Storefront {
            store_name: profile.store_name,
            bio: profile.bio,
            seller_id: profile.user_id,
            total_sales: profile.total_sales,
            created_at: profile.created_at,
            repositories,
        })
    }
}
