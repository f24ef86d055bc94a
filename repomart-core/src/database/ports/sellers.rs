use async_trait::async_trait;
use repomart_model::{SellerProfile, UserId};

use crate::error::Result;

#[async_trait]
pub trait SellersRepository: Send + Sync {
    /// Create the seller profile and switch the user's role to `seller` in
    /// one transaction.
    async fn onboard(&self, profile: &SellerProfile) -> Result<()>;
    async fn get_profile(&self, user_id: UserId) -> Result<Option<SellerProfile>>;
    async fn get_by_store_name(
        &self,
        store_name: &str,
    ) -> Result<Option<SellerProfile>>;
    /// Persist the editable profile fields (bio, payout email).
    async fn update_profile(&self, profile: &SellerProfile) -> Result<()>;
}
