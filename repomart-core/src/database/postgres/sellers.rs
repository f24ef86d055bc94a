use async_trait::async_trait;
use repomart_model::{SellerProfile, UserId, UserRole};
use sqlx::PgPool;
use tracing::info;

use super::rows::{SELLER_COLUMNS, SellerRow};
use crate::database::ports::sellers::SellersRepository;
use crate::error::{CoreError, Result};

#[derive(Clone, Debug)]
pub struct PostgresSellersRepository {
    pool: PgPool,
}

impl PostgresSellersRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SellersRepository for PostgresSellersRepository {
    async fn onboard(&self, profile: &SellerProfile) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO seller_profiles (
                user_id, store_name, bio, payout_email, balance_cents,
                pending_payout_cents, lifetime_earnings_cents,
                total_paid_out_cents, total_sales, last_payout_requested_at,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, 0, 0, 0, 0, 0, NULL, $5, $6)
            "#,
        )
        .bind(profile.user_id.to_uuid())
        .bind(&profile.store_name)
        .bind(&profile.bio)
        .bind(&profile.payout_email)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&mut *tx)
        .await?;

        let updated = sqlx::query(
            "UPDATE users SET role = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(profile.user_id.to_uuid())
        .bind(UserRole::Seller.as_str())
        .bind(profile.created_at)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(CoreError::not_found("User"));
        }

        tx.commit().await?;
        info!(
            user_id = %profile.user_id,
            store_name = %profile.store_name,
            "seller onboarded"
        );
        Ok(())
    }

    async fn get_profile(&self, user_id: UserId) -> Result<Option<SellerProfile>> {
        let row: Option<SellerRow> = sqlx::query_as(&format!(
            "SELECT {SELLER_COLUMNS} FROM seller_profiles WHERE user_id = $1"
        ))
        .bind(user_id.to_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn get_by_store_name(
        &self,
        store_name: &str,
    ) -> Result<Option<SellerProfile>> {
        let row: Option<SellerRow> = sqlx::query_as(&format!(
            "SELECT {SELLER_COLUMNS} FROM seller_profiles \
             WHERE lower(store_name) = lower($1)"
        ))
        .bind(store_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn update_profile(&self, profile: &SellerProfile) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE seller_profiles
            SET bio = $2, payout_email = $3, updated_at = $4
            WHERE user_id = $1
            "#,
        )
        .bind(profile.user_id.to_uuid())
        .bind(&profile.bio)
        .bind(&profile.payout_email)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("Seller profile"));
        }
        Ok(())
    }
}
