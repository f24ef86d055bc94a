//! Seller payout workflow: request with cooldown/minimum/balance checks,
//! admin approval or rejection.

pub mod policy;

use std::sync::Arc;

use repomart_model::{
    Cents, LedgerEntry, PayoutId, PayoutRequest, PayoutStatus, User,
};
use tracing::info;

use crate::application::unit_of_work::AppUnitOfWork;
use crate::clock::Clock;
use crate::database::ports::payouts::PayoutDecision;
use crate::error::{CoreError, Result};
use crate::settings::MarketplaceSettings;

const LEDGER_PAGE: i64 = 200;

#[derive(Debug, Clone)]
pub struct PayoutService {
    uow: Arc<AppUnitOfWork>,
    settings: Arc<MarketplaceSettings>,
    clock: Arc<dyn Clock>,
}

impl PayoutService {
    pub fn new(
        uow: Arc<AppUnitOfWork>,
        settings: Arc<MarketplaceSettings>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            uow,
            settings,
            clock,
        }
    }

    pub async fn request_payout(
        &self,
        seller: &User,
        amount: Cents,
    ) -> Result<PayoutRequest> {
        if !seller.role.is_seller() {
            return Err(CoreError::forbidden("Only sellers can request payouts"));
        }
        if self.uow.sellers.get_profile(seller.id).await?.is_none() {
            return Err(CoreError::not_found("Seller profile"));
        }

        let policy = self.settings.payout_policy();
        let request = self
            .uow
            .payouts
            .request_payout(seller.id, amount, &policy, self.clock.now())
            .await?;

        info!(
            payout_id = %request.id,
            seller_id = %seller.id,
            amount = %request.amount,
            "payout requested"
        );
        Ok(request)
    }

    pub async fn approve(
        &self,
        admin: &User,
        payout_id: PayoutId,
        note: Option<String>,
    ) -> Result<PayoutRequest> {
        self.decide(admin, payout_id, PayoutDecision::Approve, note)
            .await
    }

    pub async fn reject(
        &self,
        admin: &User,
        payout_id: PayoutId,
        note: Option<String>,
    ) -> Result<PayoutRequest> {
        let note = note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                CoreError::validation("A rejection note is required")
            })?;
        self.decide(admin, payout_id, PayoutDecision::Reject, Some(note))
            .await
    }

    async fn decide(
        &self,
        admin: &User,
        payout_id: PayoutId,
        decision: PayoutDecision,
        note: Option<String>,
    ) -> Result<PayoutRequest> {
        if !admin.role.is_admin() {
            return Err(CoreError::forbidden("Admin access required"));
        }
        let resolved = self
            .uow
            .payouts
            .decide(payout_id, decision, admin.id, note, self.clock.now())
            .await?;

        info!(
            payout_id = %resolved.id,
            seller_id = %resolved.seller_id,
            admin_id = %admin.id,
            status = %resolved.status,
            amount = %resolved.amount,
            "payout decided"
        );
        Ok(resolved)
    }

    pub async fn list_for_seller(
        &self,
        seller: &User,
    ) -> Result<Vec<PayoutRequest>> {
        self.uow.payouts.list_for_seller(seller.id).await
    }

    pub async fn pending_queue(&self, admin: &User) -> Result<Vec<PayoutRequest>> {
        if !admin.role.is_admin() {
            return Err(CoreError::forbidden("Admin access required"));
        }
        self.uow.payouts.list_by_status(PayoutStatus::Pending).await
    }

    pub async fn ledger(&self, seller: &User) -> Result<Vec<LedgerEntry>> {
        self.uow.payouts.ledger(seller.id, LEDGER_PAGE).await
    }
}
