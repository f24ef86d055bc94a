//! Checkout and settlement.
//!
//! `start_checkout` creates (or reuses) a pending order backed by a payment
//! intent. Settlement is triggered either by the buyer confirming or by a
//! provider webhook; both paths end in the same single-transaction
//! [`OrdersRepository::settle`](crate::database::ports::orders::OrdersRepository::settle),
//! which is idempotent on the order status.

pub mod fees;

use std::collections::BTreeMap;
use std::sync::Arc;

use repomart_model::order::{CheckoutResponse, ConfirmResponse};
use repomart_model::{
    AccessGrant, Order, OrderId, OrderStatus, RepoId, RepoListing, User,
};
use tracing::{info, warn};

use crate::application::unit_of_work::AppUnitOfWork;
use crate::clock::Clock;
use crate::database::ports::orders::{RefundOutcome, SettlementOutcome};
use crate::error::{CoreError, Result};
use crate::payments::{
    IntentStatus, NewPaymentIntent, PaymentGateway, PaymentIntent,
    WebhookEventKind,
};
use crate::settings::MarketplaceSettings;

pub use fees::FeeSplit;

/// What a webhook delivery caused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Settled(OrderId),
    AlreadySettled(OrderId),
    MarkedFailed(OrderId),
    MarkedCanceled(OrderId),
    /// Event type or order not handled here; acknowledged anyway.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct CheckoutService {
    uow: Arc<AppUnitOfWork>,
    gateway: Arc<dyn PaymentGateway>,
    settings: Arc<MarketplaceSettings>,
    clock: Arc<dyn Clock>,
}

impl CheckoutService {
    pub fn new(
        uow: Arc<AppUnitOfWork>,
        gateway: Arc<dyn PaymentGateway>,
        settings: Arc<MarketplaceSettings>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            uow,
            gateway,
            settings,
            clock,
        }
    }

    async fn purchasable_repo(&self, buyer: &User, repo_id: RepoId) -> Result<RepoListing> {
        let repo = self
            .uow
            .catalog
            .get_repo(repo_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Repository"))?;
        if !repo.visibility.is_purchasable() {
            return Err(CoreError::not_found("Repository"));
        }
        if repo.seller_id == buyer.id {
            return Err(CoreError::forbidden(
                "Sellers cannot purchase their own repositories",
            ));
        }
        if self.uow.catalog.has_access(buyer.id, repo_id).await? {
            return Err(CoreError::conflict("You already own this repository"));
        }
        Ok(repo)
    }

    pub async fn start_checkout(
        &self,
        buyer: &User,
        repo_id: RepoId,
    ) -> Result<CheckoutResponse> {
        let repo = self.purchasable_repo(buyer, repo_id).await?;

        if repo.is_free() {
            let grant = AccessGrant {
                user_id: buyer.id,
                repo_id,
                order_id: None,
                granted_at: self.clock.now(),
            };
            self.uow.catalog.grant_access(&grant).await?;
            info!(buyer_id = %buyer.id, repo_id = %repo_id, "free repository claimed");
            return Ok(CheckoutResponse::Granted { repo_id });
        }

        if let Some(pending) = self.uow.orders.find_pending(buyer.id, repo_id).await?
            && let Some(response) = self.resume_pending(&repo, pending).await?
        {
            return Ok(response);
        }

        match self.open_order(buyer, &repo).await {
            Err(CoreError::Conflict(_)) => {
                // A concurrent checkout won the pending-order slot; reuse it.
                let pending = self
                    .uow
                    .orders
                    .find_pending(buyer.id, repo_id)
                    .await?
                    .ok_or_else(|| CoreError::conflict("Checkout already in progress"))?;
                let intent = self.intent_of(&pending).await?;
                Ok(CheckoutResponse::PaymentRequired {
                    order: pending,
                    client_secret: intent.client_secret,
                })
            }
            other => other,
        }
    }

    /// Reuse an existing pending order when its intent is still payable and
    /// the price has not changed. Returns `None` when a fresh order is
    /// needed.
    async fn resume_pending(
        &self,
        repo: &RepoListing,
        pending: Order,
    ) -> Result<Option<CheckoutResponse>> {
        let intent = self.intent_of(&pending).await?;
        match intent.status {
            IntentStatus::Succeeded => {
                self.settle_checked(&pending, &intent).await?;
                Ok(Some(CheckoutResponse::Granted { repo_id: repo.id }))
            }
            IntentStatus::Failed | IntentStatus::Canceled => {
                self.close_pending(&pending, intent.status).await?;
                Ok(None)
            }
            IntentStatus::RequiresPayment | IntentStatus::Processing
                if pending.amount != repo.price =>
            {
                self.close_pending(&pending, IntentStatus::Canceled).await?;
                Ok(None)
            }
            IntentStatus::RequiresPayment | IntentStatus::Processing => {
                Ok(Some(CheckoutResponse::PaymentRequired {
                    order: pending,
                    client_secret: intent.client_secret,
                }))
            }
        }
    }

    async fn open_order(&self, buyer: &User, repo: &RepoListing) -> Result<CheckoutResponse> {
        let split = FeeSplit::compute(repo.price, self.settings.platform_fee_bps)?;
        let order_id = OrderId::new();

        let intent = self
            .gateway
            .create_intent(NewPaymentIntent {
                amount: split.amount,
                currency: self.settings.currency.clone(),
                metadata: BTreeMap::from([
                    ("order_id".to_string(), order_id.to_string()),
                    ("repo_id".to_string(), repo.id.to_string()),
                    ("buyer_id".to_string(), buyer.id.to_string()),
                ]),
                idempotency_key: format!("order-{order_id}"),
            })
            .await?;

        let order = Order {
            id: order_id,
            buyer_id: buyer.id,
            repo_id: repo.id,
            seller_id: repo.seller_id,
            amount: split.amount,
            platform_fee: split.platform_fee,
            seller_amount: split.seller_amount,
            currency: self.settings.currency.clone(),
            status: OrderStatus::Pending,
            payment_intent_id: Some(intent.id.clone()),
            created_at: self.clock.now(),
            paid_at: None,
        };
        self.uow.orders.insert_order(&order).await?;

        info!(
            order_id = %order.id,
            buyer_id = %buyer.id,
            repo_id = %repo.id,
            amount = %order.amount,
            provider = self.gateway.name(),
            "checkout started"
        );
        Ok(CheckoutResponse::PaymentRequired {
            order,
            client_secret: intent.client_secret,
        })
    }

    async fn intent_of(&self, order: &Order) -> Result<PaymentIntent> {
        let intent_id = order.payment_intent_id.as_deref().ok_or_else(|| {
            CoreError::Internal(format!("order {} has no payment intent", order.id))
        })?;
        self.gateway.retrieve_intent(intent_id).await
    }

    async fn close_pending(&self, order: &Order, status: IntentStatus) -> Result<bool> {
        let to = match status {
            IntentStatus::Failed => OrderStatus::Failed,
            _ => OrderStatus::Canceled,
        };
        let changed = self
            .uow
            .orders
            .transition_status(order.id, OrderStatus::Pending, to)
            .await?;
        if changed {
            info!(order_id = %order.id, status = %to, "pending order closed");
        }
        Ok(changed)
    }

    /// Settle after checking the intent really pays for this order.
    async fn settle_checked(
        &self,
        order: &Order,
        intent: &PaymentIntent,
    ) -> Result<SettlementOutcome> {
        if intent.amount != order.amount
            || !intent.currency.eq_ignore_ascii_case(&order.currency)
        {
            warn!(
                order_id = %order.id,
                intent_id = %intent.id,
                expected = %order.amount,
                received = %intent.amount,
                "payment intent does not match order"
            );
            return Err(CoreError::Payment(
                "Payment amount does not match the order".into(),
            ));
        }
        self.settle(order.id).await
    }

    async fn settle(&self, order_id: OrderId) -> Result<SettlementOutcome> {
        let outcome = self.uow.orders.settle(order_id, self.clock.now()).await?;
        match &outcome {
            SettlementOutcome::Settled(order) => info!(
                order_id = %order.id,
                seller_id = %order.seller_id,
                seller_amount = %order.seller_amount,
                "order settled"
            ),
            SettlementOutcome::AlreadySettled(order) => {
                info!(order_id = %order.id, "order already settled")
            }
            SettlementOutcome::NotSettleable(order) => warn!(
                order_id = %order.id,
                status = %order.status,
                "payment succeeded for an order that can no longer settle"
            ),
        }
        Ok(outcome)
    }

    /// Buyer-driven confirmation: ask the provider for the intent status and
    /// act on it.
    pub async fn confirm_payment(
        &self,
        buyer: &User,
        order_id: OrderId,
    ) -> Result<ConfirmResponse> {
        let order = self.get_order(buyer, order_id).await?;
        match order.status {
            OrderStatus::Paid => {
                return Ok(ConfirmResponse {
                    order,
                    settled_now: false,
                });
            }
            OrderStatus::Pending => {}
            other => {
                return Err(CoreError::conflict(format!("Order is {other}")));
            }
        }

        let intent = self.intent_of(&order).await?;
        let (order, settled_now) = match intent.status {
            IntentStatus::Succeeded => match self.settle_checked(&order, &intent).await? {
                SettlementOutcome::Settled(order) => (order, true),
                SettlementOutcome::AlreadySettled(order) => (order, false),
                SettlementOutcome::NotSettleable(order) => {
                    return Err(CoreError::conflict(format!("Order is {}", order.status)));
                }
            },
            IntentStatus::Failed | IntentStatus::Canceled => {
                self.close_pending(&order, intent.status).await?;
                (self.reload(order.id).await?, false)
            }
            IntentStatus::RequiresPayment | IntentStatus::Processing => (order, false),
        };
        Ok(ConfirmResponse { order, settled_now })
    }

    async fn reload(&self, order_id: OrderId) -> Result<Order> {
        self.uow
            .orders
            .get_order(order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Order"))
    }

    /// Verify and apply a provider webhook delivery.
    pub async fn handle_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookOutcome> {
        let event = self.gateway.verify_webhook(payload, signature)?;

        let Some(intent_id) = event.intent_id.as_deref() else {
            return Ok(WebhookOutcome::Ignored);
        };
        let Some(order) = self.uow.orders.find_by_payment_intent(intent_id).await? else {
            warn!(event_id = %event.id, intent_id, "webhook for unknown payment intent");
            return Ok(WebhookOutcome::Ignored);
        };

        let outcome = match event.kind {
            WebhookEventKind::PaymentSucceeded => match self.settle(order.id).await? {
                SettlementOutcome::Settled(_) => WebhookOutcome::Settled(order.id),
                SettlementOutcome::AlreadySettled(_) => WebhookOutcome::AlreadySettled(order.id),
                SettlementOutcome::NotSettleable(_) => WebhookOutcome::Ignored,
            },
            WebhookEventKind::PaymentFailed => {
                if self.close_pending(&order, IntentStatus::Failed).await? {
                    WebhookOutcome::MarkedFailed(order.id)
                } else {
                    WebhookOutcome::Ignored
                }
            }
            WebhookEventKind::PaymentCanceled => {
                if self.close_pending(&order, IntentStatus::Canceled).await? {
                    WebhookOutcome::MarkedCanceled(order.id)
                } else {
                    WebhookOutcome::Ignored
                }
            }
            WebhookEventKind::Other(_) => WebhookOutcome::Ignored,
        };
        info!(event_id = %event.id, ?outcome, "webhook processed");
        Ok(outcome)
    }

    pub async fn list_orders(&self, buyer: &User) -> Result<Vec<Order>> {
        self.uow.orders.list_for_buyer(buyer.id).await
    }

    /// Orders are visible to their buyer and to admins.
    pub async fn get_order(&self, viewer: &User, order_id: OrderId) -> Result<Order> {
        let order = self.reload(order_id).await?;
        if order.buyer_id != viewer.id && !viewer.role.is_admin() {
            return Err(CoreError::not_found("Order"));
        }
        Ok(order)
    }

    /// Reverse a paid order: access revoked, seller debited. Repeating the
    /// call on a refunded order is a no-op.
    pub async fn refund(&self, admin: &User, order_id: OrderId) -> Result<Order> {
        if !admin.role.is_admin() {
            return Err(CoreError::forbidden("Admin access required"));
        }
        match self.uow.orders.refund(order_id, self.clock.now()).await? {
            RefundOutcome::Refunded(order) => {
                info!(
                    order_id = %order.id,
                    admin_id = %admin.id,
                    amount = %order.amount,
                    "order refunded"
                );
                Ok(order)
            }
            RefundOutcome::AlreadyRefunded(order) => Ok(order),
            RefundOutcome::NotRefundable(order) => Err(CoreError::conflict(format!(
                "Only paid orders can be refunded (order is {})",
                order.status
            ))),
        }
    }
}
