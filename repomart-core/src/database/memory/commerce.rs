use async_trait::async_trait;
use chrono::{DateTime, Utc};
use repomart_model::{
    AccessGrant, Cents, LedgerEntry, LedgerKind, Order, OrderId, OrderStatus,
    PayoutId, PayoutRequest, PayoutStatus, RepoId, UserId,
};

use super::{MemoryStore, State, newest_first, oldest_first, take};
use crate::database::ports::orders::{
    OrdersRepository, RefundOutcome, SettlementOutcome,
};
use crate::database::ports::payouts::{PayoutDecision, PayoutsRepository};
use crate::error::{CoreError, Result};
use crate::payouts::policy::{PayoutPolicy, PayoutSnapshot};

fn last_counted(state: &State, seller_id: UserId) -> Option<DateTime<Utc>> {
    state
        .payouts
        .iter()
        .filter(|p| {
            p.seller_id == seller_id
                && matches!(p.status, PayoutStatus::Pending | PayoutStatus::Approved)
        })
        .map(|p| p.requested_at)
        .max()
}

#[async_trait]
impl OrdersRepository for MemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        let mut state = self.lock();
        if order.status == OrderStatus::Pending
            && state.orders.iter().any(|o| {
                o.status == OrderStatus::Pending
                    && o.buyer_id == order.buyer_id
                    && o.repo_id == order.repo_id
            })
        {
            return Err(CoreError::conflict(
                "A pending order already exists for this repository",
            ));
        }
        state.orders.push(order.clone());
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.lock().orders.iter().find(|o| o.id == id).cloned())
    }

    async fn find_by_payment_intent(&self, intent_id: &str) -> Result<Option<Order>> {
        Ok(self
            .lock()
            .orders
            .iter()
            .find(|o| o.payment_intent_id.as_deref() == Some(intent_id))
            .cloned())
    }

    async fn find_pending(&self, buyer_id: UserId, repo_id: RepoId) -> Result<Option<Order>> {
        Ok(self
            .lock()
            .orders
            .iter()
            .find(|o| {
                o.status == OrderStatus::Pending
                    && o.buyer_id == buyer_id
                    && o.repo_id == repo_id
            })
            .cloned())
    }

    async fn list_for_buyer(&self, buyer_id: UserId) -> Result<Vec<Order>> {
        let state = self.lock();
        Ok(newest_first(&state.orders, |o| o.buyer_id == buyer_id, |o| o.created_at))
    }

    async fn list_recent_for_seller(&self, seller_id: UserId, limit: i64) -> Result<Vec<Order>> {
        let state = self.lock();
        let mut orders =
            newest_first(&state.orders, |o| o.seller_id == seller_id, |o| o.created_at);
        orders.truncate(take(limit));
        Ok(orders)
    }

    async fn transition_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool> {
        let mut state = self.lock();
        let order = state.order_mut(id)?;
        if order.status != from {
            return Ok(false);
        }
        order.status = to;
        Ok(true)
    }

    async fn settle(&self, id: OrderId, at: DateTime<Utc>) -> Result<SettlementOutcome> {
        let mut state = self.lock();
        let order = state.order_mut(id)?.clone();
        match order.status {
            OrderStatus::Pending => {}
            OrderStatus::Paid => return Ok(SettlementOutcome::AlreadySettled(order)),
            _ => return Ok(SettlementOutcome::NotSettleable(order)),
        }

        // Every lookup and overflow check runs before the first write.
        let seller = state.seller_mut(order.seller_id)?;
        let balance = seller.balance.checked_add(order.seller_amount)?;
        let lifetime_earnings = seller.lifetime_earnings.checked_add(order.seller_amount)?;
        let revenue = state.repo_mut(order.repo_id)?.revenue.checked_add(order.amount)?;

        let seller = state.seller_mut(order.seller_id)?;
        seller.balance = balance;
        seller.lifetime_earnings = lifetime_earnings;
        seller.total_sales += 1;

        let repo = state.repo_mut(order.repo_id)?;
        repo.sales_count += 1;
        repo.revenue = revenue;

        let stored = state.order_mut(id)?;
        stored.status = OrderStatus::Paid;
        stored.paid_at = Some(at);
        let order = stored.clone();

        state.append_ledger(
            order.seller_id,
            LedgerKind::SaleCredit,
            order.seller_amount,
            Some(order.id),
            None,
            at,
        );

        if !state
            .access
            .iter()
            .any(|g| g.user_id == order.buyer_id && g.repo_id == order.repo_id)
        {
            state.access.push(AccessGrant {
                user_id: order.buyer_id,
                repo_id: order.repo_id,
                order_id: Some(order.id),
                granted_at: at,
            });
        }
        Ok(SettlementOutcome::Settled(order))
    }

    async fn refund(&self, id: OrderId, at: DateTime<Utc>) -> Result<RefundOutcome> {
        let mut state = self.lock();
        let order = state.order_mut(id)?.clone();
        match order.status {
            OrderStatus::Paid => {}
            OrderStatus::Refunded => return Ok(RefundOutcome::AlreadyRefunded(order)),
            _ => return Ok(RefundOutcome::NotRefundable(order)),
        }

        let seller = state.seller_mut(order.seller_id)?;
        let balance = seller.balance.checked_sub(order.seller_amount)?;
        let lifetime_earnings = seller.lifetime_earnings.checked_sub(order.seller_amount)?;
        // A deleted listing keeps no aggregates to adjust.
        let revenue = match state.repo_mut(order.repo_id) {
            Ok(repo) => Some(repo.revenue.checked_sub(order.amount)?),
            Err(_) => None,
        };

        let seller = state.seller_mut(order.seller_id)?;
        seller.balance = balance;
        seller.lifetime_earnings = lifetime_earnings;
        seller.total_sales -= 1;

        if let Some(revenue) = revenue
            && let Ok(repo) = state.repo_mut(order.repo_id)
        {
            repo.sales_count -= 1;
            repo.revenue = revenue;
        }

        let stored = state.order_mut(id)?;
        stored.status = OrderStatus::Refunded;
        let order = stored.clone();

        state.append_ledger(
            order.seller_id,
            LedgerKind::RefundDebit,
            -order.seller_amount,
            Some(order.id),
            None,
            at,
        );
        state
            .access
            .retain(|g| !(g.user_id == order.buyer_id && g.repo_id == order.repo_id));
        Ok(RefundOutcome::Refunded(order))
    }
}

#[async_trait]
impl PayoutsRepository for MemoryStore {
    async fn request_payout(
        &self,
        seller_id: UserId,
        amount: Cents,
        policy: &PayoutPolicy,
        at: DateTime<Utc>,
    ) -> Result<PayoutRequest> {
        let mut state = self.lock();
        let snapshot = PayoutSnapshot {
            balance: state.seller_mut(seller_id)?.balance,
            has_pending_request: state
                .payouts
                .iter()
                .any(|p| p.seller_id == seller_id && p.status == PayoutStatus::Pending),
            last_counted_request_at: last_counted(&state, seller_id),
        };
        policy.evaluate(&snapshot, amount, at)?;

        let seller = state.seller_mut(seller_id)?;
        seller.balance = seller.balance.checked_sub(amount)?;
        seller.pending_payout = seller.pending_payout.checked_add(amount)?;
        seller.last_payout_requested_at = Some(at);

        let request = PayoutRequest {
            id: PayoutId::new(),
            seller_id,
            amount,
            status: PayoutStatus::Pending,
            requested_at: at,
            decided_at: None,
            decided_by: None,
            note: None,
        };
        state.payouts.push(request.clone());
        state.append_ledger(seller_id, LedgerKind::PayoutHold, -amount, None, Some(request.id), at);
        Ok(request)
    }

    async fn decide(
        &self,
        id: PayoutId,
        decision: PayoutDecision,
        decided_by: UserId,
        note: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<PayoutRequest> {
        let mut state = self.lock();
        let request = state
            .payouts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| CoreError::not_found("Payout request"))?;
        if request.status != PayoutStatus::Pending {
            return Err(CoreError::conflict(format!(
                "Payout request is already {}",
                request.status
            )));
        }
        request.status = match decision {
            PayoutDecision::Approve => PayoutStatus::Approved,
            PayoutDecision::Reject => PayoutStatus::Rejected,
        };
        request.decided_at = Some(at);
        request.decided_by = Some(decided_by);
        request.note = note;
        let request = request.clone();

        let seller = state.seller_mut(request.seller_id)?;
        seller.pending_payout = seller.pending_payout.checked_sub(request.amount)?;
        let (kind, effect) = match decision {
            PayoutDecision::Approve => {
                seller.total_paid_out = seller.total_paid_out.checked_add(request.amount)?;
                (LedgerKind::PayoutSettled, Cents::ZERO)
            }
            PayoutDecision::Reject => {
                seller.balance = seller.balance.checked_add(request.amount)?;
                seller.last_payout_requested_at = None;
                (LedgerKind::PayoutRelease, request.amount)
            }
        };
        state.append_ledger(request.seller_id, kind, effect, None, Some(request.id), at);
        Ok(request)
    }

    async fn get_payout(&self, id: PayoutId) -> Result<Option<PayoutRequest>> {
        Ok(self.lock().payouts.iter().find(|p| p.id == id).cloned())
    }

    async fn list_for_seller(&self, seller_id: UserId) -> Result<Vec<PayoutRequest>> {
        let state = self.lock();
        Ok(newest_first(&state.payouts, |p| p.seller_id == seller_id, |p| p.requested_at))
    }

    async fn list_by_status(&self, status: PayoutStatus) -> Result<Vec<PayoutRequest>> {
        let state = self.lock();
        Ok(oldest_first(&state.payouts, |p| p.status == status, |p| p.requested_at))
    }

    async fn ledger(&self, seller_id: UserId, limit: i64) -> Result<Vec<LedgerEntry>> {
        let state = self.lock();
        let mut entries =
            newest_first(&state.ledger, |e| e.seller_id == seller_id, |e| e.created_at);
        entries.truncate(take(limit));
        Ok(entries)
    }

    async fn last_counted_request_at(
        &self,
        seller_id: UserId,
    ) -> Result<Option<DateTime<Utc>>> {
        Ok(last_counted(&self.lock(), seller_id))
    }
}
