use async_trait::async_trait;
use chrono::{DateTime, Utc};
use repomart_model::{
    LedgerEntryId, LedgerKind, Order, OrderId, OrderStatus, RepoId, UserId,
};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;

use super::rows::{ORDER_COLUMNS, OrderRow, convert_all};
use crate::database::ports::orders::{
    OrdersRepository, RefundOutcome, SettlementOutcome,
};
use crate::error::{CoreError, Result};

#[derive(Clone, Debug)]
pub struct PostgresOrdersRepository {
    pool: PgPool,
}

impl PostgresOrdersRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Conditionally move an order between statuses inside `tx`, returning
    /// the updated row when the transition happened.
    async fn transition_in(
        tx: &mut Transaction<'_, Postgres>,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "UPDATE orders SET status = $3, paid_at = COALESCE($4, paid_at) \
             WHERE id = $1 AND status = $2 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id.to_uuid())
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(paid_at)
        .fetch_optional(&mut **tx)
        .await?;
        row.map(Order::try_from).transpose()
    }

    async fn load_in(
        tx: &mut Transaction<'_, Postgres>,
        id: OrderId,
    ) -> Result<Order> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id.to_uuid())
        .fetch_optional(&mut **tx)
        .await?;
        row.map(Order::try_from)
            .transpose()?
            .ok_or_else(|| CoreError::not_found("Order"))
    }

    async fn append_ledger(
        tx: &mut Transaction<'_, Postgres>,
        order: &Order,
        kind: LedgerKind,
        amount: i64,
        at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO seller_ledger (id, seller_id, kind, amount_cents, order_id, payout_id, created_at)
            VALUES ($1, $2, $3, $4, $5, NULL, $6)
            "#,
        )
        .bind(LedgerEntryId::new().to_uuid())
        .bind(order.seller_id.to_uuid())
        .bind(kind.as_str())
        .bind(amount)
        .bind(order.id.to_uuid())
        .bind(at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl OrdersRepository for PostgresOrdersRepository {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, buyer_id, repo_id, seller_id, amount_cents,
                platform_fee_cents, seller_amount_cents, currency, status,
                payment_intent_id, created_at, paid_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(order.id.to_uuid())
        .bind(order.buyer_id.to_uuid())
        .bind(order.repo_id.to_uuid())
        .bind(order.seller_id.to_uuid())
        .bind(order.amount.get())
        .bind(order.platform_fee.get())
        .bind(order.seller_amount.get())
        .bind(&order.currency)
        .bind(order.status.as_str())
        .bind(&order.payment_intent_id)
        .bind(order.created_at)
        .bind(order.paid_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(id.to_uuid())
                .fetch_optional(&self.pool)
                .await?;
        row.map(Order::try_from).transpose()
    }

    async fn find_by_payment_intent(&self, intent_id: &str) -> Result<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE payment_intent_id = $1"
        ))
        .bind(intent_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Order::try_from).transpose()
    }

    async fn find_pending(&self, buyer_id: UserId, repo_id: RepoId) -> Result<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE buyer_id = $1 AND repo_id = $2 AND status = 'pending'"
        ))
        .bind(buyer_id.to_uuid())
        .bind(repo_id.to_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Order::try_from).transpose()
    }

    async fn list_for_buyer(&self, buyer_id: UserId) -> Result<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE buyer_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(buyer_id.to_uuid())
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn list_recent_for_seller(&self, seller_id: UserId, limit: i64) -> Result<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE seller_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2"
        ))
        .bind(seller_id.to_uuid())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn transition_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool> {
        let result =
            sqlx::query("UPDATE orders SET status = $3 WHERE id = $1 AND status = $2")
                .bind(id.to_uuid())
                .bind(from.as_str())
                .bind(to.as_str())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn settle(&self, id: OrderId, at: DateTime<Utc>) -> Result<SettlementOutcome> {
        let mut tx = self.pool.begin().await?;

        let Some(order) =
            Self::transition_in(&mut tx, id, OrderStatus::Pending, OrderStatus::Paid, Some(at))
                .await?
        else {
            let current = Self::load_in(&mut tx, id).await?;
            tx.rollback().await?;
            return Ok(if current.status == OrderStatus::Paid {
                SettlementOutcome::AlreadySettled(current)
            } else {
                SettlementOutcome::NotSettleable(current)
            });
        };

        sqlx::query(
            r#"
            UPDATE seller_profiles
            SET balance_cents = balance_cents + $2,
                lifetime_earnings_cents = lifetime_earnings_cents + $2,
                total_sales = total_sales + 1,
                updated_at = $3
            WHERE user_id = $1
            "#,
        )
        .bind(order.seller_id.to_uuid())
        .bind(order.seller_amount.get())
        .bind(at)
        .execute(&mut *tx)
        .await?;

        Self::append_ledger(
            &mut tx,
            &order,
            LedgerKind::SaleCredit,
            order.seller_amount.get(),
            at,
        )
        .await?;

        sqlx::query(
            r#"
            UPDATE repositories
            SET sales_count = sales_count + 1,
                revenue_cents = revenue_cents + $2
            WHERE id = $1
            "#,
        )
        .bind(order.repo_id.to_uuid())
        .bind(order.amount.get())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO access_grants (user_id, repo_id, order_id, granted_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, repo_id) DO NOTHING
            "#,
        )
        .bind(order.buyer_id.to_uuid())
        .bind(order.repo_id.to_uuid())
        .bind(order.id.to_uuid())
        .bind(at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(
            order_id = %order.id,
            seller_id = %order.seller_id,
            amount = %order.amount,
            "order settled"
        );
        Ok(SettlementOutcome::Settled(order))
    }

    async fn refund(&self, id: OrderId, at: DateTime<Utc>) -> Result<RefundOutcome> {
        let mut tx = self.pool.begin().await?;

        let Some(order) =
            Self::transition_in(&mut tx, id, OrderStatus::Paid, OrderStatus::Refunded, None)
                .await?
        else {
            let current = Self::load_in(&mut tx, id).await?;
            tx.rollback().await?;
            return Ok(if current.status == OrderStatus::Refunded {
                RefundOutcome::AlreadyRefunded(current)
            } else {
                RefundOutcome::NotRefundable(current)
            });
        };

        sqlx::query(
            r#"
            UPDATE seller_profiles
            SET balance_cents = balance_cents - $2,
                lifetime_earnings_cents = lifetime_earnings_cents - $2,
                total_sales = total_sales - 1,
                updated_at = $3
            WHERE user_id = $1
            "#,
        )
        .bind(order.seller_id.to_uuid())
        .bind(order.seller_amount.get())
        .bind(at)
        .execute(&mut *tx)
        .await?;

        Self::append_ledger(
            &mut tx,
            &order,
            LedgerKind::RefundDebit,
            -order.seller_amount.get(),
            at,
        )
        .await?;

        sqlx::query(
            r#"
            UPDATE repositories
            SET sales_count = sales_count - 1,
                revenue_cents = revenue_cents - $2
            WHERE id = $1
            "#,
        )
        .bind(order.repo_id.to_uuid())
        .bind(order.amount.get())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM access_grants WHERE user_id = $1 AND repo_id = $2")
            .bind(order.buyer_id.to_uuid())
            .bind(order.repo_id.to_uuid())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(order_id = %order.id, amount = %order.amount, "order refunded");
        Ok(RefundOutcome::Refunded(order))
    }
}
