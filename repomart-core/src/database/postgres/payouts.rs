use async_trait::async_trait;
use chrono::{DateTime, Utc};
use repomart_model::{
    Cents, LedgerEntry, LedgerEntryId, LedgerKind, PayoutId, PayoutRequest,
    PayoutStatus, UserId,
};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;

use super::rows::{LedgerRow, PAYOUT_COLUMNS, PayoutRow, convert_all};
use crate::database::ports::payouts::{PayoutDecision, PayoutsRepository};
use crate::error::{CoreError, Result};
use crate::payouts::policy::{PayoutPolicy, PayoutSnapshot};

#[derive(Clone, Debug)]
pub struct PostgresPayoutsRepository {
    pool: PgPool,
}

impl PostgresPayoutsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn append_ledger(
        tx: &mut Transaction<'_, Postgres>,
        request: &PayoutRequest,
        kind: LedgerKind,
        amount: Cents,
        at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO seller_ledger (id, seller_id, kind, amount_cents, order_id, payout_id, created_at)
            VALUES ($1, $2, $3, $4, NULL, $5, $6)
            "#,
        )
        .bind(LedgerEntryId::new().to_uuid())
        .bind(request.seller_id.to_uuid())
        .bind(kind.as_str())
        .bind(amount.get())
        .bind(request.id.to_uuid())
        .bind(at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

const LAST_COUNTED_SQL: &str = "SELECT MAX(requested_at) FROM payout_requests \
     WHERE seller_id = $1 AND status IN ('pending', 'approved')";

#[async_trait]
impl PayoutsRepository for PostgresPayoutsRepository {
    async fn request_payout(
        &self,
        seller_id: UserId,
        amount: Cents,
        policy: &PayoutPolicy,
        at: DateTime<Utc>,
    ) -> Result<PayoutRequest> {
        let mut tx = self.pool.begin().await?;

        let balance: Option<i64> = sqlx::query_scalar(
            "SELECT balance_cents FROM seller_profiles WHERE user_id = $1 FOR UPDATE",
        )
        .bind(seller_id.to_uuid())
        .fetch_optional(&mut *tx)
        .await?;
        let balance = balance.ok_or_else(|| CoreError::not_found("Seller profile"))?;

        let has_pending_request: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM payout_requests \
             WHERE seller_id = $1 AND status = 'pending')",
        )
        .bind(seller_id.to_uuid())
        .fetch_one(&mut *tx)
        .await?;
        let last_counted_request_at: Option<DateTime<Utc>> =
            sqlx::query_scalar(LAST_COUNTED_SQL)
                .bind(seller_id.to_uuid())
                .fetch_one(&mut *tx)
                .await?;

        let snapshot = PayoutSnapshot {
            balance: Cents(balance),
            has_pending_request,
            last_counted_request_at,
        };
        policy.evaluate(&snapshot, amount, at)?;

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

        sqlx::query(
            r#"
            UPDATE seller_profiles
            SET balance_cents = balance_cents - $2,
                pending_payout_cents = pending_payout_cents + $2,
                last_payout_requested_at = $3,
                updated_at = $3
            WHERE user_id = $1
            "#,
        )
        .bind(seller_id.to_uuid())
        .bind(amount.get())
        .bind(at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO payout_requests (id, seller_id, amount_cents, status, requested_at)
            VALUES ($1, $2, $3, 'pending', $4)
            "#,
        )
        .bind(request.id.to_uuid())
        .bind(seller_id.to_uuid())
        .bind(amount.get())
        .bind(at)
        .execute(&mut *tx)
        .await?;

        Self::append_ledger(&mut tx, &request, LedgerKind::PayoutHold, -amount, at).await?;

        tx.commit().await?;
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
        let mut tx = self.pool.begin().await?;

        let row: Option<PayoutRow> = sqlx::query_as(&format!(
            "SELECT {PAYOUT_COLUMNS} FROM payout_requests WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.to_uuid())
        .fetch_optional(&mut *tx)
        .await?;
        let current = row
            .map(PayoutRequest::try_from)
            .transpose()?
            .ok_or_else(|| CoreError::not_found("Payout request"))?;
        if current.status != PayoutStatus::Pending {
            return Err(CoreError::conflict(format!(
                "Payout request is already {}",
                current.status
            )));
        }

        let status = match decision {
            PayoutDecision::Approve => PayoutStatus::Approved,
            PayoutDecision::Reject => PayoutStatus::Rejected,
        };
        let row: PayoutRow = sqlx::query_as(&format!(
            "UPDATE payout_requests \
             SET status = $2, decided_at = $3, decided_by = $4, note = $5 \
             WHERE id = $1 RETURNING {PAYOUT_COLUMNS}"
        ))
        .bind(id.to_uuid())
        .bind(status.as_str())
        .bind(at)
        .bind(decided_by.to_uuid())
        .bind(&note)
        .fetch_one(&mut *tx)
        .await?;
        let resolved = PayoutRequest::try_from(row)?;

        let (sql, kind, effect) = match decision {
            PayoutDecision::Approve => (
                r#"
                UPDATE seller_profiles
                SET pending_payout_cents = pending_payout_cents - $2,
                    total_paid_out_cents = total_paid_out_cents + $2,
                    updated_at = $3
                WHERE user_id = $1
                "#,
                LedgerKind::PayoutSettled,
                Cents::ZERO,
            ),
            PayoutDecision::Reject => (
                r#"
                UPDATE seller_profiles
                SET pending_payout_cents = pending_payout_cents - $2,
                    balance_cents = balance_cents + $2,
                    last_payout_requested_at = NULL,
                    updated_at = $3
                WHERE user_id = $1
                "#,
                LedgerKind::PayoutRelease,
                resolved.amount,
            ),
        };
        sqlx::query(sql)
            .bind(resolved.seller_id.to_uuid())
            .bind(resolved.amount.get())
            .bind(at)
            .execute(&mut *tx)
            .await?;

        Self::append_ledger(&mut tx, &resolved, kind, effect, at).await?;

        tx.commit().await?;
        info!(payout_id = %resolved.id, status = %resolved.status, "payout resolved");
        Ok(resolved)
    }

    async fn get_payout(&self, id: PayoutId) -> Result<Option<PayoutRequest>> {
        let row: Option<PayoutRow> = sqlx::query_as(&format!(
            "SELECT {PAYOUT_COLUMNS} FROM payout_requests WHERE id = $1"
        ))
        .bind(id.to_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(PayoutRequest::try_from).transpose()
    }

    async fn list_for_seller(&self, seller_id: UserId) -> Result<Vec<PayoutRequest>> {
        let rows: Vec<PayoutRow> = sqlx::query_as(&format!(
            "SELECT {PAYOUT_COLUMNS} FROM payout_requests WHERE seller_id = $1 \
             ORDER BY requested_at DESC, id DESC"
        ))
        .bind(seller_id.to_uuid())
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn list_by_status(&self, status: PayoutStatus) -> Result<Vec<PayoutRequest>> {
        let rows: Vec<PayoutRow> = sqlx::query_as(&format!(
            "SELECT {PAYOUT_COLUMNS} FROM payout_requests WHERE status = $1 \
             ORDER BY requested_at ASC, id ASC"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn ledger(&self, seller_id: UserId, limit: i64) -> Result<Vec<LedgerEntry>> {
        let rows: Vec<LedgerRow> = sqlx::query_as(
            r#"
            SELECT id, seller_id, kind, amount_cents, order_id, payout_id, created_at
            FROM seller_ledger
            WHERE seller_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(seller_id.to_uuid())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn last_counted_request_at(
        &self,
        seller_id: UserId,
    ) -> Result<Option<DateTime<Utc>>> {
        Ok(sqlx::query_scalar(LAST_COUNTED_SQL)
            .bind(seller_id.to_uuid())
            .fetch_one(&self.pool)
            .await?)
    }
}
