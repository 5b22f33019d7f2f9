//! Invoice and payment reconciliation
//!
//! One `facility_invoices` row per facility+month is the single source of
//! truth for both the aggregate (what the month's trips add up to) and the
//! payment state (what has been collected against it). Every multi-step
//! write happens inside one transaction; concurrent payments against the
//! same month serialize on the invoice row.

use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use medroute_shared::{PaymentKind, PaymentStatus};

use crate::error::{BillingError, BillingResult};
use crate::period::BillingPeriod;

/// Persisted facility+month invoice row
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InvoiceRecord {
    pub id: Uuid,
    pub facility_id: Uuid,
    pub period_start: Date,
    pub period_end: Date,
    pub total_cents: i64,
    pub trip_count: i64,
    pub billable_count: i64,
    pub pending_count: i64,
    pub payment_status: String,
    pub amount_paid_cents: i64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub paid_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl InvoiceRecord {
    pub fn status(&self) -> BillingResult<PaymentStatus> {
        self.payment_status.parse().map_err(BillingError::from)
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid.as_str()
    }
}

/// One recorded payment against an invoice
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InvoicePayment {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub facility_id: Uuid,
    pub amount_cents: i64,
    pub method: String,
    pub stripe_payment_intent_id: Option<String>,
    pub reference: Option<String>,
    pub recorded_by: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Payment to record against a facility+month
#[derive(Debug, Clone)]
pub struct NewPayment<'a> {
    pub amount_cents: i64,
    pub kind: PaymentKind,
    /// Required for card payments; carries the processor's charge record
    pub stripe_payment_intent_id: Option<&'a str>,
    /// Free-form reference for check / bank-transfer payments
    pub reference: Option<&'a str>,
    pub recorded_by: Uuid,
}

/// Reconciliation view for one facility+month
#[derive(Debug, Clone, Serialize)]
pub struct PaymentStatusView {
    pub facility_id: Uuid,
    pub period: String,
    pub payment_status: PaymentStatus,
    pub total_cents: i64,
    pub amount_paid_cents: i64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub paid_at: Option<OffsetDateTime>,
    pub payments: Vec<InvoicePayment>,
}

/// Live trip aggregates for an invoice refresh
#[derive(Debug, FromRow)]
struct TripAggregateRow {
    total_cents: i64,
    trip_count: i64,
    billable_count: i64,
    pending_count: i64,
}

const INVOICE_COLUMNS: &str = "id, facility_id, period_start, period_end, total_cents, \
     trip_count, billable_count, pending_count, payment_status, amount_paid_cents, \
     paid_at, updated_at";

/// Payment-cover rule: an invoice flips to paid once its recorded payments
/// are positive and reach the billable total.
pub(crate) fn covers_total(paid_sum_cents: i64, total_cents: i64) -> bool {
    paid_sum_cents > 0 && paid_sum_cents >= total_cents
}

/// Store for facility invoices and their payments
pub struct InvoiceStore {
    pool: PgPool,
}

impl InvoiceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Read the reconciliation state for a facility+month.
    ///
    /// An absent invoice row means nothing has been recorded yet: the view
    /// comes back `unpaid` with zeroed aggregates, not an error.
    pub async fn payment_status(
        &self,
        facility_id: Uuid,
        period: &BillingPeriod,
    ) -> BillingResult<PaymentStatusView> {
        let invoice: Option<InvoiceRecord> = sqlx::query_as(&format!(
            "SELECT {INVOICE_COLUMNS} FROM facility_invoices \
             WHERE facility_id = $1 AND period_start = $2"
        ))
        .bind(facility_id)
        .bind(period.first_day())
        .fetch_optional(&self.pool)
        .await?;

        let Some(invoice) = invoice else {
            return Ok(PaymentStatusView {
                facility_id,
                period: period.label(),
                payment_status: PaymentStatus::Unpaid,
                total_cents: 0,
                amount_paid_cents: 0,
                paid_at: None,
                payments: Vec::new(),
            });
        };

        let payments: Vec<InvoicePayment> = sqlx::query_as(
            "SELECT id, invoice_id, facility_id, amount_cents, method, \
                    stripe_payment_intent_id, reference, recorded_by, created_at \
             FROM facility_invoice_payments \
             WHERE invoice_id = $1 \
             ORDER BY created_at",
        )
        .bind(invoice.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(PaymentStatusView {
            facility_id,
            period: period.label(),
            payment_status: invoice.status()?,
            total_cents: invoice.total_cents,
            amount_paid_cents: invoice.amount_paid_cents,
            paid_at: invoice.paid_at,
            payments,
        })
    }

    /// Record a payment against a facility+month.
    ///
    /// In one transaction: the invoice row is upserted with aggregates
    /// refreshed from the live trip data (taking the row lock), the payment
    /// row is inserted, the paid sum is recomputed, and the status flips to
    /// `paid` once payments cover the billable total.
    pub async fn record_payment(
        &self,
        facility_id: Uuid,
        period: &BillingPeriod,
        payment: NewPayment<'_>,
    ) -> BillingResult<InvoiceRecord> {
        if payment.amount_cents <= 0 {
            return Err(BillingError::Validation(
                "payment amount must be positive".to_string(),
            ));
        }
        if payment.kind == PaymentKind::Card && payment.stripe_payment_intent_id.is_none() {
            return Err(BillingError::Validation(
                "card payments require a payment intent id".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let invoice = Self::upsert_invoice(&mut tx, facility_id, period).await?;

        sqlx::query(
            r#"
            INSERT INTO facility_invoice_payments
                (id, invoice_id, facility_id, amount_cents, method,
                 stripe_payment_intent_id, reference, recorded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(invoice.id)
        .bind(facility_id)
        .bind(payment.amount_cents)
        .bind(payment.kind.as_str())
        .bind(payment.stripe_payment_intent_id)
        .bind(payment.reference)
        .bind(payment.recorded_by)
        .execute(&mut *tx)
        .await?;

        let (paid_sum,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(amount_cents), 0)::BIGINT \
             FROM facility_invoice_payments WHERE invoice_id = $1",
        )
        .bind(invoice.id)
        .fetch_one(&mut *tx)
        .await?;

        let covered = covers_total(paid_sum, invoice.total_cents);
        let new_status = if covered {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Unpaid
        };

        let updated: InvoiceRecord = sqlx::query_as(&format!(
            "UPDATE facility_invoices \
             SET amount_paid_cents = $1, \
                 payment_status = $2, \
                 paid_at = CASE WHEN $2 = 'paid' THEN COALESCE(paid_at, NOW()) ELSE NULL END, \
                 updated_at = NOW() \
             WHERE id = $3 \
             RETURNING {INVOICE_COLUMNS}"
        ))
        .bind(paid_sum)
        .bind(new_status.as_str())
        .bind(invoice.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            facility_id = %facility_id,
            period = %period,
            amount_cents = payment.amount_cents,
            method = payment.kind.as_str(),
            payment_status = %updated.payment_status,
            "Recorded invoice payment"
        );

        Ok(updated)
    }

    /// Reset a facility+month back to unpaid, removing its payment rows.
    ///
    /// Admin/testing path. Runs in one transaction so a failure leaves no
    /// half-deleted residue. Returns the number of payment rows removed;
    /// a month with no invoice row is already reset.
    pub async fn reset_payment_status(
        &self,
        facility_id: Uuid,
        period: &BillingPeriod,
    ) -> BillingResult<u64> {
        let mut tx = self.pool.begin().await?;

        let invoice_id: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM facility_invoices \
             WHERE facility_id = $1 AND period_start = $2 \
             FOR UPDATE",
        )
        .bind(facility_id)
        .bind(period.first_day())
        .fetch_optional(&mut *tx)
        .await?;

        let Some((invoice_id,)) = invoice_id else {
            tx.commit().await?;
            return Ok(0);
        };

        let deleted = sqlx::query("DELETE FROM facility_invoice_payments WHERE invoice_id = $1")
            .bind(invoice_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query(
            "UPDATE facility_invoices \
             SET payment_status = 'unpaid', amount_paid_cents = 0, paid_at = NULL, \
                 updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(invoice_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            facility_id = %facility_id,
            period = %period,
            payments_removed = deleted,
            "Reset payment status"
        );

        Ok(deleted)
    }

    /// Explicitly mark a facility+month paid, regardless of payment rows.
    pub async fn mark_paid(
        &self,
        facility_id: Uuid,
        period: &BillingPeriod,
    ) -> BillingResult<InvoiceRecord> {
        self.set_status(facility_id, period, PaymentStatus::Paid).await
    }

    /// Explicitly mark a facility+month unpaid, keeping its payment rows.
    pub async fn mark_unpaid(
        &self,
        facility_id: Uuid,
        period: &BillingPeriod,
    ) -> BillingResult<InvoiceRecord> {
        self.set_status(facility_id, period, PaymentStatus::Unpaid).await
    }

    async fn set_status(
        &self,
        facility_id: Uuid,
        period: &BillingPeriod,
        status: PaymentStatus,
    ) -> BillingResult<InvoiceRecord> {
        let mut tx = self.pool.begin().await?;

        let invoice = Self::upsert_invoice(&mut tx, facility_id, period).await?;

        let updated: InvoiceRecord = sqlx::query_as(&format!(
            "UPDATE facility_invoices \
             SET payment_status = $1, \
                 paid_at = CASE WHEN $1 = 'paid' THEN COALESCE(paid_at, NOW()) ELSE NULL END, \
                 updated_at = NOW() \
             WHERE id = $2 \
             RETURNING {INVOICE_COLUMNS}"
        ))
        .bind(status.as_str())
        .bind(invoice.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            facility_id = %facility_id,
            period = %period,
            payment_status = status.as_str(),
            "Set invoice payment status"
        );

        Ok(updated)
    }

    /// Upsert the invoice row for a facility+month with aggregates
    /// recomputed from the live trip data.
    ///
    /// The `ON CONFLICT … DO UPDATE … RETURNING` takes the row lock, so
    /// concurrent writers against the same month queue here instead of
    /// losing updates.
    async fn upsert_invoice(
        tx: &mut Transaction<'_, Postgres>,
        facility_id: Uuid,
        period: &BillingPeriod,
    ) -> BillingResult<InvoiceRecord> {
        let agg: TripAggregateRow = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(price_cents) FILTER (
                    WHERE status = 'completed' AND price_cents > 0), 0)::BIGINT AS total_cents,
                COUNT(*) AS trip_count,
                (COUNT(*) FILTER (
                    WHERE status = 'completed' AND price_cents > 0)) AS billable_count,
                (COUNT(*) FILTER (
                    WHERE status <> 'cancelled'
                      AND NOT (status = 'completed' AND price_cents > 0))) AS pending_count
            FROM trips
            WHERE facility_id = $1
              AND pickup_time >= $2
              AND pickup_time < $3
            "#,
        )
        .bind(facility_id)
        .bind(period.range_start())
        .bind(period.range_end_exclusive())
        .fetch_one(&mut **tx)
        .await?;

        let invoice: InvoiceRecord = sqlx::query_as(&format!(
            r#"
            INSERT INTO facility_invoices
                (id, facility_id, period_start, period_end, total_cents,
                 trip_count, billable_count, pending_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (facility_id, period_start) DO UPDATE SET
                total_cents = EXCLUDED.total_cents,
                trip_count = EXCLUDED.trip_count,
                billable_count = EXCLUDED.billable_count,
                pending_count = EXCLUDED.pending_count,
                updated_at = NOW()
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(facility_id)
        .bind(period.first_day())
        .bind(period.last_day())
        .bind(agg.total_cents)
        .bind(agg.trip_count)
        .bind(agg.billable_count)
        .bind(agg.pending_count)
        .fetch_one(&mut **tx)
        .await?;

        Ok(invoice)
    }
}
