//! Monthly billing views and payment reconciliation

use axum::extract::{Extension, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use medroute_billing::{
    BillingPeriod, InvoiceRecord, MonthlyStatement, NewPayment, PaymentStatusView,
};
use medroute_shared::PaymentKind;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub month: String,
}

#[derive(Debug, Deserialize)]
pub struct MonthBody {
    pub month: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordPaymentRequest {
    pub month: String,
    pub amount_cents: i64,
    pub method: PaymentKind,
    pub stripe_payment_intent_id: Option<String>,
    pub reference: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TripsBillingResponse {
    pub statement: MonthlyStatement,
    pub payment: PaymentStatusView,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub payments_removed: u64,
}

/// The month's statement plus its reconciliation state, in one response.
pub async fn trips_billing(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<MonthQuery>,
) -> ApiResult<Json<TripsBillingResponse>> {
    let period = BillingPeriod::parse(&query.month)?;

    let statement = state
        .billing
        .aggregator
        .monthly_statement(user.facility_id, &period)
        .await?;
    let payment = state
        .billing
        .invoices
        .payment_status(user.facility_id, &period)
        .await?;

    Ok(Json(TripsBillingResponse { statement, payment }))
}

/// Reconciliation state for one month.
pub async fn payment_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<MonthQuery>,
) -> ApiResult<Json<PaymentStatusView>> {
    let period = BillingPeriod::parse(&query.month)?;
    let view = state
        .billing
        .invoices
        .payment_status(user.facility_id, &period)
        .await?;
    Ok(Json(view))
}

/// Record a card/check/bank-transfer payment against a month.
pub async fn record_payment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<RecordPaymentRequest>,
) -> ApiResult<Json<InvoiceRecord>> {
    user.require_staff()?;

    let period = BillingPeriod::parse(&req.month)?;
    let invoice = state
        .billing
        .invoices
        .record_payment(
            user.facility_id,
            &period,
            NewPayment {
                amount_cents: req.amount_cents,
                kind: req.method,
                stripe_payment_intent_id: req.stripe_payment_intent_id.as_deref(),
                reference: req.reference.as_deref(),
                recorded_by: user.user_id,
            },
        )
        .await?;

    Ok(Json(invoice))
}

/// Admin/testing path: wipe a month's payments and return it to unpaid.
pub async fn reset_payment_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<MonthBody>,
) -> ApiResult<Json<ResetResponse>> {
    user.require_staff()?;

    let period = BillingPeriod::parse(&req.month)?;
    let payments_removed = state
        .billing
        .invoices
        .reset_payment_status(user.facility_id, &period)
        .await?;

    Ok(Json(ResetResponse { payments_removed }))
}

/// Explicit paid override for a month.
pub async fn mark_paid(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<MonthBody>,
) -> ApiResult<Json<InvoiceRecord>> {
    user.require_staff()?;

    let period = BillingPeriod::parse(&req.month)?;
    let invoice = state
        .billing
        .invoices
        .mark_paid(user.facility_id, &period)
        .await?;
    Ok(Json(invoice))
}

/// Explicit unpaid override for a month.
pub async fn mark_unpaid(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<MonthBody>,
) -> ApiResult<Json<InvoiceRecord>> {
    user.require_staff()?;

    let period = BillingPeriod::parse(&req.month)?;
    let invoice = state
        .billing
        .invoices
        .mark_unpaid(user.facility_id, &period)
        .await?;
    Ok(Json(invoice))
}
