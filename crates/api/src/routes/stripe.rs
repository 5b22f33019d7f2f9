//! Stripe pass-through endpoints
//!
//! Thin handlers over the billing crate's checkout service; the server's
//! only job here is scoping the operation to the caller's facility.

use axum::extract::{Extension, State};
use axum::Json;
use serde::Deserialize;

use medroute_billing::{
    BillingPeriod, CheckoutSessionResponse, PaymentIntentResponse, SetupIntentResponse,
};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InvoicePaymentRequest {
    pub month: String,
    pub amount_cents: i64,
}

/// Create a payment intent for a month's invoice amount.
pub async fn payment_intent(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<InvoicePaymentRequest>,
) -> ApiResult<Json<PaymentIntentResponse>> {
    user.require_staff()?;

    let period = BillingPeriod::parse(&req.month)?;
    let response = state
        .billing
        .checkout
        .create_payment_intent(user.facility_id, &period, req.amount_cents)
        .await?;
    Ok(Json(response))
}

/// Create a hosted checkout session for a month's invoice amount.
pub async fn checkout_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<InvoicePaymentRequest>,
) -> ApiResult<Json<CheckoutSessionResponse>> {
    user.require_staff()?;

    let period = BillingPeriod::parse(&req.month)?;
    let response = state
        .billing
        .checkout
        .create_checkout_session(user.facility_id, &period, req.amount_cents)
        .await?;
    Ok(Json(response))
}

/// Create a setup intent for saving a card.
pub async fn setup_intent(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<SetupIntentResponse>> {
    user.require_staff()?;

    let response = state
        .billing
        .checkout
        .create_setup_intent(user.facility_id)
        .await?;
    Ok(Json(response))
}
