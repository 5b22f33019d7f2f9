//! Stored payment method management

use axum::extract::{Extension, Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use medroute_billing::StoredPaymentMethod;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AttachRequest {
    pub stripe_payment_method_id: String,
}

/// List the facility's stored cards, default first.
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<StoredPaymentMethod>>> {
    user.require_staff()?;

    let methods = state
        .billing
        .payment_methods
        .list(user.facility_id)
        .await?;
    Ok(Json(methods))
}

/// Attach a new card to the facility's Stripe customer.
pub async fn attach(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<AttachRequest>,
) -> ApiResult<Json<StoredPaymentMethod>> {
    user.require_staff()?;

    let stored = state
        .billing
        .payment_methods
        .attach(user.facility_id, &req.stripe_payment_method_id)
        .await?;
    Ok(Json(stored))
}

/// Make one stored card the facility default.
pub async fn set_default(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(payment_method_id): Path<Uuid>,
) -> ApiResult<Json<StoredPaymentMethod>> {
    user.require_staff()?;

    let updated = state
        .billing
        .payment_methods
        .set_default(user.facility_id, payment_method_id)
        .await?;
    Ok(Json(updated))
}

/// Detach a stored card.
pub async fn detach(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(payment_method_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    user.require_staff()?;

    state
        .billing
        .payment_methods
        .detach(user.facility_id, payment_method_id)
        .await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
