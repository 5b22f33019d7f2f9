//! HTTP routes

pub mod admin;
pub mod billing;
pub mod geocode;
pub mod payment_methods;
pub mod stripe;
pub mod trips;

use axum::middleware;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};

use crate::auth;
use crate::state::AppState;

/// Build the full application router.
///
/// Everything under `/api` requires a bearer token; `/health` stays open
/// for load balancer probes.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        // Trips
        .route(
            "/facility/trips",
            post(trips::create_trip).get(trips::list_trips),
        )
        .route("/facility/trips/{id}/status", put(trips::update_status))
        // Billing
        .route("/facility/trips-billing", get(billing::trips_billing))
        .route(
            "/facility/billing/payment-status",
            get(billing::payment_status),
        )
        .route(
            "/facility/billing/record-payment",
            post(billing::record_payment),
        )
        .route(
            "/facility/billing/reset-payment-status",
            post(billing::reset_payment_status),
        )
        .route("/facility/billing/mark-paid", post(billing::mark_paid))
        .route("/facility/billing/mark-unpaid", post(billing::mark_unpaid))
        // Payment methods
        .route(
            "/facility/payment-methods",
            get(payment_methods::list).post(payment_methods::attach),
        )
        .route(
            "/facility/payment-methods/{id}/default",
            post(payment_methods::set_default),
        )
        .route(
            "/facility/payment-methods/{id}",
            delete(payment_methods::detach),
        )
        // Stripe pass-through
        .route("/stripe/payment-intent", post(stripe::payment_intent))
        .route("/stripe/checkout-session", post(stripe::checkout_session))
        .route("/stripe/setup-intent", post(stripe::setup_intent))
        // Geocoding proxy
        .route("/geocode", get(geocode::forward))
        .route("/geocode/reverse", get(geocode::reverse))
        // Operational
        .route("/admin/invariants", get(admin::run_invariants))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
