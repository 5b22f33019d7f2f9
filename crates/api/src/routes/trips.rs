//! Trip booking and status transitions

use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use medroute_billing::{BilledTrip, BillingError, BillingPeriod};
use medroute_shared::{RiderRef, TripStatus};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const TRIP_COLUMNS: &str = "id, facility_id, rider_kind, rider_id, pickup_address, \
     destination_address, pickup_time, status, price_cents, distance_miles, wheelchair, \
     cancellation_reason, created_at";

#[derive(Debug, Deserialize)]
pub struct CreateTripRequest {
    pub rider: RiderRef,
    pub pickup_address: String,
    pub destination_address: String,
    #[serde(with = "time::serde::rfc3339")]
    pub pickup_time: OffsetDateTime,
    pub price_cents: Option<i64>,
    pub distance_miles: Option<f64>,
    #[serde(default)]
    pub wheelchair: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: TripStatus,
    /// Only meaningful when cancelling; recorded at most once
    pub cancellation_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub month: String,
}

#[derive(Debug, Serialize, FromRow)]
pub struct TripResponse {
    pub id: Uuid,
    pub facility_id: Uuid,
    pub rider_kind: String,
    pub rider_id: Uuid,
    pub pickup_address: String,
    pub destination_address: String,
    #[serde(with = "time::serde::rfc3339")]
    pub pickup_time: OffsetDateTime,
    pub status: String,
    pub price_cents: Option<i64>,
    pub distance_miles: Option<f64>,
    pub wheelchair: bool,
    pub cancellation_reason: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Book a trip for one of the facility's riders.
pub async fn create_trip(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateTripRequest>,
) -> ApiResult<Json<TripResponse>> {
    user.require_staff()?;

    if req.pickup_address.trim().is_empty() || req.destination_address.trim().is_empty() {
        return Err(ApiError::Validation(
            "pickup and destination addresses are required".to_string(),
        ));
    }
    if let Some(price) = req.price_cents {
        if price < 0 {
            return Err(ApiError::Validation(
                "price must not be negative".to_string(),
            ));
        }
    }

    // The rider reference must resolve within the caller's facility
    let rider_exists: Option<(Uuid,)> = match req.rider {
        RiderRef::User(id) => {
            sqlx::query_as("SELECT id FROM profiles WHERE id = $1 AND facility_id = $2")
                .bind(id)
                .bind(user.facility_id)
                .fetch_optional(&state.pool)
                .await?
        }
        RiderRef::Managed(id) => {
            sqlx::query_as("SELECT id FROM managed_clients WHERE id = $1 AND facility_id = $2")
                .bind(id)
                .bind(user.facility_id)
                .fetch_optional(&state.pool)
                .await?
        }
    };
    if rider_exists.is_none() {
        return Err(ApiError::Validation(
            "rider does not belong to this facility".to_string(),
        ));
    }

    let trip: TripResponse = sqlx::query_as(&format!(
        r#"
        INSERT INTO trips
            (id, facility_id, rider_kind, rider_id, pickup_address, destination_address,
             pickup_time, status, price_cents, distance_miles, wheelchair)
        VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8, $9, $10)
        RETURNING {TRIP_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(user.facility_id)
    .bind(req.rider.kind_str())
    .bind(req.rider.id())
    .bind(req.pickup_address.trim())
    .bind(req.destination_address.trim())
    .bind(req.pickup_time)
    .bind(req.price_cents)
    .bind(req.distance_miles)
    .bind(req.wheelchair)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(
        facility_id = %user.facility_id,
        trip_id = %trip.id,
        rider_kind = %trip.rider_kind,
        pickup_time = %trip.pickup_time,
        "Booked trip"
    );

    Ok(Json(trip))
}

/// Transition a trip's status.
///
/// Cancellation may carry a reason, recorded exactly once; the first
/// recorded reason wins.
pub async fn update_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(trip_id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<Json<TripResponse>> {
    user.require_staff()?;

    if req.cancellation_reason.is_some() && req.status != TripStatus::Cancelled {
        return Err(ApiError::Validation(
            "cancellation reason is only valid when cancelling".to_string(),
        ));
    }

    let mut tx = state.pool.begin().await?;

    let current: Option<(String,)> = sqlx::query_as(
        "SELECT status FROM trips WHERE id = $1 AND facility_id = $2 FOR UPDATE",
    )
    .bind(trip_id)
    .bind(user.facility_id)
    .fetch_optional(&mut *tx)
    .await?;

    let (current_status,) = current.ok_or(ApiError::NotFound)?;
    let current_status: TripStatus = current_status
        .parse()
        .map_err(|_| ApiError::Internal)?;

    if !current_status.can_transition_to(req.status) {
        return Err(BillingError::InvalidTransition {
            from: current_status,
            to: req.status,
        }
        .into());
    }

    let trip: TripResponse = sqlx::query_as(&format!(
        r#"
        UPDATE trips
        SET status = $1,
            cancellation_reason = COALESCE(cancellation_reason, $2),
            updated_at = NOW()
        WHERE id = $3
        RETURNING {TRIP_COLUMNS}
        "#
    ))
    .bind(req.status.as_str())
    .bind(req.cancellation_reason.as_deref())
    .bind(trip_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        facility_id = %user.facility_id,
        trip_id = %trip_id,
        from = current_status.as_str(),
        to = req.status.as_str(),
        "Trip status updated"
    );

    Ok(Json(trip))
}

/// List a facility's trips for one month, annotated with billable flags
/// and resolved rider names.
pub async fn list_trips(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<MonthQuery>,
) -> ApiResult<Json<Vec<BilledTrip>>> {
    let period = BillingPeriod::parse(&query.month)?;
    let statement = state
        .billing
        .aggregator
        .monthly_statement(user.facility_id, &period)
        .await?;
    Ok(Json(statement.trips))
}
