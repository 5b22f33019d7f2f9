//! Monthly billing aggregation
//!
//! Selects a facility's trips for one calendar month, classifies each as
//! billable / zero-rated / cancelled, resolves rider display names, and
//! sums the billable amounts into a statement.

use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use medroute_shared::{RiderRef, TripStatus};

use crate::error::BillingResult;
use crate::period::BillingPeriod;
use crate::resolve::{self, RiderJoin};

/// How a trip counts toward the month's statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripCategory {
    /// Completed with a positive price: contributes its price to the total
    Billable(i64),
    /// Visible but zero-rated (pending/confirmed/upcoming, or completed
    /// without a recorded price)
    Pending,
    /// Visible but excluded from both the total and the pending count
    Cancelled,
}

/// Classify a trip by status and price.
///
/// The billable predicate: `completed` AND a present, positive price.
pub fn classify(status: TripStatus, price_cents: Option<i64>) -> TripCategory {
    match status {
        TripStatus::Cancelled => TripCategory::Cancelled,
        TripStatus::Completed => match price_cents {
            Some(cents) if cents > 0 => TripCategory::Billable(cents),
            _ => TripCategory::Pending,
        },
        TripStatus::Pending | TripStatus::Confirmed | TripStatus::Upcoming => {
            TripCategory::Pending
        }
    }
}

/// One trip as it appears on a monthly statement
#[derive(Debug, Clone, Serialize)]
pub struct BilledTrip {
    pub id: Uuid,
    pub rider: RiderRef,
    pub rider_name: String,
    pub pickup_address: String,
    pub destination_address: String,
    #[serde(with = "time::serde::rfc3339")]
    pub pickup_time: OffsetDateTime,
    pub status: TripStatus,
    pub price_cents: i64,
    pub wheelchair: bool,
    pub billable: bool,
    pub cancellation_reason: Option<String>,
}

/// Aggregated statement for one facility and one calendar month
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyStatement {
    pub facility_id: Uuid,
    pub period: String,
    pub total_billable_cents: i64,
    pub trip_count: i64,
    pub billable_count: i64,
    pub pending_count: i64,
    pub cancelled_count: i64,
    pub trips: Vec<BilledTrip>,
}

impl MonthlyStatement {
    /// Fold classified trips into a statement.
    pub fn from_trips(facility_id: Uuid, period: &BillingPeriod, trips: Vec<BilledTrip>) -> Self {
        let mut total_billable_cents = 0i64;
        let mut billable_count = 0i64;
        let mut pending_count = 0i64;
        let mut cancelled_count = 0i64;

        for trip in &trips {
            match classify(trip.status, Some(trip.price_cents)) {
                TripCategory::Billable(cents) => {
                    total_billable_cents += cents;
                    billable_count += 1;
                }
                TripCategory::Pending => pending_count += 1,
                TripCategory::Cancelled => cancelled_count += 1,
            }
        }

        Self {
            facility_id,
            period: period.label(),
            total_billable_cents,
            trip_count: trips.len() as i64,
            billable_count,
            pending_count,
            cancelled_count,
            trips,
        }
    }
}

/// Trip row joined with both possible rider name sources
#[derive(Debug, FromRow)]
struct TripWithRiderRow {
    id: Uuid,
    rider_kind: String,
    rider_id: Uuid,
    pickup_address: String,
    destination_address: String,
    pickup_time: OffsetDateTime,
    status: String,
    price_cents: Option<i64>,
    wheelchair: bool,
    cancellation_reason: Option<String>,
    profile_first_name: Option<String>,
    profile_last_name: Option<String>,
    managed_first_name: Option<String>,
    managed_last_name: Option<String>,
}

/// Computes monthly statements for facilities
pub struct BillingAggregator {
    pool: PgPool,
}

impl BillingAggregator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build the statement for one facility and month.
    ///
    /// A facility with no trips in range gets an empty statement with zero
    /// totals; the absence of riders is not an error.
    pub async fn monthly_statement(
        &self,
        facility_id: Uuid,
        period: &BillingPeriod,
    ) -> BillingResult<MonthlyStatement> {
        let rows: Vec<TripWithRiderRow> = sqlx::query_as(
            r#"
            SELECT
                t.id,
                t.rider_kind,
                t.rider_id,
                t.pickup_address,
                t.destination_address,
                t.pickup_time,
                t.status,
                t.price_cents,
                t.wheelchair,
                t.cancellation_reason,
                p.first_name AS profile_first_name,
                p.last_name AS profile_last_name,
                m.first_name AS managed_first_name,
                m.last_name AS managed_last_name
            FROM trips t
            LEFT JOIN profiles p
                ON t.rider_kind = 'user' AND p.id = t.rider_id
            LEFT JOIN managed_clients m
                ON t.rider_kind = 'managed' AND m.id = t.rider_id
            WHERE t.facility_id = $1
              AND t.pickup_time >= $2
              AND t.pickup_time < $3
            ORDER BY t.pickup_time
            "#,
        )
        .bind(facility_id)
        .bind(period.range_start())
        .bind(period.range_end_exclusive())
        .fetch_all(&self.pool)
        .await?;

        let mut trips = Vec::with_capacity(rows.len());
        for row in rows {
            let status: TripStatus = row.status.parse()?;
            let rider = RiderRef::from_parts(&row.rider_kind, row.rider_id)?;
            let price_cents = row.price_cents.unwrap_or(0);
            let billable = matches!(
                classify(status, row.price_cents),
                TripCategory::Billable(_)
            );

            let rider_name = resolve::display_name(
                row.rider_id,
                RiderJoin {
                    profile_first: row.profile_first_name.as_deref(),
                    profile_last: row.profile_last_name.as_deref(),
                    managed_first: row.managed_first_name.as_deref(),
                    managed_last: row.managed_last_name.as_deref(),
                },
                &row.pickup_address,
            );

            trips.push(BilledTrip {
                id: row.id,
                rider,
                rider_name,
                pickup_address: row.pickup_address,
                destination_address: row.destination_address,
                pickup_time: row.pickup_time,
                status,
                price_cents,
                wheelchair: row.wheelchair,
                billable,
                cancellation_reason: row.cancellation_reason,
            });
        }

        let statement = MonthlyStatement::from_trips(facility_id, period, trips);

        tracing::debug!(
            facility_id = %facility_id,
            period = %statement.period,
            trip_count = statement.trip_count,
            total_billable_cents = statement.total_billable_cents,
            "Computed monthly statement"
        );

        Ok(statement)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn completed_with_positive_price_is_billable() {
        assert_eq!(
            classify(TripStatus::Completed, Some(4550)),
            TripCategory::Billable(4550)
        );
    }

    #[test]
    fn completed_without_price_is_zero_rated() {
        assert_eq!(classify(TripStatus::Completed, None), TripCategory::Pending);
        assert_eq!(
            classify(TripStatus::Completed, Some(0)),
            TripCategory::Pending
        );
        assert_eq!(
            classify(TripStatus::Completed, Some(-100)),
            TripCategory::Pending
        );
    }

    #[test]
    fn open_statuses_are_pending() {
        for status in [
            TripStatus::Pending,
            TripStatus::Confirmed,
            TripStatus::Upcoming,
        ] {
            assert_eq!(classify(status, Some(9999)), TripCategory::Pending);
        }
    }

    #[test]
    fn cancelled_is_excluded_regardless_of_price() {
        assert_eq!(
            classify(TripStatus::Cancelled, Some(4550)),
            TripCategory::Cancelled
        );
        assert_eq!(classify(TripStatus::Cancelled, None), TripCategory::Cancelled);
    }
}
