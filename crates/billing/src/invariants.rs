//! Billing invariants
//!
//! Runnable consistency checks over the billing tables. The original
//! operation relied on a pile of one-off verification scripts to catch
//! drift between trips, invoices and payment records; these checks are the
//! standing replacement. They only read, never write — anything they find
//! is reported, not silently patched.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::BillingResult;

/// Result of a single failed invariant check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvariantViolation {
    /// Which invariant was violated
    pub invariant: String,
    /// Facility(ies) affected
    pub facility_ids: Vec<Uuid>,
    /// Human-readable description of the violation
    pub description: String,
    /// Additional context for debugging
    pub context: serde_json::Value,
    /// Severity level
    pub severity: ViolationSeverity,
}

/// Severity of an invariant violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationSeverity {
    /// Critical - invoices may be wrong or double-collected
    Critical,
    /// High - data inconsistency that needs attention
    High,
    /// Medium - potential issue, should investigate
    Medium,
    /// Low - minor inconsistency, informational
    Low,
}

impl std::fmt::Display for ViolationSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationSeverity::Critical => write!(f, "CRITICAL"),
            ViolationSeverity::High => write!(f, "HIGH"),
            ViolationSeverity::Medium => write!(f, "MEDIUM"),
            ViolationSeverity::Low => write!(f, "LOW"),
        }
    }
}

/// Summary of a full invariant run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvariantCheckSummary {
    /// When the check was run
    pub checked_at: OffsetDateTime,
    /// Total number of checks run
    pub checks_run: usize,
    /// Number of checks that passed
    pub checks_passed: usize,
    /// Number of checks that failed
    pub checks_failed: usize,
    /// List of all violations found
    pub violations: Vec<InvariantViolation>,
    /// Overall health status
    pub healthy: bool,
}

/// Row type for dangling rider references
#[derive(Debug, sqlx::FromRow)]
struct DanglingRiderRow {
    trip_id: Uuid,
    facility_id: Uuid,
    rider_kind: String,
    rider_id: Uuid,
}

/// Row type for duplicate default payment methods
#[derive(Debug, sqlx::FromRow)]
struct MultipleDefaultsRow {
    facility_id: Uuid,
    default_count: i64,
}

/// Row type for paid invoices whose payment rows don't add up
#[derive(Debug, sqlx::FromRow)]
struct PaymentMismatchRow {
    invoice_id: Uuid,
    facility_id: Uuid,
    amount_paid_cents: i64,
    payment_sum_cents: i64,
}

/// Row type for invoices whose stored total drifted from the trips
#[derive(Debug, sqlx::FromRow)]
struct StaleTotalRow {
    invoice_id: Uuid,
    facility_id: Uuid,
    period_start: time::Date,
    stored_total_cents: i64,
    computed_total_cents: i64,
}

/// Row type for facilities holding cards without a Stripe customer
#[derive(Debug, sqlx::FromRow)]
struct MissingCustomerRow {
    facility_id: Uuid,
    facility_name: String,
    method_count: i64,
}

/// Service for running billing invariant checks
#[derive(Clone)]
pub struct InvariantChecker {
    pool: PgPool,
}

impl InvariantChecker {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run all invariant checks and return a summary
    pub async fn run_all_checks(&self) -> BillingResult<InvariantCheckSummary> {
        let now = OffsetDateTime::now_utc();
        let mut violations = Vec::new();

        violations.extend(self.check_rider_reference_valid().await?);
        violations.extend(self.check_single_default_payment_method().await?);
        violations.extend(self.check_paid_invoice_payments_match().await?);
        violations.extend(self.check_invoice_total_matches_trips().await?);
        violations.extend(self.check_facility_stripe_customer_exists().await?);

        let checks_run = 5;
        let checks_failed = violations
            .iter()
            .map(|v| &v.invariant)
            .collect::<std::collections::HashSet<_>>()
            .len();
        let checks_passed = checks_run - checks_failed;

        Ok(InvariantCheckSummary {
            checked_at: now,
            checks_run,
            checks_passed,
            checks_failed,
            healthy: violations.is_empty(),
            violations,
        })
    }

    /// Invariant 1: Every trip's rider reference resolves
    ///
    /// A `rider_id` must point at a row of the kind named by `rider_kind`.
    /// A dangling reference means the statement falls back to the address
    /// heuristic for that rider's name and the trip can't be attributed.
    async fn check_rider_reference_valid(&self) -> BillingResult<Vec<InvariantViolation>> {
        let rows: Vec<DanglingRiderRow> = sqlx::query_as(
            r#"
            SELECT t.id AS trip_id, t.facility_id, t.rider_kind, t.rider_id
            FROM trips t
            WHERE (t.rider_kind = 'user'
                   AND NOT EXISTS (SELECT 1 FROM profiles p WHERE p.id = t.rider_id))
               OR (t.rider_kind = 'managed'
                   AND NOT EXISTS (SELECT 1 FROM managed_clients m WHERE m.id = t.rider_id))
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvariantViolation {
                invariant: "rider_reference_valid".to_string(),
                facility_ids: vec![row.facility_id],
                description: format!(
                    "Trip {} references {} rider {} which does not exist",
                    row.trip_id, row.rider_kind, row.rider_id
                ),
                context: serde_json::json!({
                    "trip_id": row.trip_id,
                    "rider_kind": row.rider_kind,
                    "rider_id": row.rider_id,
                }),
                severity: ViolationSeverity::High,
            })
            .collect())
    }

    /// Invariant 2: At most one default payment method per facility
    async fn check_single_default_payment_method(
        &self,
    ) -> BillingResult<Vec<InvariantViolation>> {
        let rows: Vec<MultipleDefaultsRow> = sqlx::query_as(
            r#"
            SELECT facility_id, COUNT(*)::BIGINT AS default_count
            FROM facility_payment_methods
            WHERE is_default
            GROUP BY facility_id
            HAVING COUNT(*) > 1
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvariantViolation {
                invariant: "single_default_payment_method".to_string(),
                facility_ids: vec![row.facility_id],
                description: format!(
                    "Facility has {} default payment methods (expected at most 1)",
                    row.default_count
                ),
                context: serde_json::json!({
                    "default_count": row.default_count,
                }),
                severity: ViolationSeverity::Critical,
            })
            .collect())
    }

    /// Invariant 3: A paid invoice's recorded amount matches its payment rows
    ///
    /// `amount_paid_cents` is maintained transactionally with the payment
    /// inserts; a mismatch means a write bypassed the store.
    async fn check_paid_invoice_payments_match(&self) -> BillingResult<Vec<InvariantViolation>> {
        let rows: Vec<PaymentMismatchRow> = sqlx::query_as(
            r#"
            SELECT
                i.id AS invoice_id,
                i.facility_id,
                i.amount_paid_cents,
                COALESCE(SUM(p.amount_cents), 0)::BIGINT AS payment_sum_cents
            FROM facility_invoices i
            LEFT JOIN facility_invoice_payments p ON p.invoice_id = i.id
            WHERE i.payment_status = 'paid'
            GROUP BY i.id, i.facility_id, i.amount_paid_cents
            HAVING i.amount_paid_cents <> COALESCE(SUM(p.amount_cents), 0)
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvariantViolation {
                invariant: "paid_invoice_payments_match".to_string(),
                facility_ids: vec![row.facility_id],
                description: format!(
                    "Paid invoice {} records ${:.2} paid but its payment rows sum to ${:.2}",
                    row.invoice_id,
                    row.amount_paid_cents as f64 / 100.0,
                    row.payment_sum_cents as f64 / 100.0
                ),
                context: serde_json::json!({
                    "invoice_id": row.invoice_id,
                    "amount_paid_cents": row.amount_paid_cents,
                    "payment_sum_cents": row.payment_sum_cents,
                }),
                severity: ViolationSeverity::Critical,
            })
            .collect())
    }

    /// Invariant 4: Stored invoice totals match the live trip data
    ///
    /// Totals are refreshed on every invoice write, but trips can still be
    /// edited afterwards; this surfaces the drift instead of letting it
    /// linger until a facility disputes the bill.
    async fn check_invoice_total_matches_trips(&self) -> BillingResult<Vec<InvariantViolation>> {
        let rows: Vec<StaleTotalRow> = sqlx::query_as(
            r#"
            SELECT
                i.id AS invoice_id,
                i.facility_id,
                i.period_start,
                i.total_cents AS stored_total_cents,
                COALESCE((
                    SELECT SUM(t.price_cents)
                    FROM trips t
                    WHERE t.facility_id = i.facility_id
                      AND t.pickup_time >= i.period_start::TIMESTAMPTZ
                      AND t.pickup_time < (i.period_end + 1)::TIMESTAMPTZ
                      AND t.status = 'completed'
                      AND t.price_cents > 0
                ), 0)::BIGINT AS computed_total_cents
            FROM facility_invoices i
            WHERE i.total_cents <> COALESCE((
                    SELECT SUM(t.price_cents)
                    FROM trips t
                    WHERE t.facility_id = i.facility_id
                      AND t.pickup_time >= i.period_start::TIMESTAMPTZ
                      AND t.pickup_time < (i.period_end + 1)::TIMESTAMPTZ
                      AND t.status = 'completed'
                      AND t.price_cents > 0
                ), 0)
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvariantViolation {
                invariant: "invoice_total_matches_trips".to_string(),
                facility_ids: vec![row.facility_id],
                description: format!(
                    "Invoice {} for {} stores ${:.2} but the month's billable trips sum to ${:.2}",
                    row.invoice_id,
                    row.period_start,
                    row.stored_total_cents as f64 / 100.0,
                    row.computed_total_cents as f64 / 100.0
                ),
                context: serde_json::json!({
                    "invoice_id": row.invoice_id,
                    "stored_total_cents": row.stored_total_cents,
                    "computed_total_cents": row.computed_total_cents,
                }),
                severity: ViolationSeverity::High,
            })
            .collect())
    }

    /// Invariant 5: Facilities with stored cards have a Stripe customer
    async fn check_facility_stripe_customer_exists(
        &self,
    ) -> BillingResult<Vec<InvariantViolation>> {
        let rows: Vec<MissingCustomerRow> = sqlx::query_as(
            r#"
            SELECT
                f.id AS facility_id,
                f.name AS facility_name,
                COUNT(pm.id)::BIGINT AS method_count
            FROM facilities f
            JOIN facility_payment_methods pm ON pm.facility_id = f.id
            WHERE f.stripe_customer_id IS NULL
            GROUP BY f.id, f.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvariantViolation {
                invariant: "facility_stripe_customer_exists".to_string(),
                facility_ids: vec![row.facility_id],
                description: format!(
                    "Facility '{}' holds {} stored payment methods but has no Stripe customer",
                    row.facility_name, row.method_count
                ),
                context: serde_json::json!({
                    "facility_name": row.facility_name,
                    "method_count": row.method_count,
                }),
                severity: ViolationSeverity::High,
            })
            .collect())
    }

    /// Run a single invariant check by name
    pub async fn run_check(&self, name: &str) -> BillingResult<Vec<InvariantViolation>> {
        match name {
            "rider_reference_valid" => self.check_rider_reference_valid().await,
            "single_default_payment_method" => self.check_single_default_payment_method().await,
            "paid_invoice_payments_match" => self.check_paid_invoice_payments_match().await,
            "invoice_total_matches_trips" => self.check_invoice_total_matches_trips().await,
            "facility_stripe_customer_exists" => {
                self.check_facility_stripe_customer_exists().await
            }
            _ => Ok(vec![]),
        }
    }

    /// Get list of all available invariant checks
    pub fn available_checks() -> Vec<&'static str> {
        vec![
            "rider_reference_valid",
            "single_default_payment_method",
            "paid_invoice_payments_match",
            "invoice_total_matches_trips",
            "facility_stripe_customer_exists",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_severity_display() {
        assert_eq!(ViolationSeverity::Critical.to_string(), "CRITICAL");
        assert_eq!(ViolationSeverity::High.to_string(), "HIGH");
        assert_eq!(ViolationSeverity::Medium.to_string(), "MEDIUM");
        assert_eq!(ViolationSeverity::Low.to_string(), "LOW");
    }

    #[test]
    fn test_available_checks() {
        let checks = InvariantChecker::available_checks();
        assert_eq!(checks.len(), 5);
        assert!(checks.contains(&"rider_reference_valid"));
        assert!(checks.contains(&"single_default_payment_method"));
    }
}
