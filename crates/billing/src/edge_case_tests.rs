// Test file - these are expected patterns in test code
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! Edge Case Tests for Billing
//!
//! Boundary conditions across:
//! - Billing period math (month lengths, leap years, half-open ranges)
//! - Trip classification and statement aggregation
//! - Rider name resolution fallbacks
//! - Trip status transitions
//! - Invoice payment-cover rule

#[cfg(test)]
mod period_boundary_tests {
    use crate::period::BillingPeriod;

    // =========================================================================
    // Every month of a non-leap year ends on its true last day
    // =========================================================================
    #[test]
    fn month_lengths_non_leap_year() {
        let expected = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
        for (i, days) in expected.iter().enumerate() {
            let label = format!("2025-{:02}", i + 1);
            let p = BillingPeriod::parse(&label).unwrap();
            assert_eq!(
                p.last_day().day(),
                *days,
                "wrong last day for {}",
                label
            );
        }
    }

    // =========================================================================
    // Leap-year rules: divisible by 4, except centuries, except div-400
    // =========================================================================
    #[test]
    fn leap_year_rules() {
        assert_eq!(BillingPeriod::parse("2024-02").unwrap().last_day().day(), 29);
        assert_eq!(BillingPeriod::parse("2000-02").unwrap().last_day().day(), 29);
        assert_eq!(BillingPeriod::parse("2100-02").unwrap().last_day().day(), 28);
        assert_eq!(BillingPeriod::parse("2025-02").unwrap().last_day().day(), 28);
    }

    // =========================================================================
    // The range is half-open: the next month's first instant is excluded
    // =========================================================================
    #[test]
    fn range_excludes_next_month_start() {
        let june = BillingPeriod::parse("2025-06").unwrap();
        let july = BillingPeriod::parse("2025-07").unwrap();
        assert_eq!(june.range_end_exclusive(), july.range_start());
        assert!(june.range_start() < june.range_end_exclusive());
    }

    #[test]
    fn rejects_out_of_range_years_and_months() {
        for bad in ["1969-12", "9999-01", "2025-13", "2025-00"] {
            assert!(BillingPeriod::parse(bad).is_err(), "accepted '{}'", bad);
        }
    }
}

#[cfg(test)]
mod statement_tests {
    use time::macros::datetime;
    use time::OffsetDateTime;
    use uuid::Uuid;

    use medroute_shared::{RiderRef, TripStatus};

    use crate::aggregate::{classify, BilledTrip, MonthlyStatement, TripCategory};
    use crate::period::BillingPeriod;

    fn trip(status: TripStatus, price_cents: i64, pickup_time: OffsetDateTime) -> BilledTrip {
        let rider_id = Uuid::new_v4();
        BilledTrip {
            id: Uuid::new_v4(),
            rider: RiderRef::Managed(rider_id),
            rider_name: "Test Rider".to_string(),
            pickup_address: "12 Elm St".to_string(),
            destination_address: "99 Oak Ave".to_string(),
            pickup_time,
            status,
            price_cents,
            wheelchair: false,
            billable: matches!(
                classify(status, Some(price_cents)),
                TripCategory::Billable(_)
            ),
            cancellation_reason: None,
        }
    }

    // =========================================================================
    // The worked example: completed $45.50 + pending + cancelled in June 2025
    // =========================================================================
    #[test]
    fn june_2025_worked_example() {
        let period = BillingPeriod::parse("2025-06").unwrap();
        let facility = Uuid::new_v4();
        let trips = vec![
            trip(TripStatus::Completed, 4550, datetime!(2025-06-03 9:30 UTC)),
            trip(TripStatus::Pending, 0, datetime!(2025-06-15 14:00 UTC)),
            trip(TripStatus::Cancelled, 3000, datetime!(2025-06-20 8:00 UTC)),
        ];

        let statement = MonthlyStatement::from_trips(facility, &period, trips);

        assert_eq!(statement.total_billable_cents, 4550);
        assert_eq!(statement.trip_count, 3);
        assert_eq!(statement.billable_count, 1);
        assert_eq!(statement.pending_count, 1);
        assert_eq!(statement.cancelled_count, 1);
    }

    // =========================================================================
    // Billable total is the arithmetic sum over billable trips only
    // =========================================================================
    #[test]
    fn billable_total_is_exact_sum() {
        let period = BillingPeriod::parse("2025-07").unwrap();
        let when = datetime!(2025-07-10 10:00 UTC);
        let trips = vec![
            trip(TripStatus::Completed, 1025, when),
            trip(TripStatus::Completed, 2550, when),
            trip(TripStatus::Completed, 7, when),
            trip(TripStatus::Upcoming, 5000, when),
            trip(TripStatus::Cancelled, 9999, when),
        ];

        let statement = MonthlyStatement::from_trips(Uuid::new_v4(), &period, trips);

        assert_eq!(statement.total_billable_cents, 1025 + 2550 + 7);
        assert_eq!(statement.billable_count, 3);
        assert_eq!(statement.pending_count, 1);
    }

    // =========================================================================
    // A rider is one tagged reference: each trip contributes exactly once
    // =========================================================================
    #[test]
    fn one_trip_counts_once_regardless_of_rider_kind() {
        let period = BillingPeriod::parse("2025-06").unwrap();
        let when = datetime!(2025-06-05 11:00 UTC);
        let rider_id = Uuid::new_v4();

        let mut as_user = trip(TripStatus::Completed, 4550, when);
        as_user.rider = RiderRef::User(rider_id);
        let statement =
            MonthlyStatement::from_trips(Uuid::new_v4(), &period, vec![as_user]);
        assert_eq!(statement.total_billable_cents, 4550);
        assert_eq!(statement.trip_count, 1);

        let mut as_managed = trip(TripStatus::Completed, 4550, when);
        as_managed.rider = RiderRef::Managed(rider_id);
        let statement =
            MonthlyStatement::from_trips(Uuid::new_v4(), &period, vec![as_managed]);
        assert_eq!(statement.total_billable_cents, 4550);
        assert_eq!(statement.trip_count, 1);
    }

    #[test]
    fn no_trips_is_an_empty_statement_not_an_error() {
        let period = BillingPeriod::parse("2025-06").unwrap();
        let statement = MonthlyStatement::from_trips(Uuid::new_v4(), &period, vec![]);
        assert_eq!(statement.total_billable_cents, 0);
        assert_eq!(statement.trip_count, 0);
        assert_eq!(statement.pending_count, 0);
        assert_eq!(statement.cancelled_count, 0);
    }

    // =========================================================================
    // Completed trips without a usable price are visible but zero-rated
    // =========================================================================
    #[test]
    fn completed_with_zero_price_lands_in_pending_bucket() {
        let period = BillingPeriod::parse("2025-06").unwrap();
        let when = datetime!(2025-06-08 16:00 UTC);
        let trips = vec![trip(TripStatus::Completed, 0, when)];

        let statement = MonthlyStatement::from_trips(Uuid::new_v4(), &period, trips);

        assert_eq!(statement.total_billable_cents, 0);
        assert_eq!(statement.trip_count, 1);
        assert_eq!(statement.billable_count, 0);
        assert_eq!(statement.pending_count, 1);
    }
}

#[cfg(test)]
mod resolver_tests {
    use uuid::Uuid;

    use crate::resolve::{display_name, RiderJoin};

    // =========================================================================
    // Resolution output is never empty, whatever the inputs look like
    // =========================================================================
    #[test]
    fn never_returns_empty_string() {
        let rider = Uuid::new_v4();
        let inputs = [
            "",
            "   ",
            "12345",
            "#4",
            "Apt 4B",
            "123 Main St Apt 2, Springfield, IL",
            ", , ,",
        ];
        for address in inputs {
            let name = display_name(rider, RiderJoin::default(), address);
            assert!(!name.is_empty(), "empty name for address '{}'", address);
            assert!(
                name.contains("(Managed)"),
                "missing fallback marker for '{}'",
                address
            );
        }
    }

    #[test]
    fn fallback_keeps_short_id_suffix() {
        let rider = Uuid::parse_str("deadbeef-0000-4000-8000-000000000000").unwrap();
        let name = display_name(rider, RiderJoin::default(), "742 Evergreen Terrace");
        assert_eq!(name, "Evergreen Terrace (Managed) deadbeef");
    }

    #[test]
    fn whitespace_only_names_do_not_shadow_the_fallback() {
        let rider = Uuid::new_v4();
        let join = RiderJoin {
            profile_first: Some(" "),
            profile_last: Some("\t"),
            managed_first: Some(""),
            managed_last: Some("  "),
        };
        let name = display_name(rider, join, "10 Birch Rd");
        assert!(name.starts_with("Birch Rd"));
    }

    #[test]
    fn profile_beats_managed_beats_address() {
        let rider = Uuid::new_v4();

        let both = RiderJoin {
            profile_first: Some("Ada"),
            profile_last: Some("Lovelace"),
            managed_first: Some("Grace"),
            managed_last: Some("Hopper"),
        };
        assert_eq!(display_name(rider, both, "1 Infinite Loop"), "Ada Lovelace");

        let managed_only = RiderJoin {
            managed_first: Some("Grace"),
            managed_last: Some("Hopper"),
            ..Default::default()
        };
        assert_eq!(
            display_name(rider, managed_only, "1 Infinite Loop"),
            "Grace Hopper"
        );
    }
}

#[cfg(test)]
mod transition_tests {
    use medroute_shared::TripStatus;

    // =========================================================================
    // Forward transitions accepted, terminal states frozen
    // =========================================================================
    #[test]
    fn legal_forward_transitions() {
        assert!(TripStatus::Pending.can_transition_to(TripStatus::Confirmed));
        assert!(TripStatus::Pending.can_transition_to(TripStatus::Upcoming));
        assert!(TripStatus::Confirmed.can_transition_to(TripStatus::Upcoming));
        assert!(TripStatus::Confirmed.can_transition_to(TripStatus::Completed));
        assert!(TripStatus::Upcoming.can_transition_to(TripStatus::Completed));
    }

    #[test]
    fn pending_cannot_jump_straight_to_completed() {
        assert!(!TripStatus::Pending.can_transition_to(TripStatus::Completed));
    }

    #[test]
    fn terminal_states_reject_everything() {
        for next in [
            TripStatus::Pending,
            TripStatus::Confirmed,
            TripStatus::Upcoming,
            TripStatus::Completed,
            TripStatus::Cancelled,
        ] {
            assert!(!TripStatus::Completed.can_transition_to(next));
            assert!(!TripStatus::Cancelled.can_transition_to(next));
        }
    }
}

#[cfg(test)]
mod payment_cover_tests {
    use crate::invoices::covers_total;

    // =========================================================================
    // Paid exactly when recorded payments are positive and reach the total
    // =========================================================================
    #[test]
    fn exact_cover_flips_to_paid() {
        assert!(covers_total(4550, 4550));
    }

    #[test]
    fn overpayment_still_counts_as_paid() {
        assert!(covers_total(5000, 4550));
    }

    #[test]
    fn partial_payment_stays_unpaid() {
        assert!(!covers_total(4549, 4550));
        assert!(!covers_total(1, 4550));
    }

    #[test]
    fn zero_total_needs_a_positive_payment() {
        // An empty month has nothing to collect; no payment means no flip
        assert!(!covers_total(0, 0));
        assert!(covers_total(100, 0));
    }
}
