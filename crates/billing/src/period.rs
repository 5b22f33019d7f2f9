//! Calendar-month billing periods
//!
//! A billing period is a single calendar month, addressed by the `YYYY-MM`
//! strings the dashboard sends. The end of the month is always derived from
//! date arithmetic, never a hardcoded day count, so 28/29/30/31-day months
//! and leap years all come out right.

use std::fmt;

use time::{Date, Duration, Month, OffsetDateTime};

use crate::error::{BillingError, BillingResult};

/// One facility-billable calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingPeriod {
    year: i32,
    month: u8,
    first_day: Date,
    last_day: Date,
}

impl BillingPeriod {
    /// Parse a `YYYY-MM` month string.
    pub fn parse(s: &str) -> BillingResult<Self> {
        let invalid = || BillingError::InvalidPeriod(format!("expected YYYY-MM, got '{}'", s));

        let (year_str, month_str) = s.split_once('-').ok_or_else(invalid)?;
        if year_str.len() != 4 || month_str.len() != 2 {
            return Err(invalid());
        }

        let year: i32 = year_str.parse().map_err(|_| invalid())?;
        let month_num: u8 = month_str.parse().map_err(|_| invalid())?;

        // Anything outside this window is a typo, not a billable month
        if !(1970..=9998).contains(&year) {
            return Err(BillingError::InvalidPeriod(format!(
                "year {} out of range",
                year
            )));
        }

        let month = Month::try_from(month_num).map_err(|_| {
            BillingError::InvalidPeriod(format!("month {} out of range", month_num))
        })?;

        let first_day = Date::from_calendar_date(year, month, 1).map_err(|_| invalid())?;

        // Last day = day before the first of the next month; this is where
        // variable month length and leap years are absorbed.
        let (next_year, next_month) = match month {
            Month::December => (year + 1, Month::January),
            m => (year, m.next()),
        };
        let next_first = Date::from_calendar_date(next_year, next_month, 1)
            .map_err(|_| invalid())?;
        let last_day = next_first.previous_day().ok_or_else(invalid)?;

        Ok(Self {
            year,
            month: month_num,
            first_day,
            last_day,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    /// First calendar day of the month
    pub fn first_day(&self) -> Date {
        self.first_day
    }

    /// Last calendar day of the month (28, 29, 30 or 31)
    pub fn last_day(&self) -> Date {
        self.last_day
    }

    /// Inclusive start of the month as a UTC instant, for range binds
    pub fn range_start(&self) -> OffsetDateTime {
        self.first_day.midnight().assume_utc()
    }

    /// Exclusive end of the month (midnight of the next month's first day)
    pub fn range_end_exclusive(&self) -> OffsetDateTime {
        (self.last_day.midnight() + Duration::days(1)).assume_utc()
    }

    /// Canonical `YYYY-MM` label
    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn february_non_leap_ends_on_28() {
        let p = BillingPeriod::parse("2025-02").unwrap();
        assert_eq!(p.last_day().day(), 28);
    }

    #[test]
    fn february_leap_ends_on_29() {
        let p = BillingPeriod::parse("2024-02").unwrap();
        assert_eq!(p.last_day().day(), 29);
    }

    #[test]
    fn century_non_leap_year() {
        // Divisible by 100 but not 400: not a leap year
        let p = BillingPeriod::parse("2100-02").unwrap();
        assert_eq!(p.last_day().day(), 28);
    }

    #[test]
    fn thirty_day_month_ends_on_30() {
        let p = BillingPeriod::parse("2025-06").unwrap();
        assert_eq!(p.last_day().day(), 30);
    }

    #[test]
    fn thirty_one_day_month_ends_on_31() {
        let p = BillingPeriod::parse("2025-07").unwrap();
        assert_eq!(p.last_day().day(), 31);
    }

    #[test]
    fn december_rolls_into_next_year() {
        let p = BillingPeriod::parse("2025-12").unwrap();
        assert_eq!(p.last_day().day(), 31);
        let end = p.range_end_exclusive();
        assert_eq!(end.year(), 2026);
        assert_eq!(end.month() as u8, 1);
    }

    #[test]
    fn range_is_half_open() {
        let p = BillingPeriod::parse("2025-06").unwrap();
        assert_eq!(p.range_start().day(), 1);
        assert_eq!(p.range_end_exclusive().day(), 1);
        assert_eq!(p.range_end_exclusive().month() as u8, 7);
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in ["2025-13", "2025-00", "2025", "06-2025", "garbage", "25-06", "2025-6"] {
            assert!(BillingPeriod::parse(bad).is_err(), "accepted '{}'", bad);
        }
    }

    #[test]
    fn label_round_trips() {
        let p = BillingPeriod::parse("2025-06").unwrap();
        assert_eq!(p.label(), "2025-06");
        assert_eq!(p.to_string(), "2025-06");
    }
}
