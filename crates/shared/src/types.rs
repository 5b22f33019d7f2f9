//! Domain value types shared across crates
//!
//! These enums are stored as TEXT columns and converted at the boundary
//! with `as_str`/`FromStr`, so the database never sees an integer
//! discriminant it can't be queried by hand with.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error returned when a stored enum string doesn't match any variant
#[derive(Debug, Clone, thiserror::Error)]
#[error("unrecognized {kind} value: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Lifecycle status of a trip
///
/// Billability is derived from this: only `Completed` trips with a
/// positive price count toward an invoice total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Pending,
    Confirmed,
    Upcoming,
    Completed,
    Cancelled,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Pending => "pending",
            TripStatus::Confirmed => "confirmed",
            TripStatus::Upcoming => "upcoming",
            TripStatus::Completed => "completed",
            TripStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the trip has reached a state it can no longer leave
    pub fn is_terminal(&self) -> bool {
        matches!(self, TripStatus::Completed | TripStatus::Cancelled)
    }

    /// Valid forward transitions for dispatcher status updates
    pub fn can_transition_to(&self, next: TripStatus) -> bool {
        match (self, next) {
            // Cancellation is allowed from any non-terminal state
            (s, TripStatus::Cancelled) if !s.is_terminal() => true,
            (TripStatus::Pending, TripStatus::Confirmed) => true,
            (TripStatus::Confirmed, TripStatus::Upcoming) => true,
            (TripStatus::Pending, TripStatus::Upcoming) => true,
            (TripStatus::Confirmed, TripStatus::Completed) => true,
            (TripStatus::Upcoming, TripStatus::Completed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TripStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TripStatus::Pending),
            "confirmed" => Ok(TripStatus::Confirmed),
            "upcoming" => Ok(TripStatus::Upcoming),
            "completed" => Ok(TripStatus::Completed),
            "cancelled" => Ok(TripStatus::Cancelled),
            other => Err(ParseEnumError {
                kind: "trip status",
                value: other.to_string(),
            }),
        }
    }
}

/// The rider a trip belongs to: an authenticated profile or a
/// facility-managed client without login credentials.
///
/// Stored as a (`rider_kind`, `rider_id`) column pair. A trip always has
/// exactly one rider reference; the old two-nullable-foreign-keys shape
/// cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RiderRef {
    User(Uuid),
    Managed(Uuid),
}

impl RiderRef {
    pub fn kind_str(&self) -> &'static str {
        match self {
            RiderRef::User(_) => "user",
            RiderRef::Managed(_) => "managed",
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            RiderRef::User(id) | RiderRef::Managed(id) => *id,
        }
    }

    /// Reassemble from the stored column pair
    pub fn from_parts(kind: &str, id: Uuid) -> Result<Self, ParseEnumError> {
        match kind {
            "user" => Ok(RiderRef::User(id)),
            "managed" => Ok(RiderRef::Managed(id)),
            other => Err(ParseEnumError {
                kind: "rider kind",
                value: other.to_string(),
            }),
        }
    }
}

/// How a facility paid an invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    Card,
    Check,
    BankTransfer,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentKind::Card => "card",
            PaymentKind::Check => "check",
            PaymentKind::BankTransfer => "bank_transfer",
        }
    }
}

impl FromStr for PaymentKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(PaymentKind::Card),
            "check" => Ok(PaymentKind::Check),
            "bank_transfer" => Ok(PaymentKind::BankTransfer),
            other => Err(ParseEnumError {
                kind: "payment kind",
                value: other.to_string(),
            }),
        }
    }
}

/// Payment state of a monthly invoice row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "paid" => Ok(PaymentStatus::Paid),
            other => Err(ParseEnumError {
                kind: "payment status",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trip_status_round_trips_through_str() {
        for status in [
            TripStatus::Pending,
            TripStatus::Confirmed,
            TripStatus::Upcoming,
            TripStatus::Completed,
            TripStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<TripStatus>().unwrap(), status);
        }
        assert!("en route".parse::<TripStatus>().is_err());
    }

    #[test]
    fn cancellation_allowed_from_non_terminal_states_only() {
        assert!(TripStatus::Pending.can_transition_to(TripStatus::Cancelled));
        assert!(TripStatus::Upcoming.can_transition_to(TripStatus::Cancelled));
        assert!(!TripStatus::Completed.can_transition_to(TripStatus::Cancelled));
        assert!(!TripStatus::Cancelled.can_transition_to(TripStatus::Cancelled));
    }

    #[test]
    fn cancelled_trips_cannot_be_revived() {
        assert!(!TripStatus::Cancelled.can_transition_to(TripStatus::Completed));
        assert!(!TripStatus::Cancelled.can_transition_to(TripStatus::Pending));
    }

    #[test]
    fn rider_ref_rejects_unknown_kind() {
        let id = Uuid::new_v4();
        assert_eq!(
            RiderRef::from_parts("user", id).unwrap(),
            RiderRef::User(id)
        );
        assert_eq!(
            RiderRef::from_parts("managed", id).unwrap(),
            RiderRef::Managed(id)
        );
        assert!(RiderRef::from_parts("guest", id).is_err());
    }
}
