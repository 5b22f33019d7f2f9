//! Billing error types

use medroute_shared::types::ParseEnumError;
use medroute_shared::TripStatus;

/// Errors surfaced by the billing crate
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Stripe API error: {0}")]
    StripeApi(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid billing period: {0}")]
    InvalidPeriod(String),

    #[error("Invalid trip status transition: {from} -> {to}")]
    InvalidTransition { from: TripStatus, to: TripStatus },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type BillingResult<T> = Result<T, BillingError>;

impl From<sqlx::Error> for BillingError {
    fn from(e: sqlx::Error) -> Self {
        BillingError::Database(e.to_string())
    }
}

impl From<stripe::StripeError> for BillingError {
    fn from(e: stripe::StripeError) -> Self {
        BillingError::StripeApi(e.to_string())
    }
}

// A stored enum value we can't parse means the row was written outside the
// application; treat it as data corruption rather than caller error.
impl From<ParseEnumError> for BillingError {
    fn from(e: ParseEnumError) -> Self {
        BillingError::Internal(e.to_string())
    }
}
