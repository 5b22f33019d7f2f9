// Test code patterns:
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! MedRoute Shared
//!
//! Common infrastructure shared across the MedRoute crates:
//! database pool construction, migrations, and the domain value
//! types that cross crate boundaries.

pub mod db;
pub mod types;

pub use db::{create_pool, run_migrations};
pub use types::{ParseEnumError, PaymentKind, PaymentStatus, RiderRef, TripStatus};
