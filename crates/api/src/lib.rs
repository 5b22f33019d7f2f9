// Test code patterns:
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! MedRoute API Library
//!
//! This crate contains the HTTP server components for MedRoute: facility
//! trip booking, monthly billing views, payment reconciliation, and the
//! Stripe pass-through endpoints.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
