//! Authentication for MedRoute API requests
//!
//! Token issuance belongs to the hosted auth provider; this module only
//! verifies the bearer tokens it mints and exposes the authenticated user
//! to handlers.

pub mod middleware;

pub use middleware::{require_auth, AuthUser, Claims};
