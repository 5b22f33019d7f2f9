// Billing crate clippy configuration
// These are intentional patterns in this crate:
#![allow(clippy::too_many_arguments)] // Some Stripe operations require many parameters
// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! MedRoute Billing Module
//!
//! Monthly billing aggregation and payment reconciliation for facility
//! transportation, with Stripe integration for card payments.
//!
//! ## Features
//!
//! - **Billing Periods**: Calendar-month ranges derived from date arithmetic
//! - **Aggregation**: Billable/zero-rated/cancelled trip classification and
//!   monthly statements
//! - **Name Resolution**: Rider display names with an address-derived
//!   fallback when joins come up empty
//! - **Reconciliation**: One invoice row per facility+month as the single
//!   source of truth, updated transactionally
//! - **Payment Methods**: Stored cards with an application-enforced single
//!   default
//! - **Stripe Pass-through**: Customers, payment intents, checkout sessions,
//!   setup intents
//! - **Invariants**: Runnable consistency checks over the billing tables

pub mod aggregate;
pub mod checkout;
pub mod client;
pub mod customer;
pub mod error;
pub mod invariants;
pub mod invoices;
pub mod payment_methods;
pub mod period;
pub mod resolve;

#[cfg(test)]
mod edge_case_tests;

// Aggregation
pub use aggregate::{classify, BilledTrip, BillingAggregator, MonthlyStatement, TripCategory};

// Checkout
pub use checkout::{
    CheckoutService, CheckoutSessionResponse, PaymentIntentResponse, SetupIntentResponse,
};

// Client
pub use client::{StripeClient, StripeConfig};

// Customer
pub use customer::CustomerService;

// Error
pub use error::{BillingError, BillingResult};

// Invariants
pub use invariants::{
    InvariantCheckSummary, InvariantChecker, InvariantViolation, ViolationSeverity,
};

// Invoices
pub use invoices::{
    InvoicePayment, InvoiceRecord, InvoiceStore, NewPayment, PaymentStatusView,
};

// Payment methods
pub use payment_methods::{PaymentMethodService, StoredPaymentMethod};

// Period
pub use period::BillingPeriod;

// Resolve
pub use resolve::{display_name, RiderJoin};

use sqlx::PgPool;

/// Main billing service that combines all billing functionality
pub struct BillingService {
    pub aggregator: BillingAggregator,
    pub checkout: CheckoutService,
    pub customer: CustomerService,
    pub invariants: InvariantChecker,
    pub invoices: InvoiceStore,
    pub payment_methods: PaymentMethodService,
}

impl BillingService {
    /// Create a new billing service from environment variables
    pub fn from_env(pool: PgPool) -> BillingResult<Self> {
        let stripe = StripeClient::from_env()?;
        Ok(Self::new(stripe, pool))
    }

    /// Create a new billing service with an explicit Stripe client
    pub fn new(stripe: StripeClient, pool: PgPool) -> Self {
        Self {
            aggregator: BillingAggregator::new(pool.clone()),
            checkout: CheckoutService::new(stripe.clone(), pool.clone()),
            customer: CustomerService::new(stripe.clone(), pool.clone()),
            invariants: InvariantChecker::new(pool.clone()),
            invoices: InvoiceStore::new(pool.clone()),
            payment_methods: PaymentMethodService::new(stripe, pool),
        }
    }
}
