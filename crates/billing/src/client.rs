//! Stripe client wrapper

use std::sync::Arc;

use stripe::Currency;

use crate::error::{BillingError, BillingResult};

/// Stripe configuration loaded from the environment
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Secret API key (`sk_live_…` / `sk_test_…`)
    pub secret_key: String,
    /// Currency every charge is denominated in
    pub currency: Currency,
    /// Base URL the checkout success/cancel redirects point back at
    pub app_base_url: String,
}

impl StripeConfig {
    pub fn from_env() -> BillingResult<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .map_err(|_| BillingError::Internal("STRIPE_SECRET_KEY not set".to_string()))?;

        let app_base_url = std::env::var("APP_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Self {
            secret_key,
            currency: Currency::USD,
            app_base_url,
        })
    }
}

/// Shared handle on the Stripe API client and its configuration
#[derive(Clone)]
pub struct StripeClient {
    client: Arc<stripe::Client>,
    config: Arc<StripeConfig>,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Self {
        let client = stripe::Client::new(config.secret_key.clone());
        Self {
            client: Arc::new(client),
            config: Arc::new(config),
        }
    }

    pub fn from_env() -> BillingResult<Self> {
        Ok(Self::new(StripeConfig::from_env()?))
    }

    /// The underlying `async-stripe` client
    pub fn inner(&self) -> &stripe::Client {
        &self.client
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }
}
