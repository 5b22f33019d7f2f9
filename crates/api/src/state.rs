//! Application state

use std::sync::Arc;

use reqwest::Client;
use sqlx::PgPool;

use medroute_billing::BillingService;

use crate::config::Config;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    /// Billing service: aggregation, reconciliation, Stripe pass-through.
    /// Stripe configuration is mandatory here — billing is the product, not
    /// an optional feature.
    pub billing: Arc<BillingService>,
    /// HTTP client for the geocoding proxy
    pub http_client: Client,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> anyhow::Result<Self> {
        let billing = BillingService::from_env(pool.clone())
            .map_err(|e| anyhow::anyhow!("Stripe billing not configured: {}", e))?;
        tracing::info!("Stripe billing service initialized");

        if config.geocoding_api_key.is_empty() {
            tracing::warn!("GEOCODING_API_KEY not set - geocoding proxy will reject requests");
        }

        let http_client = Client::new();

        Ok(Self {
            pool,
            config,
            billing: Arc::new(billing),
            http_client,
        })
    }
}
