//! Stripe customer management for facilities

use sqlx::PgPool;
use stripe::{CreateCustomer, Customer, CustomerId};
use uuid::Uuid;

use crate::client::StripeClient;
use crate::error::{BillingError, BillingResult};

/// Maps facilities onto Stripe customers
pub struct CustomerService {
    stripe: StripeClient,
    pool: PgPool,
}

impl CustomerService {
    pub fn new(stripe: StripeClient, pool: PgPool) -> Self {
        Self { stripe, pool }
    }

    /// Get or create the Stripe customer for a facility.
    ///
    /// Creates the customer on first use and writes the id back to the
    /// facility row, so every later charge lands on the same customer.
    pub async fn ensure_customer(&self, facility_id: Uuid) -> BillingResult<CustomerId> {
        let row: Option<(String, Option<String>, Option<String>)> = sqlx::query_as(
            "SELECT name, billing_email, stripe_customer_id FROM facilities WHERE id = $1",
        )
        .bind(facility_id)
        .fetch_optional(&self.pool)
        .await?;

        let (name, billing_email, existing) = row.ok_or_else(|| {
            BillingError::NotFound(format!("Facility {} not found", facility_id))
        })?;

        if let Some(customer_id) = existing {
            return customer_id
                .parse::<CustomerId>()
                .map_err(|e| BillingError::StripeApi(format!("Invalid customer ID: {}", e)));
        }

        let mut metadata = std::collections::HashMap::new();
        metadata.insert("facility_id".to_string(), facility_id.to_string());
        metadata.insert("platform".to_string(), "medroute".to_string());

        let params = CreateCustomer {
            name: Some(&name),
            email: billing_email.as_deref(),
            metadata: Some(metadata),
            ..Default::default()
        };

        let customer = Customer::create(self.stripe.inner(), params).await?;

        sqlx::query(
            "UPDATE facilities SET stripe_customer_id = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(customer.id.as_str())
        .bind(facility_id)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            facility_id = %facility_id,
            customer_id = %customer.id,
            "Created Stripe customer for facility"
        );

        Ok(customer.id)
    }
}
