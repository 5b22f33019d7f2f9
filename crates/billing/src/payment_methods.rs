//! Stored payment methods
//!
//! A facility keeps card references attached to its Stripe customer. At
//! most one is the default, enforced in the application inside the same
//! transaction as the write (no database trigger involved).

use serde::Serialize;
use sqlx::{FromRow, PgPool};
use stripe::{AttachPaymentMethod, PaymentMethod, PaymentMethodId};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::client::StripeClient;
use crate::customer::CustomerService;
use crate::error::{BillingError, BillingResult};

/// A stored card reference for a facility
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StoredPaymentMethod {
    pub id: Uuid,
    pub facility_id: Uuid,
    pub stripe_payment_method_id: String,
    pub brand: Option<String>,
    pub last4: Option<String>,
    pub is_default: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Manages a facility's stored cards
pub struct PaymentMethodService {
    stripe: StripeClient,
    pool: PgPool,
    customers: CustomerService,
}

impl PaymentMethodService {
    pub fn new(stripe: StripeClient, pool: PgPool) -> Self {
        let customers = CustomerService::new(stripe.clone(), pool.clone());
        Self {
            stripe,
            pool,
            customers,
        }
    }

    /// List a facility's stored cards, default first.
    pub async fn list(&self, facility_id: Uuid) -> BillingResult<Vec<StoredPaymentMethod>> {
        let methods: Vec<StoredPaymentMethod> = sqlx::query_as(
            "SELECT id, facility_id, stripe_payment_method_id, brand, last4, is_default, created_at \
             FROM facility_payment_methods \
             WHERE facility_id = $1 \
             ORDER BY is_default DESC, created_at",
        )
        .bind(facility_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(methods)
    }

    /// Attach a Stripe payment method to the facility's customer and store
    /// the reference. The first stored card becomes the default.
    pub async fn attach(
        &self,
        facility_id: Uuid,
        stripe_payment_method_id: &str,
    ) -> BillingResult<StoredPaymentMethod> {
        let customer_id = self.customers.ensure_customer(facility_id).await?;

        let pm_id: PaymentMethodId = stripe_payment_method_id.parse().map_err(|e| {
            BillingError::Validation(format!("Invalid payment method ID: {}", e))
        })?;

        let attached = PaymentMethod::attach(
            self.stripe.inner(),
            &pm_id,
            AttachPaymentMethod {
                customer: customer_id.clone(),
            },
        )
        .await?;

        let (brand, last4) = match attached.card {
            Some(card) => (Some(card.brand), Some(card.last4)),
            None => (None, None),
        };

        let mut tx = self.pool.begin().await?;

        let (existing,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*)::BIGINT FROM facility_payment_methods WHERE facility_id = $1",
        )
        .bind(facility_id)
        .fetch_one(&mut *tx)
        .await?;

        let stored: StoredPaymentMethod = sqlx::query_as(
            r#"
            INSERT INTO facility_payment_methods
                (id, facility_id, stripe_payment_method_id, brand, last4, is_default)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, facility_id, stripe_payment_method_id, brand, last4, is_default, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(facility_id)
        .bind(stripe_payment_method_id)
        .bind(&brand)
        .bind(&last4)
        .bind(existing == 0)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            facility_id = %facility_id,
            payment_method_id = %stored.id,
            customer_id = %customer_id,
            is_default = stored.is_default,
            "Attached payment method"
        );

        Ok(stored)
    }

    /// Make one stored card the facility's default.
    ///
    /// Clears competing defaults and sets the target in a single
    /// transaction, so the at-most-one-default invariant holds at every
    /// commit point.
    pub async fn set_default(
        &self,
        facility_id: Uuid,
        payment_method_id: Uuid,
    ) -> BillingResult<StoredPaymentMethod> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE facility_payment_methods SET is_default = FALSE \
             WHERE facility_id = $1 AND is_default",
        )
        .bind(facility_id)
        .execute(&mut *tx)
        .await?;

        let updated: Option<StoredPaymentMethod> = sqlx::query_as(
            "UPDATE facility_payment_methods SET is_default = TRUE \
             WHERE id = $1 AND facility_id = $2 \
             RETURNING id, facility_id, stripe_payment_method_id, brand, last4, is_default, created_at",
        )
        .bind(payment_method_id)
        .bind(facility_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(updated) = updated else {
            // Rolls back the cleared defaults
            return Err(BillingError::NotFound(
                "Payment method not found for facility".to_string(),
            ));
        };

        tx.commit().await?;

        tracing::info!(
            facility_id = %facility_id,
            payment_method_id = %payment_method_id,
            "Set default payment method"
        );

        Ok(updated)
    }

    /// Detach a stored card from Stripe and remove the local reference.
    ///
    /// Detaching the default leaves the facility with no default until one
    /// is chosen; nothing is promoted automatically.
    pub async fn detach(&self, facility_id: Uuid, payment_method_id: Uuid) -> BillingResult<()> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT stripe_payment_method_id FROM facility_payment_methods \
             WHERE id = $1 AND facility_id = $2",
        )
        .bind(payment_method_id)
        .bind(facility_id)
        .fetch_optional(&self.pool)
        .await?;

        let (stripe_pm_id,) = row.ok_or_else(|| {
            BillingError::NotFound("Payment method not found for facility".to_string())
        })?;

        let pm_id: PaymentMethodId = stripe_pm_id.parse().map_err(|e| {
            BillingError::StripeApi(format!("Invalid stored payment method ID: {}", e))
        })?;

        PaymentMethod::detach(self.stripe.inner(), &pm_id).await?;

        sqlx::query("DELETE FROM facility_payment_methods WHERE id = $1")
            .bind(payment_method_id)
            .execute(&self.pool)
            .await?;

        tracing::info!(
            facility_id = %facility_id,
            payment_method_id = %payment_method_id,
            "Detached payment method"
        );

        Ok(())
    }
}
