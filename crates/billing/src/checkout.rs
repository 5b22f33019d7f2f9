//! Stripe pass-through operations
//!
//! Payment intents, checkout sessions, and setup intents for facility
//! invoice payments. The service's whole job is mapping facility and
//! billing-period identifiers into Stripe customer/metadata fields and
//! handing the resulting client secrets back to the dashboard.

use serde::Serialize;
use sqlx::PgPool;
use stripe::{
    CheckoutSession, CheckoutSessionMode, CreateCheckoutSession, CreateCheckoutSessionLineItems,
    CreateCheckoutSessionLineItemsPriceData, CreateCheckoutSessionLineItemsPriceDataProductData,
    CreatePaymentIntent, CreateSetupIntent, PaymentIntent, SetupIntent,
};
use uuid::Uuid;

use crate::client::StripeClient;
use crate::customer::CustomerService;
use crate::error::{BillingError, BillingResult};
use crate::period::BillingPeriod;

/// Client-facing payment intent handle
#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntentResponse {
    pub payment_intent_id: String,
    pub client_secret: String,
    pub amount_cents: i64,
}

/// Client-facing checkout session handle
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSessionResponse {
    pub session_id: String,
    pub url: Option<String>,
}

/// Client-facing setup intent handle (for saving a card)
#[derive(Debug, Clone, Serialize)]
pub struct SetupIntentResponse {
    pub setup_intent_id: String,
    pub client_secret: String,
}

/// Creates Stripe payment objects on behalf of facilities
pub struct CheckoutService {
    stripe: StripeClient,
    customers: CustomerService,
}

impl CheckoutService {
    pub fn new(stripe: StripeClient, pool: PgPool) -> Self {
        let customers = CustomerService::new(stripe.clone(), pool);
        Self { stripe, customers }
    }

    /// Create a payment intent for a month's invoice amount.
    pub async fn create_payment_intent(
        &self,
        facility_id: Uuid,
        period: &BillingPeriod,
        amount_cents: i64,
    ) -> BillingResult<PaymentIntentResponse> {
        if amount_cents <= 0 {
            return Err(BillingError::Validation(
                "payment amount must be positive".to_string(),
            ));
        }

        let customer_id = self.customers.ensure_customer(facility_id).await?;
        let description = format!("MedRoute transportation invoice {}", period);

        let mut metadata = std::collections::HashMap::new();
        metadata.insert("facility_id".to_string(), facility_id.to_string());
        metadata.insert("billing_period".to_string(), period.label());

        let mut params =
            CreatePaymentIntent::new(amount_cents, self.stripe.config().currency);
        params.customer = Some(customer_id);
        params.description = Some(&description);
        params.metadata = Some(metadata);

        let intent = PaymentIntent::create(self.stripe.inner(), params).await?;

        let client_secret = intent.client_secret.ok_or_else(|| {
            BillingError::StripeApi("Payment intent returned no client secret".to_string())
        })?;

        tracing::info!(
            facility_id = %facility_id,
            period = %period,
            payment_intent_id = %intent.id,
            amount_cents = amount_cents,
            "Created payment intent"
        );

        Ok(PaymentIntentResponse {
            payment_intent_id: intent.id.to_string(),
            client_secret,
            amount_cents,
        })
    }

    /// Create a hosted checkout session for a month's invoice amount.
    ///
    /// Checkout (mode=payment) always requires user interaction, so the
    /// payer sees the amount and confirms it.
    pub async fn create_checkout_session(
        &self,
        facility_id: Uuid,
        period: &BillingPeriod,
        amount_cents: i64,
    ) -> BillingResult<CheckoutSessionResponse> {
        if amount_cents <= 0 {
            return Err(BillingError::Validation(
                "payment amount must be positive".to_string(),
            ));
        }

        let customer_id = self.customers.ensure_customer(facility_id).await?;

        let base_url = &self.stripe.config().app_base_url;
        let success_url = format!(
            "{}/billing?payment=success&session_id={{CHECKOUT_SESSION_ID}}",
            base_url
        );
        let cancel_url = format!("{}/billing?payment=cancelled", base_url);

        let mut metadata = std::collections::HashMap::new();
        metadata.insert("facility_id".to_string(), facility_id.to_string());
        metadata.insert("billing_period".to_string(), period.label());

        let line_items = vec![CreateCheckoutSessionLineItems {
            price_data: Some(CreateCheckoutSessionLineItemsPriceData {
                currency: self.stripe.config().currency,
                unit_amount: Some(amount_cents),
                product_data: Some(CreateCheckoutSessionLineItemsPriceDataProductData {
                    name: format!("Transportation invoice {}", period),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            quantity: Some(1),
            ..Default::default()
        }];

        let params = CreateCheckoutSession {
            customer: Some(customer_id),
            mode: Some(CheckoutSessionMode::Payment),
            line_items: Some(line_items),
            success_url: Some(&success_url),
            cancel_url: Some(&cancel_url),
            metadata: Some(metadata),
            ..Default::default()
        };

        let session = CheckoutSession::create(self.stripe.inner(), params).await?;

        tracing::info!(
            facility_id = %facility_id,
            period = %period,
            session_id = %session.id,
            amount_cents = amount_cents,
            "Created checkout session"
        );

        Ok(CheckoutSessionResponse {
            session_id: session.id.to_string(),
            url: session.url,
        })
    }

    /// Create a setup intent so a facility can save a card for later use.
    pub async fn create_setup_intent(
        &self,
        facility_id: Uuid,
    ) -> BillingResult<SetupIntentResponse> {
        let customer_id = self.customers.ensure_customer(facility_id).await?;

        let mut metadata = std::collections::HashMap::new();
        metadata.insert("facility_id".to_string(), facility_id.to_string());

        let mut params = CreateSetupIntent::new();
        params.customer = Some(customer_id);
        params.metadata = Some(metadata);

        let intent = SetupIntent::create(self.stripe.inner(), params).await?;

        let client_secret = intent.client_secret.ok_or_else(|| {
            BillingError::StripeApi("Setup intent returned no client secret".to_string())
        })?;

        tracing::info!(
            facility_id = %facility_id,
            setup_intent_id = %intent.id,
            "Created setup intent"
        );

        Ok(SetupIntentResponse {
            setup_intent_id: intent.id.to_string(),
            client_secret,
        })
    }
}
