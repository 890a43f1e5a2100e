//! Billing processor client
//!
//! The processor is reached through [`BillingProvider`] so tests can run
//! against an in-process fake. [`StripeClient`] speaks the Stripe REST API
//! (form-encoded requests, bearer secret key).

use async_trait::async_trait;
use chronicle_common::config::BillingConfig;
use chronicle_common::db::User;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db;
use crate::error::ApiResult;

const USER_AGENT: &str = concat!("chronicle-server/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Billing is not configured")]
    NotConfigured,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

/// What the client needs to confirm payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionIntent {
    pub subscription_id: String,
    pub client_secret: String,
}

#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Create a customer for `user`, returning the customer id
    async fn create_customer(&self, user: &User) -> Result<String, BillingError>;

    /// Create an incomplete subscription awaiting payment confirmation
    async fn create_subscription(
        &self,
        customer_id: &str,
        user: &User,
    ) -> Result<SubscriptionIntent, BillingError>;
}

#[derive(Debug, Deserialize)]
struct CustomerResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SubscriptionResponse {
    id: String,
    latest_invoice: Option<InvoiceResponse>,
}

#[derive(Debug, Deserialize)]
struct InvoiceResponse {
    payment_intent: Option<PaymentIntentResponse>,
}

#[derive(Debug, Deserialize)]
struct PaymentIntentResponse {
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Stripe REST client
pub struct StripeClient {
    http_client: reqwest::Client,
    api_base: String,
    secret_key: String,
    price_id: String,
}

impl StripeClient {
    pub fn new(api_base: String, secret_key: String, price_id: String) -> Result<Self, BillingError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| BillingError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key,
            price_id,
        })
    }

    /// Build from configuration; `NotConfigured` without a secret key
    pub fn from_config(config: &BillingConfig) -> Result<Self, BillingError> {
        let secret_key = config.secret_key.clone().ok_or(BillingError::NotConfigured)?;
        Self::new(config.api_base.clone(), secret_key, config.price_id.clone())
    }

    async fn post_form<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, BillingError> {
        let url = format!("{}{}", self.api_base, path);
        debug!(url = %url, "Billing API request");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(params)
            .send()
            .await
            .map_err(|e| BillingError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .ok()
                .and_then(|envelope| envelope.error.message)
                .unwrap_or(text);
            warn!(status = status.as_u16(), "Billing API rejected request: {}", message);
            return Err(BillingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| BillingError::Parse(e.to_string()))
    }
}

#[async_trait]
impl BillingProvider for StripeClient {
    async fn create_customer(&self, user: &User) -> Result<String, BillingError> {
        let params = [
            ("email", user.username.clone()),
            ("metadata[userId]", user.id.to_string()),
        ];
        let customer: CustomerResponse = self.post_form("/v1/customers", &params).await?;
        Ok(customer.id)
    }

    async fn create_subscription(
        &self,
        customer_id: &str,
        user: &User,
    ) -> Result<SubscriptionIntent, BillingError> {
        let params = [
            ("customer", customer_id.to_string()),
            ("items[0][price]", self.price_id.clone()),
            ("payment_behavior", "default_incomplete".to_string()),
            ("expand[]", "latest_invoice.payment_intent".to_string()),
            ("metadata[userId]", user.id.to_string()),
        ];
        let subscription: SubscriptionResponse =
            self.post_form("/v1/subscriptions", &params).await?;

        let client_secret = subscription
            .latest_invoice
            .and_then(|invoice| invoice.payment_intent)
            .and_then(|intent| intent.client_secret)
            .ok_or_else(|| {
                BillingError::Parse("Subscription has no payment intent client secret".to_string())
            })?;

        Ok(SubscriptionIntent {
            subscription_id: subscription.id,
            client_secret,
        })
    }
}

/// Stand-in used when no billing secret key is configured
pub struct UnconfiguredBilling;

#[async_trait]
impl BillingProvider for UnconfiguredBilling {
    async fn create_customer(&self, _user: &User) -> Result<String, BillingError> {
        Err(BillingError::NotConfigured)
    }

    async fn create_subscription(
        &self,
        _customer_id: &str,
        _user: &User,
    ) -> Result<SubscriptionIntent, BillingError> {
        Err(BillingError::NotConfigured)
    }
}

/// Begin a subscription for `user`
///
/// Reuses the user's billing customer when one exists and records the new
/// subscription id. The entitlement flag is left alone; it changes only
/// when the processor confirms through a webhook.
pub async fn start_subscription(
    pool: &SqlitePool,
    provider: &dyn BillingProvider,
    user: &User,
) -> ApiResult<SubscriptionIntent> {
    let customer_id = match &user.billing_customer_id {
        Some(existing) => existing.clone(),
        None => {
            let created = provider.create_customer(user).await?;
            // Saved before the subscription call so a retry reuses it
            db::users::set_billing_customer(pool, user.id, &created).await?;
            debug!(user_id = user.id, customer_id = %created, "Billing customer created");
            created
        }
    };

    let intent = provider.create_subscription(&customer_id, user).await?;
    db::users::set_billing_subscription(pool, user.id, &intent.subscription_id).await?;

    info!(
        user_id = user.id,
        subscription_id = %intent.subscription_id,
        "Subscription initiated"
    );

    Ok(intent)
}
