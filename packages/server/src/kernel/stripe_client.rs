//! Stripe PaymentIntents via the REST API (no SDK dependency).

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::kernel::{BasePaymentGateway, PaymentRequest, PaymentSession};

const STRIPE_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Deserialize)]
struct PaymentIntent {
    id: String,
    client_secret: Option<String>,
    status: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl From<PaymentIntent> for PaymentSession {
    fn from(pi: PaymentIntent) -> Self {
        Self {
            reference: pi.id,
            client_secret: pi.client_secret,
            status: pi.status,
        }
    }
}

pub struct StripePaymentGateway {
    client: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripePaymentGateway {
    pub fn new(secret_key: String) -> Self {
        Self::with_api_base(secret_key, STRIPE_API_BASE.to_string())
    }

    /// Points the client at another host (stripe-mock, a proxy).
    pub fn with_api_base(secret_key: String, api_base: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key,
            api_base,
        }
    }

    async fn read_intent(response: reqwest::Response) -> Result<PaymentIntent> {
        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read Stripe response")?;

        if !status.is_success() {
            let message = serde_json::from_str::<StripeErrorBody>(&body)
                .ok()
                .and_then(|b| {
                    let kind = b.error.kind.unwrap_or_default();
                    b.error.message.map(|m| format!("{} ({})", m, kind))
                })
                .unwrap_or(body);
            anyhow::bail!("Stripe returned {}: {}", status, message);
        }

        serde_json::from_str(&body).context("Unexpected Stripe PaymentIntent payload")
    }
}

#[async_trait]
impl BasePaymentGateway for StripePaymentGateway {
    async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentSession> {
        let amount = request.amount_minor.to_string();
        let order_id = request.order_id.to_string();
        let client_id = request.client_id.to_string();

        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[
                ("amount", amount.as_str()),
                ("currency", request.currency.as_str()),
                ("metadata[order_id]", order_id.as_str()),
                ("metadata[client_id]", client_id.as_str()),
                ("automatic_payment_methods[enabled]", "true"),
            ])
            .send()
            .await
            .context("Stripe create PaymentIntent request failed")?;

        let intent = Self::read_intent(response).await?;
        debug!(order_id = %request.order_id, intent = %intent.id, "Created PaymentIntent");
        Ok(intent.into())
    }

    async fn retrieve_payment(&self, reference: &str) -> Result<PaymentSession> {
        let response = self
            .client
            .get(format!("{}/v1/payment_intents/{}", self.api_base, reference))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .context("Stripe retrieve PaymentIntent request failed")?;

        Ok(Self::read_intent(response).await?.into())
    }
}

/// Gateway used when no processor is configured; every call fails.
#[derive(Debug, Default)]
pub struct DisabledPaymentGateway;

#[async_trait]
impl BasePaymentGateway for DisabledPaymentGateway {
    async fn create_payment(&self, _request: &PaymentRequest) -> Result<PaymentSession> {
        anyhow::bail!("payments are not configured")
    }

    async fn retrieve_payment(&self, _reference: &str) -> Result<PaymentSession> {
        anyhow::bail!("payments are not configured")
    }
}
