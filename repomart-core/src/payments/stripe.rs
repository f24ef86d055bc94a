//! REST adapter for a Stripe-compatible payment provider.
//!
//! Only the two payment-intent endpoints checkout needs are wrapped; the
//! provider SDK is intentionally not reproduced.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use repomart_model::Cents;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;
use zeroize::Zeroizing;

use super::webhook::{WebhookEvent, WebhookVerifier};
use super::{IntentStatus, NewPaymentIntent, PaymentGateway, PaymentIntent};
use crate::error::{CoreError, Result};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

pub struct StripeGateway {
    client: reqwest::Client,
    api_base: Url,
    secret_key: Zeroizing<String>,
    webhooks: WebhookVerifier,
}

impl std::fmt::Debug for StripeGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeGateway")
            .field("api_base", &self.api_base.as_str())
            .field("webhooks", &self.webhooks)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct StripeIntent {
    id: String,
    #[serde(default)]
    client_secret: Option<String>,
    amount: i64,
    currency: String,
    status: String,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
    #[serde(default)]
    last_payment_error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

impl StripeIntent {
    fn into_intent(self) -> PaymentIntent {
        let status = match self.status.as_str() {
            "succeeded" => IntentStatus::Succeeded,
            "processing" | "requires_capture" => IntentStatus::Processing,
            "canceled" => IntentStatus::Canceled,
            "requires_payment_method" if self.last_payment_error.is_some() => {
                IntentStatus::Failed
            }
            _ => IntentStatus::RequiresPayment,
        };
        PaymentIntent {
            id: self.id,
            client_secret: self.client_secret.unwrap_or_default(),
            amount: Cents(self.amount),
            currency: self.currency,
            status,
            metadata: self.metadata,
        }
    }
}

impl StripeGateway {
    pub fn new(
        api_base: &str,
        secret_key: impl Into<String>,
        webhook_secret: impl AsRef<[u8]>,
    ) -> Result<Self> {
        let api_base = Url::parse(api_base).map_err(|err| {
            CoreError::Internal(format!("invalid payment API base URL: {err}"))
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|err| {
                CoreError::Internal(format!("failed to build HTTP client: {err}"))
            })?;

        Ok(Self {
            client,
            api_base,
            secret_key: Zeroizing::new(secret_key.into()),
            webhooks: WebhookVerifier::new(webhook_secret),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_base.join(path).map_err(|err| {
            CoreError::Internal(format!("invalid payment endpoint {path}: {err}"))
        })
    }

    async fn read_intent(response: reqwest::Response) -> Result<PaymentIntent> {
        let status = response.status();
        if status.is_success() {
            let intent: StripeIntent = response.json().await.map_err(|err| {
                CoreError::Payment(format!("unreadable provider response: {err}"))
            })?;
            return Ok(intent.into_intent());
        }

        let detail = response
            .json::<StripeErrorBody>()
            .await
            .ok()
            .map(|body| {
                format!(
                    "{}: {}",
                    body.error.kind.unwrap_or_else(|| "error".into()),
                    body.error.message.unwrap_or_default()
                )
            })
            .unwrap_or_else(|| status.to_string());

        warn!(status = %status, detail = %detail, "payment provider request failed");
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CoreError::not_found("Payment intent"));
        }
        Err(CoreError::Payment(detail))
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    fn name(&self) -> &'static str {
        "stripe"
    }

    async fn create_intent(&self, request: NewPaymentIntent) -> Result<PaymentIntent> {
        let mut form: Vec<(String, String)> = vec![
            ("amount".into(), request.amount.get().to_string()),
            ("currency".into(), request.currency.clone()),
            ("automatic_payment_methods[enabled]".into(), "true".into()),
        ];
        for (key, value) in &request.metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
        }

        let response = self
            .client
            .post(self.endpoint("/v1/payment_intents")?)
            .bearer_auth(self.secret_key.as_str())
            .header("Idempotency-Key", &request.idempotency_key)
            .form(&form)
            .send()
            .await
            .map_err(|err| CoreError::Payment(format!("provider unreachable: {err}")))?;

        let intent = Self::read_intent(response).await?;
        debug!(intent_id = %intent.id, amount = %intent.amount, "payment intent created");
        Ok(intent)
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent> {
        let path = format!("/v1/payment_intents/{intent_id}");
        let response = self
            .client
            .get(self.endpoint(&path)?)
            .bearer_auth(self.secret_key.as_str())
            .send()
            .await
            .map_err(|err| CoreError::Payment(format!("provider unreachable: {err}")))?;
        Self::read_intent(response).await
    }

    fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookEvent> {
        self.webhooks.parse(payload, signature, Utc::now())
    }
}
