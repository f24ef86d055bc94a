//! Payment provider port.
//!
//! Checkout talks to the provider only through [`PaymentGateway`]. The
//! production adapter is a thin REST client ([`stripe::StripeGateway`]);
//! [`manual::ManualGateway`] keeps intents in memory for development and
//! tests.

pub mod manual;
pub mod stripe;
pub mod webhook;

use std::collections::BTreeMap;

use async_trait::async_trait;
use repomart_model::Cents;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use webhook::{WebhookEvent, WebhookEventKind, WebhookVerifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPayment,
    Processing,
    Succeeded,
    Canceled,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub amount: Cents,
    pub currency: String,
    pub status: IntentStatus,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaymentIntent {
    pub amount: Cents,
    pub currency: String,
    pub metadata: BTreeMap<String, String>,
    /// Lets the provider collapse retried creations into one intent.
    pub idempotency_key: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    async fn create_intent(&self, request: NewPaymentIntent) -> Result<PaymentIntent>;

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent>;

    /// Authenticate and decode a webhook delivery.
    fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookEvent>;
}
