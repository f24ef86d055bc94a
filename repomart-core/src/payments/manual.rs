//! In-process payment gateway.
//!
//! Intents are created in `requires_payment` and only move when
//! [`ManualGateway::mark`] is called, which makes checkout flows fully
//! scriptable in development and tests. Webhook deliveries can be produced
//! with [`ManualGateway::signed_event`] and are verified exactly like real
//! provider deliveries.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use super::webhook::{WebhookEvent, WebhookVerifier, encode_event};
use super::{IntentStatus, NewPaymentIntent, PaymentGateway, PaymentIntent};
use crate::error::{CoreError, Result};

#[derive(Debug)]
pub struct ManualGateway {
    intents: Mutex<HashMap<String, PaymentIntent>>,
    /// Idempotency key -> intent id.
    keys: Mutex<HashMap<String, String>>,
    webhooks: WebhookVerifier,
}

impl ManualGateway {
    pub fn new(webhook_secret: impl AsRef<[u8]>) -> Self {
        Self {
            intents: Mutex::new(HashMap::new()),
            keys: Mutex::new(HashMap::new()),
            webhooks: WebhookVerifier::new(webhook_secret),
        }
    }

    /// Force an intent into `status`, as if the buyer completed or abandoned
    /// payment.
    pub fn mark(&self, intent_id: &str, status: IntentStatus) -> Result<PaymentIntent> {
        let mut intents = self.intents.lock();
        let intent = intents
            .get_mut(intent_id)
            .ok_or_else(|| CoreError::not_found("Payment intent"))?;
        intent.status = status;
        Ok(intent.clone())
    }

    /// Build a signed `payment_intent.*` delivery for the current state of
    /// `intent_id`. Returns `(payload, signature_header)`.
    pub fn signed_event(&self, intent_id: &str, kind: &str) -> Result<(Vec<u8>, String)> {
        let intent = self
            .intents
            .lock()
            .get(intent_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("Payment intent"))?;
        let event_id = format!("evt_{}", Uuid::new_v4().simple());
        let payload = encode_event(&event_id, kind, &intent)?;
        let header = self.webhooks.sign(&payload, Utc::now().timestamp());
        Ok((payload, header))
    }

    pub fn intent_count(&self) -> usize {
        self.intents.lock().len()
    }
}

#[async_trait]
impl PaymentGateway for ManualGateway {
    fn name(&self) -> &'static str {
        "manual"
    }

    async fn create_intent(&self, request: NewPaymentIntent) -> Result<PaymentIntent> {
        let mut keys = self.keys.lock();
        let mut intents = self.intents.lock();
        if let Some(existing) = keys
            .get(&request.idempotency_key)
            .and_then(|id| intents.get(id))
        {
            return Ok(existing.clone());
        }

        let id = format!("pi_{}", Uuid::new_v4().simple());
        let intent = PaymentIntent {
            client_secret: format!("{id}_secret_{}", Uuid::new_v4().simple()),
            id: id.clone(),
            amount: request.amount,
            currency: request.currency,
            status: IntentStatus::RequiresPayment,
            metadata: request.metadata,
        };
        keys.insert(request.idempotency_key, id.clone());
        intents.insert(id, intent.clone());
        Ok(intent)
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent> {
        self.intents
            .lock()
            .get(intent_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("Payment intent"))
    }

    fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookEvent> {
        self.webhooks.parse(payload, signature, Utc::now())
    }
}
