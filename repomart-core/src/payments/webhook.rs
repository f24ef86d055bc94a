//! Signed webhook deliveries.
//!
//! Signature header format: `t=<unix seconds>,v1=<hex>[,v1=<hex>...]` where
//! each `v1` is HMAC-SHA-256 over `"<t>.<raw body>"` keyed with the endpoint
//! secret.

use chrono::{DateTime, Duration, Utc};
use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use zeroize::Zeroizing;

use super::PaymentIntent;
use crate::error::{CoreError, Result};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventKind {
    PaymentSucceeded,
    PaymentFailed,
    PaymentCanceled,
    Other(String),
}

impl WebhookEventKind {
    fn parse(raw: &str) -> Self {
        match raw {
            "payment_intent.succeeded" => WebhookEventKind::PaymentSucceeded,
            "payment_intent.payment_failed" => WebhookEventKind::PaymentFailed,
            "payment_intent.canceled" => WebhookEventKind::PaymentCanceled,
            other => WebhookEventKind::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    pub id: String,
    pub kind: WebhookEventKind,
    /// Present for `payment_intent.*` events.
    pub intent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Zeroizing<Vec<u8>>,
    tolerance: Duration,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("tolerance", &self.tolerance)
            .finish_non_exhaustive()
    }
}

impl WebhookVerifier {
    pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: Zeroizing::new(secret.as_ref().to_vec()),
            tolerance: Duration::seconds(Self::DEFAULT_TOLERANCE_SECS),
        }
    }

    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Build a signature header for `payload` at `timestamp`.
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> String {
        format!("t={timestamp},v1={}", self.digest(payload, timestamp))
    }

    pub fn verify(
        &self,
        payload: &[u8],
        header: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut timestamp: Option<i64> = None;
        let mut signatures = Vec::new();
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = value.parse().ok(),
                Some(("v1", value)) => signatures.push(value.to_string()),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            CoreError::Unauthorized("webhook signature missing timestamp".into())
        })?;
        if signatures.is_empty() {
            return Err(CoreError::Unauthorized(
                "webhook signature missing v1 digest".into(),
            ));
        }

        let age = now.timestamp().abs_diff(timestamp);
        if age > self.tolerance.num_seconds().unsigned_abs() {
            return Err(CoreError::Unauthorized(
                "webhook timestamp outside tolerance".into(),
            ));
        }

        let expected = self.digest(payload, timestamp);
        let matched = signatures
            .iter()
            .any(|candidate| constant_time_eq(candidate.as_bytes(), expected.as_bytes()));
        if !matched {
            return Err(CoreError::Unauthorized(
                "webhook signature mismatch".into(),
            ));
        }
        Ok(())
    }

    /// Verify, then decode the event envelope.
    pub fn parse(
        &self,
        payload: &[u8],
        header: &str,
        now: DateTime<Utc>,
    ) -> Result<WebhookEvent> {
        self.verify(payload, header, now)?;
        decode_event(payload)
    }

    fn digest(&self, payload: &[u8], timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC-SHA-256 accepts keys of any size");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }
}

fn decode_event(payload: &[u8]) -> Result<WebhookEvent> {
    let raw: RawEvent = serde_json::from_slice(payload).map_err(|err| {
        CoreError::validation(format!("malformed webhook payload: {err}"))
    })?;
    let kind = WebhookEventKind::parse(&raw.kind);
    let intent_id = if raw.kind.starts_with("payment_intent.") {
        raw.data
            .object
            .get("id")
            .and_then(|id| id.as_str())
            .map(str::to_string)
    } else {
        None
    };
    Ok(WebhookEvent {
        id: raw.id,
        kind,
        intent_id,
    })
}

/// Serialize a provider-style event envelope. Used by the manual gateway to
/// emit deliveries identical in shape to the real provider.
pub fn encode_event(id: &str, kind: &str, intent: &PaymentIntent) -> Result<Vec<u8>> {
    let body = serde_json::json!({
        "id": id,
        "type": kind,
        "data": { "object": intent },
    });
    Ok(serde_json::to_vec(&body)?)
}
