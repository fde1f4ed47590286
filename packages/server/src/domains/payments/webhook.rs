//! Processor webhook parsing and signature verification.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use crate::common::OrderId;

/// Signed events older than this are rejected as replays.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum WebhookError {
    #[error("Invalid Stripe-Signature header")]
    MalformedHeader,

    #[error("Webhook signature mismatch")]
    SignatureMismatch,

    #[error("Webhook timestamp outside tolerance")]
    StaleTimestamp,

    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),
}

/// Verifies a `Stripe-Signature` header (`t=<unix>,v1=<hex hmac>`) over
/// `"{t}.{payload}"` with HMAC-SHA256.
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    now_unix: i64,
) -> Result<(), WebhookError> {
    let mut timestamp = "";
    let mut signatures = Vec::new();
    for part in sig_header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }
    if timestamp.is_empty() || signatures.is_empty() {
        return Err(WebhookError::MalformedHeader);
    }

    let mut signed = Vec::with_capacity(timestamp.len() + 1 + payload.len());
    signed.extend_from_slice(timestamp.as_bytes());
    signed.push(b'.');
    signed.extend_from_slice(payload);

    // Several v1 entries appear while a secret is being rolled
    let matched = signatures.iter().any(|candidate| {
        let Ok(expected) = hex::decode(candidate) else {
            return false;
        };
        let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(&signed);
        mac.verify_slice(&expected).is_ok()
    });
    if !matched {
        return Err(WebhookError::SignatureMismatch);
    }

    let ts: i64 = timestamp.parse().map_err(|_| WebhookError::MalformedHeader)?;
    if (now_unix - ts).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(WebhookError::StaleTimestamp);
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    data: RawData,
}

#[derive(Debug, Deserialize)]
struct RawData {
    object: RawIntent,
}

#[derive(Debug, Deserialize)]
struct RawIntent {
    id: String,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// The payment signals the order lifecycle reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    Succeeded { order_id: OrderId, reference: String },
    Failed { order_id: OrderId, reference: String },
    /// Anything else, or an intent without an order id in its metadata.
    Ignored { kind: String },
}

impl WebhookEvent {
    pub fn parse(payload: &[u8]) -> Result<Self, WebhookError> {
        let raw: RawEvent = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;

        let order_id = raw
            .data
            .object
            .metadata
            .as_ref()
            .and_then(|m| m.get("order_id"))
            .and_then(|v| v.as_str())
            .and_then(|s| OrderId::parse(s).ok());
        let reference = raw.data.object.id;

        Ok(match (raw.kind.as_str(), order_id) {
            ("payment_intent.succeeded", Some(order_id)) => Self::Succeeded {
                order_id,
                reference,
            },
            ("payment_intent.payment_failed" | "payment_intent.canceled", Some(order_id)) => {
                Self::Failed {
                    order_id,
                    reference,
                }
            }
            _ => Self::Ignored { kind: raw.kind },
        })
    }
}
