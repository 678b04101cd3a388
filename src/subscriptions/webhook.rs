// Stripe webhook signature verification and event decoding
// Author: kelexine (https://github.com/kelexine)

use crate::error::{AppError, Result};
use ring::hmac;
use serde::Deserialize;

/// Parsed `stripe-signature` header: `t=<unix>,v1=<hex>[,v1=<hex>...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                continue;
            };
            match key {
                "t" => {
                    timestamp = Some(value.parse::<i64>().map_err(|_| {
                        AppError::WebhookSignature("invalid timestamp".to_string())
                    })?)
                }
                // Unknown schemes (v0 test signatures) are ignored.
                "v1" => {
                    if let Ok(bytes) = hex::decode(value) {
                        signatures.push(bytes);
                    }
                }
                _ => {}
            }
        }

        let timestamp = timestamp
            .ok_or_else(|| AppError::WebhookSignature("missing timestamp".to_string()))?;
        if signatures.is_empty() {
            return Err(AppError::WebhookSignature(
                "no v1 signatures found".to_string(),
            ));
        }
        Ok(Self {
            timestamp,
            signatures,
        })
    }
}

/// Check `header` against HMAC-SHA256(`secret`, `"<t>.<payload>"`) and the
/// timestamp tolerance around `now`.
pub fn verify(payload: &[u8], header: &str, secret: &str, tolerance_secs: i64, now: i64) -> Result<()> {
    let parsed = SignatureHeader::parse(header)?;

    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    let signed = signed_payload(parsed.timestamp, payload);
    let matched = parsed
        .signatures
        .iter()
        .any(|sig| hmac::verify(&key, &signed, sig).is_ok());
    if !matched {
        return Err(AppError::WebhookSignature(
            "no signatures found matching the expected signature for payload".to_string(),
        ));
    }

    if tolerance_secs > 0 && parsed.timestamp < now - tolerance_secs {
        return Err(AppError::WebhookSignature(
            "timestamp outside the tolerance zone".to_string(),
        ));
    }
    Ok(())
}

/// A `stripe-signature` header value for `payload`, as Stripe would send it.
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    let tag = hmac::sign(&key, &signed_payload(timestamp, payload));
    format!("t={},v1={}", timestamp, hex::encode(tag.as_ref()))
}

fn signed_payload(timestamp: i64, payload: &[u8]) -> Vec<u8> {
    let mut signed = format!("{}.", timestamp).into_bytes();
    signed.extend_from_slice(payload);
    signed
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
    #[serde(default)]
    pub created: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// Event types the service reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    CheckoutSessionCompleted,
    SubscriptionUpdated,
    SubscriptionDeleted,
    InvoicePaymentSucceeded,
    InvoicePaymentFailed,
    Unhandled,
}

impl WebhookEvent {
    pub fn kind(&self) -> EventKind {
        match self.event_type.as_str() {
            "checkout.session.completed" => EventKind::CheckoutSessionCompleted,
            "customer.subscription.updated" => EventKind::SubscriptionUpdated,
            "customer.subscription.deleted" => EventKind::SubscriptionDeleted,
            "invoice.payment_succeeded" => EventKind::InvoicePaymentSucceeded,
            "invoice.payment_failed" => EventKind::InvoicePaymentFailed,
            _ => EventKind::Unhandled,
        }
    }

    /// String field of the event object, if present.
    pub fn object_str(&self, field: &str) -> Option<&str> {
        self.data.object.get(field).and_then(|v| v.as_str())
    }

    /// Amount field in cents converted to major units.
    pub fn object_amount(&self, field: &str) -> f64 {
        self.data
            .object
            .get(field)
            .and_then(|v| v.as_i64())
            .unwrap_or(0) as f64
            / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const PAYLOAD: &[u8] = br#"{"id":"evt_1","type":"invoice.payment_failed","data":{"object":{"amount_due":1999}}}"#;

    #[test]
    fn test_signed_payload_verifies() {
        let header = sign(PAYLOAD, SECRET, 1_731_672_000);
        assert!(verify(PAYLOAD, &header, SECRET, 300, 1_731_672_100).is_ok());
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let header = sign(PAYLOAD, SECRET, 1_731_672_000);
        let err = verify(b"{}", &header, SECRET, 300, 1_731_672_000).unwrap_err();
        assert!(matches!(err, AppError::WebhookSignature(_)));
        assert!(verify(PAYLOAD, &header, "whsec_other", 300, 1_731_672_000).is_err());
    }

    #[test]
    fn test_stale_timestamp_is_rejected() {
        let header = sign(PAYLOAD, SECRET, 1_731_672_000);
        assert!(verify(PAYLOAD, &header, SECRET, 300, 1_731_672_301).is_err());
    }

    #[test]
    fn test_header_parsing() {
        let parsed = SignatureHeader::parse("t=12,v0=zz,v1=0a0b,v1=ff").unwrap();
        assert_eq!(parsed.timestamp, 12);
        assert_eq!(parsed.signatures, vec![vec![0x0a, 0x0b], vec![0xff]]);

        assert!(SignatureHeader::parse("v1=0a0b").is_err());
        assert!(SignatureHeader::parse("t=12").is_err());
        assert!(SignatureHeader::parse("garbage").is_err());
    }

    #[test]
    fn test_event_kind_and_amounts() {
        let event: WebhookEvent = serde_json::from_slice(PAYLOAD).unwrap();
        assert_eq!(event.kind(), EventKind::InvoicePaymentFailed);
        assert_eq!(event.object_amount("amount_due"), 19.99);
        assert_eq!(event.object_str("subscription"), None);
    }
}
