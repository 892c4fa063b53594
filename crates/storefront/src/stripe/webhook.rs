//! Webhook event verification and parsing.
//!
//! Stripe signs each delivery with a `Stripe-Signature` header of the form
//! `t=<unix seconds>,v1=<hex hmac>`. The signed payload is
//! `"{timestamp}.{raw body}"`, keyed with the endpoint's shared secret.
//! Verification failure must drop the request without touching any state.

use std::collections::HashMap;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use guardlan_core::{CustomerRef, UserId};

use super::client::METADATA_USER_KEY;

type HmacSha256 = Hmac<Sha256>;

/// Accepted clock skew between the signature timestamp and now (seconds).
const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

/// Event type that triggers identity linking.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Errors produced while verifying or parsing a webhook delivery.
///
/// All variants map to a 400 response; none of them carry provider payload
/// contents.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature header missing or not in `t=…,v1=…` form.
    #[error("malformed signature header")]
    MalformedHeader,
    /// Signature timestamp outside the accepted tolerance.
    #[error("signature timestamp outside tolerance")]
    TimestampOutOfRange,
    /// Computed HMAC does not match the header's `v1` value.
    #[error("signature mismatch")]
    SignatureMismatch,
    /// Payload is not a valid event document.
    #[error("invalid event payload: {0}")]
    InvalidPayload(String),
}

/// A verified webhook event.
#[derive(Debug, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

/// Payload wrapper inside an event.
#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// The fields of a completed checkout session that identity linking needs.
#[derive(Debug, Deserialize)]
pub struct CompletedSession {
    #[serde(default)]
    pub customer: Option<CustomerRef>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CompletedSession {
    /// The application user ID echoed back from session metadata, if present
    /// and well-formed.
    #[must_use]
    pub fn app_user_id(&self) -> Option<UserId> {
        self.metadata
            .get(METADATA_USER_KEY)
            .and_then(|raw| UserId::parse(raw).ok())
    }
}

/// Verify a delivery's signature and parse the event.
///
/// `now` is the current unix time in seconds; passed in rather than read
/// from the clock so the tolerance check is testable.
///
/// # Errors
///
/// Returns `WebhookError` if the header is malformed, the timestamp is
/// stale, the HMAC does not match, or the payload is not a valid event.
pub fn verify_and_parse(
    payload: &str,
    signature_header: &str,
    secret: &str,
    now: i64,
) -> Result<Event, WebhookError> {
    verify_signature(payload, signature_header, secret, now)?;

    serde_json::from_str(payload).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
}

/// Check the `t=…,v1=…` signature header against the payload.
fn verify_signature(
    payload: &str,
    signature_header: &str,
    secret: &str,
    now: i64,
) -> Result<(), WebhookError> {
    let mut timestamp: Option<i64> = None;
    let mut v1_signature: Option<&str> = None;

    for part in signature_header.split(',') {
        let mut kv = part.splitn(2, '=');
        match (kv.next(), kv.next()) {
            (Some("t"), Some(value)) => timestamp = value.parse().ok(),
            (Some("v1"), Some(value)) => v1_signature = Some(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::MalformedHeader)?;
    let v1_signature = v1_signature.ok_or(WebhookError::MalformedHeader)?;

    if (now - timestamp).abs() > TIMESTAMP_TOLERANCE_SECS {
        return Err(WebhookError::TimestampOutOfRange);
    }

    // The secret's "whsec_" prefix is not part of the key material.
    let secret_key = secret.strip_prefix("whsec_").unwrap_or(secret);
    let signed_payload = format!("{timestamp}.{payload}");

    let claimed = hex::decode(v1_signature).map_err(|_| WebhookError::SignatureMismatch)?;

    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .map_err(|_| WebhookError::MalformedHeader)?;
    mac.update(signed_payload.as_bytes());

    // Constant-time comparison; a plain byte/string equality would leak
    // match length through timing on an unauthenticated endpoint.
    mac.verify_slice(&claimed)
        .map_err(|_| WebhookError::SignatureMismatch)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_signing_key";

    /// Sign a payload the way the provider does.
    fn sign(payload: &str, timestamp: i64) -> String {
        let key = SECRET.strip_prefix("whsec_").expect("prefixed");
        let mut mac = HmacSha256::new_from_slice(key.as_bytes()).expect("key");
        mac.update(format!("{timestamp}.{payload}").as_bytes());
        let sig = hex::encode(mac.finalize().into_bytes());
        format!("t={timestamp},v1={sig}")
    }

    fn completed_event_payload() -> String {
        serde_json::json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {
                "object": {
                    "id": "cs_1",
                    "customer": "cus_1",
                    "metadata": {"app_user_id": "2c0f6f54-9436-4d07-9d2b-111111111111"}
                }
            }
        })
        .to_string()
    }

    #[test]
    fn test_valid_signature_parses_event() {
        let payload = completed_event_payload();
        let now = 1_700_000_000;
        let header = sign(&payload, now);

        let event = verify_and_parse(&payload, &header, SECRET, now).expect("verified");
        assert_eq!(event.event_type, CHECKOUT_SESSION_COMPLETED);

        let session: CompletedSession =
            serde_json::from_value(event.data.object).expect("session");
        assert_eq!(session.customer.as_ref().expect("customer").as_str(), "cus_1");
        assert!(session.app_user_id().is_some());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let payload = completed_event_payload();
        let now = 1_700_000_000;
        let header = sign(&payload, now);

        let tampered = payload.replace("cus_1", "cus_2");
        assert!(matches!(
            verify_and_parse(&tampered, &header, SECRET, now),
            Err(WebhookError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let payload = completed_event_payload();
        let now = 1_700_000_000;
        let header = sign(&payload, now);

        assert!(matches!(
            verify_and_parse(&payload, &header, "whsec_other_key", now),
            Err(WebhookError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let payload = completed_event_payload();
        let signed_at = 1_700_000_000;
        let header = sign(&payload, signed_at);

        let now = signed_at + TIMESTAMP_TOLERANCE_SECS + 1;
        assert!(matches!(
            verify_and_parse(&payload, &header, SECRET, now),
            Err(WebhookError::TimestampOutOfRange)
        ));
    }

    #[test]
    fn test_non_hex_signature_rejected() {
        let payload = completed_event_payload();
        let now = 1_700_000_000;

        // Values that never hex-decode to a digest must fail closed as a
        // mismatch, not reach the comparison with garbage bytes.
        for sig in ["zzzz", "abc", ""] {
            let header = format!("t={now},v1={sig}");
            assert!(matches!(
                verify_and_parse(&payload, &header, SECRET, now),
                Err(WebhookError::SignatureMismatch)
            ));
        }
    }

    #[test]
    fn test_truncated_signature_rejected() {
        let payload = completed_event_payload();
        let now = 1_700_000_000;
        let header = sign(&payload, now);

        // Drop the last two hex chars: still valid hex, wrong length.
        let truncated = &header[..header.len() - 2];
        assert!(matches!(
            verify_and_parse(&payload, truncated, SECRET, now),
            Err(WebhookError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_malformed_header_rejected() {
        let payload = completed_event_payload();
        let now = 1_700_000_000;

        for header in ["", "v1=abc", "t=123", "garbage"] {
            assert!(matches!(
                verify_and_parse(&payload, header, SECRET, now),
                Err(WebhookError::MalformedHeader)
            ));
        }
    }

    #[test]
    fn test_missing_user_metadata_yields_none() {
        let session: CompletedSession = serde_json::from_str(
            r#"{"id": "cs_1", "customer": "cus_1", "metadata": {}}"#,
        )
        .expect("parse");
        assert!(session.app_user_id().is_none());
    }

    #[test]
    fn test_malformed_user_metadata_yields_none() {
        let session: CompletedSession = serde_json::from_str(
            r#"{"customer": "cus_1", "metadata": {"app_user_id": "not-a-uuid"}}"#,
        )
        .expect("parse");
        assert!(session.app_user_id().is_none());
    }
}
