//! Typed DTOs for Stripe API responses.
//!
//! Only the fields this application reads are modelled; everything else in
//! the provider's payloads is ignored during deserialization.

use std::collections::HashMap;

use serde::Deserialize;

use guardlan_core::{ChargeRef, CustomerRef, MinorUnits, PriceRef, SessionRef};

/// Generic Stripe list envelope (`{"object": "list", "data": [...]}`).
#[derive(Debug, Deserialize)]
pub struct List<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

/// A completed payment attempt.
#[derive(Debug, Clone, Deserialize)]
pub struct Charge {
    pub id: ChargeRef,
    /// Amount in minor currency units.
    pub amount: MinorUnits,
    pub currency: String,
    pub status: String,
    /// Unix timestamp (seconds).
    pub created: i64,
    #[serde(default)]
    pub description: Option<String>,
    /// Originating payment intent, when the charge came through Checkout.
    #[serde(default)]
    pub payment_intent: Option<String>,
}

/// A price object; `recurring` is present only for subscription prices.
#[derive(Debug, Clone, Deserialize)]
pub struct Price {
    pub id: PriceRef,
    #[serde(rename = "type")]
    pub price_type: PriceType,
    #[serde(default)]
    pub recurring: Option<Recurring>,
    #[serde(default)]
    pub unit_amount: Option<MinorUnits>,
}

impl Price {
    /// Whether this price bills on a recurring schedule.
    #[must_use]
    pub const fn is_recurring(&self) -> bool {
        matches!(self.price_type, PriceType::Recurring)
    }
}

/// Billing type of a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceType {
    OneTime,
    Recurring,
}

/// Recurrence details of a subscription price.
#[derive(Debug, Clone, Deserialize)]
pub struct Recurring {
    pub interval: String,
}

/// A provider-side customer object.
#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub id: CustomerRef,
    #[serde(default)]
    pub email: Option<String>,
}

/// A hosted checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: SessionRef,
    /// Redirect URL; present while the session is open.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub customer: Option<CustomerRef>,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A line item attached to a checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionLineItem {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub price: Option<Price>,
}

/// Error envelope returned by the API on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

/// Error detail inside [`ApiErrorEnvelope`].
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_classification_from_json() {
        let one_time: Price = serde_json::from_str(
            r#"{"id": "price_A", "type": "one_time", "unit_amount": 7500}"#,
        )
        .expect("parse");
        assert!(!one_time.is_recurring());

        let recurring: Price = serde_json::from_str(
            r#"{"id": "price_sub", "type": "recurring", "recurring": {"interval": "month"}}"#,
        )
        .expect("parse");
        assert!(recurring.is_recurring());
        assert_eq!(recurring.recurring.expect("recurring").interval, "month");
    }

    #[test]
    fn test_charge_ignores_unknown_fields() {
        let charge: Charge = serde_json::from_str(
            r#"{
                "id": "ch_1",
                "object": "charge",
                "amount": 7500,
                "currency": "gbp",
                "status": "succeeded",
                "created": 1700000000,
                "payment_intent": "pi_1",
                "balance_transaction": "txn_1",
                "billing_details": {"email": "a@b.com"}
            }"#,
        )
        .expect("parse");
        assert_eq!(charge.id.as_str(), "ch_1");
        assert_eq!(charge.amount.as_i64(), 7500);
        assert!(charge.description.is_none());
    }

    #[test]
    fn test_session_metadata_parsing() {
        let session: CheckoutSession = serde_json::from_str(
            r#"{
                "id": "cs_1",
                "customer": "cus_1",
                "metadata": {"app_user_id": "2c0f6f54-9436-4d07-9d2b-111111111111"}
            }"#,
        )
        .expect("parse");
        assert_eq!(
            session.metadata.get("app_user_id").map(String::as_str),
            Some("2c0f6f54-9436-4d07-9d2b-111111111111")
        );
        assert!(session.url.is_none());
    }

    #[test]
    fn test_error_envelope() {
        let envelope: ApiErrorEnvelope = serde_json::from_str(
            r#"{"error": {"type": "invalid_request_error", "message": "No such price"}}"#,
        )
        .expect("parse");
        assert_eq!(envelope.error.message.as_deref(), Some("No such price"));
    }
}
