//! REST client for the Stripe API.
//!
//! Requests are form-encoded per Stripe convention; responses are decoded
//! into the DTOs in [`super::types`].

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;

use guardlan_core::{CustomerRef, Email, PriceRef, SessionRef, UserId};

use super::types::{ApiErrorEnvelope, Charge, CheckoutSession, Customer, List, Price, SessionLineItem};
use super::StripeError;
use crate::config::StripeConfig;

/// Stripe API base URL.
const BASE_URL: &str = "https://api.stripe.com/v1";

/// Metadata key carrying the application user ID through checkout sessions.
///
/// The identity-linking webhook reads this back out of
/// `checkout.session.completed` events.
pub const METADATA_USER_KEY: &str = "app_user_id";

/// Checkout session mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// One-time payment.
    Payment,
    /// Recurring subscription.
    Subscription,
}

impl SessionMode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Subscription => "subscription",
        }
    }
}

/// A (price, quantity) pair for session creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLineItemParams {
    pub price: PriceRef,
    pub quantity: u32,
}

/// Parameters for creating a checkout session.
#[derive(Debug, Clone)]
pub struct CreateSessionRequest {
    pub mode: SessionMode,
    pub line_items: Vec<SessionLineItemParams>,
    /// Attach the session to an existing provider customer.
    pub customer: Option<CustomerRef>,
    pub success_url: String,
    pub cancel_url: String,
    /// Echoed back in the completion webhook as `metadata[app_user_id]`.
    pub metadata_user: Option<UserId>,
}

impl CreateSessionRequest {
    /// Encode as the form body Stripe expects.
    fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("mode".to_owned(), self.mode.as_str().to_owned()),
            ("payment_method_types[0]".to_owned(), "card".to_owned()),
            ("success_url".to_owned(), self.success_url.clone()),
            ("cancel_url".to_owned(), self.cancel_url.clone()),
        ];

        for (i, item) in self.line_items.iter().enumerate() {
            form.push((format!("line_items[{i}][price]"), item.price.as_str().to_owned()));
            form.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
        }

        if let Some(customer) = &self.customer {
            form.push(("customer".to_owned(), customer.as_str().to_owned()));
        }

        if let Some(user_id) = self.metadata_user {
            form.push((
                format!("metadata[{METADATA_USER_KEY}]"),
                user_id.to_string(),
            ));
        }

        form
    }
}

/// Stripe API client.
///
/// Constructed once at process start and shared via `AppState`; cheap to
/// clone (the inner `reqwest::Client` is reference-counted).
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
}

impl StripeClient {
    /// Create a new Stripe API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build or the API key is not
    /// a valid header value.
    pub fn new(config: &StripeConfig) -> Result<Self, StripeError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        let mut auth_header = HeaderValue::from_str(&auth_value)
            .map_err(|e| StripeError::Client(format!("invalid API key format: {e}")))?;
        auth_header.set_sensitive(true);
        headers.insert("Authorization", auth_header);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }

    /// Retrieve a price by reference.
    ///
    /// Used by checkout to classify one-time vs recurring items. An unknown
    /// price surfaces as an `Api` error with the provider's 404.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the price does not exist.
    pub async fn retrieve_price(&self, price: &PriceRef) -> Result<Price, StripeError> {
        let url = format!("{BASE_URL}/prices/{}", price.as_str());
        let response = self.client.get(&url).send().await?;
        decode(response).await
    }

    /// Create a provider customer record linked to an application user.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn create_customer(
        &self,
        email: &Email,
        display_name: &str,
        user_id: UserId,
    ) -> Result<Customer, StripeError> {
        let form = vec![
            ("email".to_owned(), email.as_str().to_owned()),
            ("name".to_owned(), display_name.to_owned()),
            (
                format!("metadata[{METADATA_USER_KEY}]"),
                user_id.to_string(),
            ),
        ];

        let response = self
            .client
            .post(format!("{BASE_URL}/customers"))
            .form(&form)
            .send()
            .await?;
        decode(response).await
    }

    /// Create a hosted checkout session and return it (with redirect URL).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the provider rejects the
    /// parameters.
    pub async fn create_checkout_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<CheckoutSession, StripeError> {
        let response = self
            .client
            .post(format!("{BASE_URL}/checkout/sessions"))
            .form(&request.to_form())
            .send()
            .await?;
        decode(response).await
    }

    /// List recent charges for a customer, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn list_charges(
        &self,
        customer: &CustomerRef,
        limit: u8,
    ) -> Result<Vec<Charge>, StripeError> {
        let response = self
            .client
            .get(format!("{BASE_URL}/charges"))
            .query(&[("customer", customer.as_str()), ("limit", &limit.to_string())])
            .send()
            .await?;
        let list: List<Charge> = decode(response).await?;
        Ok(list.data)
    }

    /// Find the checkout session that produced a payment intent, if any.
    ///
    /// There is usually exactly one session per payment intent, so only the
    /// first match is returned.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn find_session_by_payment_intent(
        &self,
        payment_intent: &str,
    ) -> Result<Option<CheckoutSession>, StripeError> {
        let response = self
            .client
            .get(format!("{BASE_URL}/checkout/sessions"))
            .query(&[("payment_intent", payment_intent), ("limit", "1")])
            .send()
            .await?;
        let list: List<CheckoutSession> = decode(response).await?;
        Ok(list.data.into_iter().next())
    }

    /// List the line items of a checkout session.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn list_session_line_items(
        &self,
        session: &SessionRef,
    ) -> Result<Vec<SessionLineItem>, StripeError> {
        let response = self
            .client
            .get(format!(
                "{BASE_URL}/checkout/sessions/{}/line_items",
                session.as_str()
            ))
            .send()
            .await?;
        let list: List<SessionLineItem> = decode(response).await?;
        Ok(list.data)
    }
}

/// Decode a response body, mapping non-2xx statuses to `StripeError::Api`.
async fn decode<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, StripeError> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
            .ok()
            .and_then(|envelope| envelope.error.message)
            .unwrap_or_else(|| body.chars().take(200).collect());
        return Err(StripeError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| StripeError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form_value<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_payment_session_form_encoding() {
        let request = CreateSessionRequest {
            mode: SessionMode::Payment,
            line_items: vec![SessionLineItemParams {
                price: PriceRef::new("price_A"),
                quantity: 2,
            }],
            customer: Some(CustomerRef::new("cus_1")),
            success_url: "https://shop.test/success?hasSubscription=false".to_owned(),
            cancel_url: "https://shop.test/shop".to_owned(),
            metadata_user: None,
        };

        let form = request.to_form();
        assert_eq!(form_value(&form, "mode"), Some("payment"));
        assert_eq!(form_value(&form, "line_items[0][price]"), Some("price_A"));
        assert_eq!(form_value(&form, "line_items[0][quantity]"), Some("2"));
        assert_eq!(form_value(&form, "customer"), Some("cus_1"));
        assert_eq!(form_value(&form, "payment_method_types[0]"), Some("card"));
    }

    #[test]
    fn test_subscription_session_form_encoding() {
        let request = CreateSessionRequest {
            mode: SessionMode::Subscription,
            line_items: vec![SessionLineItemParams {
                price: PriceRef::new("price_sub"),
                quantity: 1,
            }],
            customer: None,
            success_url: "https://shop.test/success".to_owned(),
            cancel_url: "https://shop.test/cancel".to_owned(),
            metadata_user: None,
        };

        let form = request.to_form();
        assert_eq!(form_value(&form, "mode"), Some("subscription"));
        assert_eq!(form_value(&form, "line_items[0][price]"), Some("price_sub"));
        assert!(form_value(&form, "customer").is_none());
    }

    #[test]
    fn test_metadata_user_key_in_form() {
        let user_id = UserId::generate();
        let request = CreateSessionRequest {
            mode: SessionMode::Payment,
            line_items: vec![],
            customer: None,
            success_url: "https://shop.test/success".to_owned(),
            cancel_url: "https://shop.test/cancel".to_owned(),
            metadata_user: Some(user_id),
        };

        let form = request.to_form();
        assert_eq!(
            form_value(&form, "metadata[app_user_id]"),
            Some(user_id.to_string().as_str())
        );
    }

    #[test]
    fn test_multiple_line_items_indexed() {
        let request = CreateSessionRequest {
            mode: SessionMode::Payment,
            line_items: vec![
                SessionLineItemParams {
                    price: PriceRef::new("price_A"),
                    quantity: 1,
                },
                SessionLineItemParams {
                    price: PriceRef::new("price_B"),
                    quantity: 3,
                },
            ],
            customer: None,
            success_url: "https://shop.test/success".to_owned(),
            cancel_url: "https://shop.test/cancel".to_owned(),
            metadata_user: None,
        };

        let form = request.to_form();
        assert_eq!(form_value(&form, "line_items[1][price]"), Some("price_B"));
        assert_eq!(form_value(&form, "line_items[1][quantity]"), Some("3"));
    }
}
