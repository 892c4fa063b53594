//! Mail relay client for transactional mail.
//!
//! Used by the contact form to deliver messages to the support inbox. The
//! relay is optional: without `MAIL_RELAY_API_KEY` the contact endpoint is
//! disabled rather than silently dropping mail.

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use thiserror::Error;

use crate::config::MailerConfig;

const BASE_URL: &str = "https://api.resend.com";

/// Mail relay error.
#[derive(Debug, Error)]
pub enum MailerError {
    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The relay rejected the request.
    #[error("Relay API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Client construction failure.
    #[error("Mailer client error: {0}")]
    Client(String),
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
    text: &'a str,
}

/// Mail relay API client.
///
/// Cheap to clone; the inner `reqwest::Client` is reference-counted.
#[derive(Clone)]
pub struct MailerClient {
    client: reqwest::Client,
    from: String,
    contact_to: String,
}

impl MailerClient {
    /// Create a new mail relay client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build or the API key is
    /// not a valid header value.
    pub fn new(config: &MailerConfig) -> Result<Self, MailerError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.api_key.expose_secret());
        let mut auth_header = HeaderValue::from_str(&auth_value)
            .map_err(|e| MailerError::Client(format!("invalid API key format: {e}")))?;
        auth_header.set_sensitive(true);
        headers.insert("Authorization", auth_header);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            from: config.from.clone(),
            contact_to: config.contact_to.clone(),
        })
    }

    /// Deliver a contact-form message to the support inbox.
    ///
    /// The sender's address goes in `reply_to` so support can answer
    /// directly; the `from` address stays our verified sending domain.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the relay rejects it.
    pub async fn send_contact_message(
        &self,
        sender_email: &str,
        sender_name: &str,
        message: &str,
    ) -> Result<(), MailerError> {
        let subject = format!("Contact form: {sender_name}");
        let body = SendRequest {
            from: &self.from,
            to: [self.contact_to.as_str()],
            subject: &subject,
            reply_to: Some(sender_email),
            text: message,
        };

        let response = self
            .client
            .post(format!("{BASE_URL}/emails"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MailerError::Api {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        tracing::info!(to = %self.contact_to, "Delivered contact message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_request_serialization() {
        let body = SendRequest {
            from: "GuardLAN <no-reply@guardlan.net>",
            to: ["support@guardlan.net"],
            subject: "Contact form: Jo",
            reply_to: Some("jo@example.com"),
            text: "My hub stopped filtering.",
        };

        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["to"][0], "support@guardlan.net");
        assert_eq!(json["reply_to"], "jo@example.com");
        assert_eq!(json["text"], "My hub stopped filtering.");
    }

    #[test]
    fn test_reply_to_omitted_when_absent() {
        let body = SendRequest {
            from: "a@b.c",
            to: ["d@e.f"],
            subject: "s",
            reply_to: None,
            text: "t",
        };
        let json = serde_json::to_value(&body).expect("serialize");
        assert!(json.get("reply_to").is_none());
    }
}
