//! Stripe API client.
//!
//! # Architecture
//!
//! - Hand-rolled REST client over `reqwest` (form-encoded requests, JSON
//!   responses), no SDK dependency
//! - Stripe is source of truth for charges and checkout sessions - local
//!   tables only carry support metadata on top
//! - Every response is decoded into a typed DTO in [`types`] at the
//!   boundary; nothing downstream touches raw JSON
//! - No retries: a failed call is terminal for the surrounding request
//!
//! # Example
//!
//! ```rust,ignore
//! use guardlan_storefront::stripe::StripeClient;
//!
//! let client = StripeClient::new(&config.stripe)?;
//!
//! // Classify a price
//! let price = client.retrieve_price(&PriceRef::new("price_A")).await?;
//! assert!(!price.is_recurring());
//!
//! // List a customer's charges
//! let charges = client.list_charges(&customer_ref, 20).await?;
//! ```

mod client;
pub mod types;
pub mod webhook;

pub use client::{CreateSessionRequest, SessionLineItemParams, SessionMode, StripeClient};
pub use types::*;
pub use webhook::{Event, WebhookError};

use thiserror::Error;

/// Errors that can occur when interacting with the Stripe API.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response body.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Client construction failed (bad header value).
    #[error("Client error: {0}")]
    Client(String),
}
