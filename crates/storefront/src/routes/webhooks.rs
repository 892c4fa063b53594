//! Payment provider webhook endpoint.
//!
//! Signature verification happens against the raw request body, before any
//! JSON parsing. Unknown event types are acknowledged without action so the
//! provider does not retry them.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{Json, extract::State, http::HeaderMap};
use secrecy::ExposeSecret;
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::services::identity::link_customer;
use crate::state::AppState;
use crate::stripe::webhook::{CHECKOUT_SESSION_COMPLETED, CompletedSession, verify_and_parse};

/// POST /api/webhooks/stripe
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing Stripe-Signature header".to_owned()))?;

    let now = unix_now()?;
    let secret = state.config().stripe.webhook_secret.expose_secret();
    let event = verify_and_parse(&body, signature, secret, now)?;

    if event.event_type != CHECKOUT_SESSION_COMPLETED {
        tracing::debug!(event_id = %event.id, event_type = %event.event_type, "Ignoring event");
        return Ok(Json(json!({"received": true})));
    }

    let session: CompletedSession = serde_json::from_value(event.data.object)
        .map_err(|e| AppError::BadRequest(format!("Malformed session object: {e}")))?;

    let customer = session
        .customer
        .clone()
        .ok_or_else(|| AppError::BadRequest("Session has no customer".to_owned()))?;
    let user_id = session
        .app_user_id()
        .ok_or_else(|| AppError::BadRequest("Session has no usable user metadata".to_owned()))?;

    let customers = crate::db::CustomerRepository::new(state.pool());
    let outcome = link_customer(&customers, user_id, &customer).await?;
    tracing::info!(
        event_id = %event.id,
        user_id = %user_id,
        outcome = ?outcome,
        "Processed checkout completion"
    );

    Ok(Json(json!({"received": true})))
}

fn unix_now() -> Result<i64> {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(format!("system clock before epoch: {e}")))?
        .as_secs();
    i64::try_from(secs).map_err(|e| AppError::Internal(format!("clock overflow: {e}")))
}
