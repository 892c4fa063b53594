//! Checkout and subscription endpoints.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::db::CustomerRepository;
use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::services::checkout::{CartItem, CheckoutOutcome, build_checkout_session, build_subscription_session};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CartItem>,
}

/// POST /api/checkout
///
/// Responds with either `{"url": …}` to redirect into hosted checkout, or
/// `{"redirectToSubscription": true}` when the cart held only recurring
/// items.
pub async fn create_checkout(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<CheckoutRequest>,
) -> Result<Json<Value>> {
    let customers = CustomerRepository::new(state.pool());
    let profile = customers
        .get_by_id(user.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("account no longer exists".to_owned()))?;

    let outcome = build_checkout_session(
        state.stripe(),
        &customers,
        &profile,
        &state.config().base_url,
        body.items,
    )
    .await?;

    match outcome {
        CheckoutOutcome::Redirect { url } => Ok(Json(json!({"url": url}))),
        CheckoutOutcome::SubscriptionOnly => Ok(Json(json!({"redirectToSubscription": true}))),
    }
}

/// POST /api/subscription
///
/// Starts a subscription-mode session for the configured recurring price.
/// Works for anonymous visitors too; the user ID rides along in metadata
/// only when a session exists.
pub async fn create_subscription(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<Value>> {
    let url = build_subscription_session(
        state.stripe(),
        &state.config().stripe.subscription_price,
        &state.config().base_url,
        user.map(|u| u.id),
    )
    .await?;

    Ok(Json(json!({"url": url})))
}
