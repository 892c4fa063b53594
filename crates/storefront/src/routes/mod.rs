//! HTTP route handlers.
//!
//! The storefront exposes a JSON API:
//! - `/auth/*` - register, login, logout
//! - `/api/checkout`, `/api/subscription` - hosted checkout sessions
//! - `/api/webhooks/stripe` - payment provider event delivery
//! - `/api/orders` - reconciled order history
//! - `/api/contact` - contact form relay
//! - `/api/tickets` - support tickets and notes
//! - `/health`, `/health/ready` - probes

pub mod auth;
pub mod checkout;
pub mod contact;
pub mod orders;
pub mod tickets;
pub mod webhooks;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::state::AppState;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(ready))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/api/checkout", post(checkout::create_checkout))
        .route("/api/subscription", post(checkout::create_subscription))
        .route("/api/webhooks/stripe", post(webhooks::stripe_webhook))
        .route("/api/orders", get(orders::list_orders))
        .route("/api/contact", post(contact::submit))
        .route("/api/tickets", get(tickets::list).post(tickets::create))
        .route(
            "/api/tickets/{id}/notes",
            get(tickets::list_notes).post(tickets::add_note),
        )
        .with_state(state)
}

/// Liveness probe.
async fn health() -> &'static str {
    "ok"
}

/// Readiness probe; checks database connectivity.
async fn ready(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").execute(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::error!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
