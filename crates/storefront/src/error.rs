//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`. Responses carry a generic JSON `{"error": …}`
//! body; provider error bodies and stack traces never cross the HTTP
//! boundary.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::MailerError;
use crate::services::orders::OrderSyncError;
use crate::stripe::{StripeError, WebhookError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Stripe API operation failed.
    #[error("Stripe error: {0}")]
    Stripe(#[from] StripeError),

    /// Mail relay operation failed.
    #[error("Mailer error: {0}")]
    Mailer(#[from] MailerError),

    /// Order reconciliation failed.
    #[error("Order sync error: {0}")]
    OrderSync(#[from] OrderSyncError),

    /// Webhook signature or payload failed verification.
    #[error("Webhook rejected: {0}")]
    Webhook(#[from] WebhookError),

    /// Request failed validation (missing/invalid field).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Generic JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(
            self,
            Self::Database(_)
                | Self::Stripe(_)
                | Self::Mailer(_)
                | Self::OrderSync(_)
                | Self::Internal(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Database(_)
            | Self::Stripe(_)
            | Self::Mailer(_)
            | Self::OrderSync(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Webhook(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Stripe(_) => "Checkout failed".to_string(),
            Self::OrderSync(_) => "Failed to fetch or sync orders".to_string(),
            Self::Mailer(_) => "Something went wrong. Please try again.".to_string(),
            Self::Webhook(_) => "Invalid webhook signature".to_string(),
            Self::Unauthorized(_) => "Not signed in".to_string(),
            Self::BadRequest(msg) => msg.clone(),
            Self::NotFound(msg) => format!("Not found: {msg}"),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("ticket 42".to_string());
        assert_eq!(err.to_string(), "Not found: ticket 42");

        let err = AppError::BadRequest("Missing customer ID".to_string());
        assert_eq!(err.to_string(), "Bad request: Missing customer ID");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_webhook_errors_are_client_errors() {
        // Bad signatures must be rejected without a server error; the
        // provider retries on 5xx but not 4xx.
        assert_eq!(
            get_status(AppError::Webhook(WebhookError::SignatureMismatch)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Webhook(WebhookError::MalformedHeader)),
            StatusCode::BAD_REQUEST
        );
    }
}
