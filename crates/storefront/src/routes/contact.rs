//! Contact form endpoint.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};

use guardlan_core::Email;

use crate::error::{AppError, Result};
use crate::state::AppState;

const MAX_MESSAGE_LENGTH: usize = 5000;

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub message: String,
}

/// POST /api/contact
///
/// Relays a contact-form message to the support inbox. Open to anonymous
/// visitors; the sender address is only used as the reply-to.
pub async fn submit(
    State(state): State<AppState>,
    Json(body): Json<ContactRequest>,
) -> Result<Json<Value>> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required".to_owned()));
    }

    let email = Email::parse(&body.email)
        .map_err(|e| AppError::BadRequest(format!("Invalid email: {e}")))?;

    let message = body.message.trim();
    if message.is_empty() {
        return Err(AppError::BadRequest("Message is required".to_owned()));
    }
    if message.len() > MAX_MESSAGE_LENGTH {
        return Err(AppError::BadRequest("Message is too long".to_owned()));
    }

    let mailer = state
        .mailer()
        .ok_or_else(|| AppError::Internal("mail relay not configured".to_owned()))?;

    mailer
        .send_contact_message(email.as_str(), name, message)
        .await?;

    Ok(Json(json!({"sent": true})))
}
