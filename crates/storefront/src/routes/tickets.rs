//! Support ticket endpoints.
//!
//! Tickets are scoped to their owner; requests for another customer's
//! ticket 404 rather than 403 so ticket IDs are not enumerable.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rand::Rng;
use serde::Deserialize;

use guardlan_core::{NoteKind, TicketId, UserId};

use crate::db::TicketRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Ticket, TicketNote};
use crate::state::AppState;

const MAX_DESC_LENGTH: usize = 200;
const MAX_NOTE_LENGTH: usize = 5000;

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub short_desc: String,
}

#[derive(Debug, Deserialize)]
pub struct AddNoteRequest {
    pub body: String,
}

/// GET /api/tickets
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Ticket>>> {
    let tickets = TicketRepository::new(state.pool());
    Ok(Json(tickets.list_for_owner(user.id).await?))
}

/// POST /api/tickets
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<CreateTicketRequest>,
) -> Result<(StatusCode, Json<Ticket>)> {
    let short_desc = body.short_desc.trim();
    if short_desc.is_empty() {
        return Err(AppError::BadRequest("Description is required".to_owned()));
    }
    if short_desc.len() > MAX_DESC_LENGTH {
        return Err(AppError::BadRequest("Description is too long".to_owned()));
    }

    let tickets = TicketRepository::new(state.pool());
    let ticket = tickets
        .create(user.id, &generate_ticket_no(), short_desc)
        .await?;

    tracing::info!(user_id = %user.id, ticket_no = %ticket.ticket_no, "Opened ticket");

    Ok((StatusCode::CREATED, Json(ticket)))
}

/// GET /api/tickets/{id}/notes
pub async fn list_notes(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Json<Vec<TicketNote>>> {
    let tickets = TicketRepository::new(state.pool());
    let ticket_id = TicketId::new(id);

    owned_ticket(&tickets, ticket_id, user.id).await?;
    Ok(Json(tickets.notes(ticket_id).await?))
}

/// POST /api/tickets/{id}/notes
pub async fn add_note(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
    Json(request): Json<AddNoteRequest>,
) -> Result<(StatusCode, Json<TicketNote>)> {
    let body = request.body.trim();
    if body.is_empty() {
        return Err(AppError::BadRequest("Note body is required".to_owned()));
    }
    if body.len() > MAX_NOTE_LENGTH {
        return Err(AppError::BadRequest("Note is too long".to_owned()));
    }

    let tickets = TicketRepository::new(state.pool());
    let ticket_id = TicketId::new(id);

    owned_ticket(&tickets, ticket_id, user.id).await?;
    let note = tickets
        .append_note(ticket_id, user.id, body, NoteKind::Comment)
        .await?;

    Ok((StatusCode::CREATED, Json(note)))
}

/// Load a ticket and confirm the caller owns it.
async fn owned_ticket(
    tickets: &TicketRepository<'_>,
    id: TicketId,
    owner: UserId,
) -> Result<Ticket> {
    let ticket = tickets
        .get(id)
        .await?
        .filter(|t| t.owner == owner)
        .ok_or_else(|| AppError::NotFound(format!("ticket {id}")))?;
    Ok(ticket)
}

/// Generate a customer-facing ticket number like `GL-493027`.
///
/// Uniqueness is enforced by the database; a collision surfaces as an
/// insert error, which at six random digits is rare enough to treat as a
/// transient failure.
fn generate_ticket_no() -> String {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("GL-{n:06}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_no_format() {
        for _ in 0..100 {
            let no = generate_ticket_no();
            let digits = no.strip_prefix("GL-").expect("prefix");
            assert_eq!(digits.len(), 6);
            assert!(digits.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
