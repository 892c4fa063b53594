//! Support ticket models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use guardlan_core::{NoteKind, TicketId, TicketNoteId, TicketStatus, UserId};

/// A support ticket.
#[derive(Debug, Clone, Serialize)]
pub struct Ticket {
    pub id: TicketId,
    /// Human-facing ticket number (e.g. `GL-483920`).
    pub ticket_no: String,
    pub short_desc: String,
    pub status: TicketStatus,
    #[serde(skip)]
    pub owner: UserId,
    /// Support engineer working the ticket, if assigned.
    pub assigned_engineer: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// A message on a ticket.
///
/// Notes are append-only and ordered by creation time; there is no edit or
/// delete path.
#[derive(Debug, Clone, Serialize)]
pub struct TicketNote {
    pub id: TicketNoteId,
    #[serde(skip)]
    pub ticket_id: TicketId,
    pub author: UserId,
    pub body: String,
    pub kind: NoteKind,
    pub created_at: DateTime<Utc>,
}
