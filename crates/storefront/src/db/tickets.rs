//! Support ticket repository.
//!
//! Notes are append-only: there are insert and select paths here, and
//! deliberately no update or delete.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use guardlan_core::{NoteKind, TicketId, TicketStatus, UserId};

use super::RepositoryError;
use crate::models::ticket::{Ticket, TicketNote};

#[derive(Debug, sqlx::FromRow)]
struct TicketRow {
    id: TicketId,
    ticket_no: String,
    short_desc: String,
    status: String,
    owner_id: UserId,
    assigned_engineer: Option<UserId>,
    created_at: DateTime<Utc>,
}

impl TicketRow {
    fn into_ticket(self) -> Result<Ticket, RepositoryError> {
        let status = TicketStatus::parse(&self.status).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("unknown ticket status: {}", self.status))
        })?;

        Ok(Ticket {
            id: self.id,
            ticket_no: self.ticket_no,
            short_desc: self.short_desc,
            status,
            owner: self.owner_id,
            assigned_engineer: self.assigned_engineer,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct NoteRow {
    id: guardlan_core::TicketNoteId,
    ticket_id: TicketId,
    author_id: UserId,
    body: String,
    kind: String,
    created_at: DateTime<Utc>,
}

impl NoteRow {
    fn into_note(self) -> Result<TicketNote, RepositoryError> {
        let kind = NoteKind::parse(&self.kind).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("unknown note kind: {}", self.kind))
        })?;

        Ok(TicketNote {
            id: self.id,
            ticket_id: self.ticket_id,
            author: self.author_id,
            body: self.body,
            kind,
            created_at: self.created_at,
        })
    }
}

const TICKET_COLUMNS: &str =
    "id, ticket_no, short_desc, status, owner_id, assigned_engineer, created_at";

const NOTE_COLUMNS: &str = "id, ticket_id, author_id, body, kind, created_at";

/// Repository for support tickets and their notes.
pub struct TicketRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TicketRepository<'a> {
    /// Create a new ticket repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a customer's tickets, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` on an unknown status value.
    pub async fn list_for_owner(&self, owner: UserId) -> Result<Vec<Ticket>, RepositoryError> {
        let rows: Vec<TicketRow> = sqlx::query_as(&format!(
            "SELECT {TICKET_COLUMNS} FROM ticket WHERE owner_id = $1 ORDER BY created_at DESC"
        ))
        .bind(owner)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TicketRow::into_ticket).collect()
    }

    /// Get a single ticket.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: TicketId) -> Result<Option<Ticket>, RepositoryError> {
        let row: Option<TicketRow> =
            sqlx::query_as(&format!("SELECT {TICKET_COLUMNS} FROM ticket WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        row.map(TicketRow::into_ticket).transpose()
    }

    /// Create a ticket for a customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        owner: UserId,
        ticket_no: &str,
        short_desc: &str,
    ) -> Result<Ticket, RepositoryError> {
        let row: TicketRow = sqlx::query_as(&format!(
            "INSERT INTO ticket (ticket_no, short_desc, status, owner_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {TICKET_COLUMNS}"
        ))
        .bind(ticket_no)
        .bind(short_desc)
        .bind(TicketStatus::Open.as_str())
        .bind(owner)
        .fetch_one(self.pool)
        .await?;

        row.into_ticket()
    }

    /// List a ticket's notes in creation order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn notes(&self, ticket: TicketId) -> Result<Vec<TicketNote>, RepositoryError> {
        let rows: Vec<NoteRow> = sqlx::query_as(&format!(
            "SELECT {NOTE_COLUMNS} FROM ticket_note WHERE ticket_id = $1 ORDER BY created_at, id"
        ))
        .bind(ticket)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(NoteRow::into_note).collect()
    }

    /// Append a note to a ticket.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn append_note(
        &self,
        ticket: TicketId,
        author: UserId,
        body: &str,
        kind: NoteKind,
    ) -> Result<TicketNote, RepositoryError> {
        let row: NoteRow = sqlx::query_as(&format!(
            "INSERT INTO ticket_note (ticket_id, author_id, body, kind)
             VALUES ($1, $2, $3, $4)
             RETURNING {NOTE_COLUMNS}"
        ))
        .bind(ticket)
        .bind(author)
        .bind(body)
        .bind(kind.as_str())
        .fetch_one(self.pool)
        .await?;

        row.into_note()
    }
}
