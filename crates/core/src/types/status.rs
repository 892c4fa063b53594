//! Status enums for orders and support tickets.

use serde::{Deserialize, Serialize};

/// Local order status.
///
/// Orders discovered during reconciliation start as `Pending`; support staff
/// advance them from there. The smallint codes exist only for the
/// `order_status` lookup table - they are an implementation detail of the
/// schema, not part of the API, which always carries labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Numeric code used in the `order_record.status` column.
    #[must_use]
    pub const fn as_i16(self) -> i16 {
        match self {
            Self::Pending => 1,
            Self::Processing => 2,
            Self::Shipped => 3,
            Self::Completed => 4,
            Self::Cancelled => 5,
        }
    }

    /// Decode a status code from the database.
    ///
    /// Unknown codes map to `None`; callers fall back to an "Unknown" label
    /// rather than failing the whole order list.
    #[must_use]
    pub const fn from_i16(code: i16) -> Option<Self> {
        match code {
            1 => Some(Self::Pending),
            2 => Some(Self::Processing),
            3 => Some(Self::Shipped),
            4 => Some(Self::Completed),
            5 => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Human-readable label shown in the dashboard.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }
}

/// Support ticket status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    /// Database string form (`ticket.status` column).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }

    /// Parse the database string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "in_progress" => Some(Self::InProgress),
            "resolved" => Some(Self::Resolved),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// Kind of update a ticket note represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    /// Free-form message from either party.
    #[default]
    Comment,
    /// Note recording a status change.
    StatusChange,
}

impl NoteKind {
    /// Database string form (`ticket_note.kind` column).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::StatusChange => "status_change",
        }
    }

    /// Parse the database string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "comment" => Some(Self::Comment),
            "status_change" => Some(Self::StatusChange),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_code_roundtrip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::from_i16(status.as_i16()), Some(status));
        }
    }

    #[test]
    fn test_order_status_unknown_code() {
        assert_eq!(OrderStatus::from_i16(0), None);
        assert_eq!(OrderStatus::from_i16(99), None);
    }

    #[test]
    fn test_pending_is_code_one() {
        // Newly reconciled orders are inserted with this code.
        assert_eq!(OrderStatus::Pending.as_i16(), 1);
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_ticket_status_parse() {
        assert_eq!(TicketStatus::parse("open"), Some(TicketStatus::Open));
        assert_eq!(
            TicketStatus::parse("in_progress"),
            Some(TicketStatus::InProgress)
        );
        assert_eq!(TicketStatus::parse("bogus"), None);
    }
}
