//! Customer profile model.

use chrono::{DateTime, Utc};

use guardlan_core::{CustomerRef, Email, UserId};

/// An application user's profile row.
///
/// `stripe_customer_id` is the durable link to the payment provider's
/// customer object. It starts out `None`, is set lazily on first checkout or
/// by the completion webhook, and is only ever overwritten when the incoming
/// value differs.
#[derive(Debug, Clone)]
pub struct CustomerProfile {
    pub id: UserId,
    pub email: Email,
    pub display_name: String,
    pub stripe_customer_id: Option<CustomerRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
