//! Database operations for storefront `PostgreSQL`.
//!
//! # Tables
//!
//! - `customer_profile` - Application users and their Stripe customer link
//! - `customer_password` - Password hashes (separate from profile rows)
//! - `order_record` - Local order metadata keyed by Stripe charge ID
//! - `order_status` - Status code → label lookup
//! - `orders_with_status` - View joining the two above
//! - `ticket` / `ticket_note` - Support tickets and append-only notes
//! - `tower_sessions.session` - Session storage (tower-sessions)
//!
//! Stripe is source of truth for charges and checkout sessions; the local
//! tables only carry support metadata layered on top.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p guardlan-cli -- migrate
//! ```

pub mod customers;
pub mod orders;
pub mod tickets;

pub use customers::CustomerRepository;
pub use orders::{EnrichedOrder, OrderRepository};
pub use tickets::TicketRepository;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

/// Errors produced by repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Uniqueness violation (e.g. duplicate email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored value failed domain validation on the way out.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
