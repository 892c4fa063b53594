//! Order record repository.
//!
//! Local order rows exist only to hang support metadata (status, note) off
//! provider charges. Reconciliation inserts rows for charges it has not seen
//! before; support staff mutate status/note from there.

use sqlx::PgPool;

use guardlan_core::{ChargeRef, OrderStatus};

use super::RepositoryError;

/// A row from the `orders_with_status` enrichment view.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EnrichedOrder {
    pub stripe_charge_id: String,
    pub note: String,
    pub status_label: String,
}

/// Repository for local order records.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Return which of the given charge refs already have local records.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn existing_refs(
        &self,
        refs: &[ChargeRef],
    ) -> Result<Vec<ChargeRef>, RepositoryError> {
        if refs.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = refs.iter().map(|r| r.as_str().to_owned()).collect();
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT stripe_charge_id FROM order_record WHERE stripe_charge_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| ChargeRef::new(id)).collect())
    }

    /// Bulk-insert records for newly seen charges with the default status.
    ///
    /// `ON CONFLICT DO NOTHING` keeps the unique key authoritative even if
    /// two dashboard loads race on the same charge set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert_pending(&self, refs: &[ChargeRef]) -> Result<(), RepositoryError> {
        if refs.is_empty() {
            return Ok(());
        }

        let ids: Vec<String> = refs.iter().map(|r| r.as_str().to_owned()).collect();
        sqlx::query(
            "INSERT INTO order_record (stripe_charge_id, note, status)
             SELECT unnest($1::text[]), '', $2
             ON CONFLICT (stripe_charge_id) DO NOTHING",
        )
        .bind(&ids)
        .bind(OrderStatus::Pending.as_i16())
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Fetch enriched (status-labelled) records for the given charge refs.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_enriched(
        &self,
        refs: &[ChargeRef],
    ) -> Result<Vec<EnrichedOrder>, RepositoryError> {
        if refs.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = refs.iter().map(|r| r.as_str().to_owned()).collect();
        let rows: Vec<EnrichedOrder> = sqlx::query_as(
            "SELECT stripe_charge_id, note, status_label
             FROM orders_with_status
             WHERE stripe_charge_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}
