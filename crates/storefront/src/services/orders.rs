//! Order reconciliation against the payment provider.
//!
//! The provider's charge list is the source of truth for what was bought;
//! local `order_record` rows exist only to attach fulfilment status and
//! support notes to those charges. Each dashboard load re-reads the charges,
//! inserts records for any charge seen for the first time, and merges the
//! two sides into the view the customer sees.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use guardlan_core::ChargeRef;

use crate::db::{EnrichedOrder, OrderRepository, RepositoryError};
use crate::stripe::{Charge, SessionLineItem, StripeClient, StripeError};

/// Charges fetched per reconciliation pass. Newest first; older charges
/// simply never gain local records until they reappear in the window.
const CHARGE_PAGE_LIMIT: u8 = 50;

/// Failure during order fetch or reconciliation.
#[derive(Debug, Error)]
pub enum OrderSyncError {
    #[error("provider error: {0}")]
    Stripe(#[from] StripeError),
    #[error("store error: {0}")]
    Repository(#[from] RepositoryError),
}

/// One order as presented to the customer dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    /// Provider charge ref, doubling as the stable order ID.
    pub id: String,
    /// Human-readable item summary.
    pub items: String,
    /// Amount in major units, e.g. "75.00".
    pub amount: String,
    pub currency: String,
    /// Fulfilment status label from the local record.
    pub status: String,
    /// ISO date of the charge.
    pub date: String,
    pub note: String,
}

/// Summarise what a charge was for.
///
/// Prefers the session line-item descriptions, falls back to the charge's
/// own description, and bottoms out at a fixed placeholder so the dashboard
/// never shows an empty item cell.
fn describe_charge(line_items: &[SessionLineItem], charge_description: Option<&str>) -> String {
    let names: Vec<&str> = line_items
        .iter()
        .filter_map(|item| item.description.as_deref())
        .collect();
    if !names.is_empty() {
        return names.join(", ");
    }
    charge_description.map_or_else(|| "Unknown item".to_owned(), str::to_owned)
}

/// Charge refs that have no local record yet.
fn missing_refs(charges: &[Charge], existing: &[ChargeRef]) -> Vec<ChargeRef> {
    charges
        .iter()
        .filter(|charge| !existing.contains(&charge.id))
        .map(|charge| charge.id.clone())
        .collect()
}

/// Format a charge's unix timestamp as an ISO date.
fn charge_date(created: i64) -> String {
    DateTime::<Utc>::from_timestamp(created, 0)
        .map_or_else(String::new, |ts| ts.format("%Y-%m-%d").to_string())
}

/// Merge provider charges with local enrichment rows, preserving the
/// provider's (newest-first) order.
///
/// A charge whose local record is somehow absent still renders, with the
/// "Unknown" status label and an empty note.
fn merge(
    charges: &[Charge],
    descriptions: &[String],
    enriched: &[EnrichedOrder],
) -> Vec<OrderView> {
    let by_ref: HashMap<&str, &EnrichedOrder> = enriched
        .iter()
        .map(|row| (row.stripe_charge_id.as_str(), row))
        .collect();

    charges
        .iter()
        .zip(descriptions)
        .map(|(charge, items)| {
            let record = by_ref.get(charge.id.as_str()).copied();
            OrderView {
                id: charge.id.as_str().to_owned(),
                items: items.clone(),
                amount: charge.amount.display_major(),
                currency: charge.currency.clone(),
                status: record.map_or_else(|| "Unknown".to_owned(), |r| r.status_label.clone()),
                date: charge_date(charge.created),
                note: record.map_or_else(String::new, |r| r.note.clone()),
            }
        })
        .collect()
}

/// Resolve a charge's item summary by walking back to its checkout session.
///
/// Every hop is best-effort: a charge made outside Checkout has no session,
/// and a provider hiccup on one charge must not fail the whole listing.
async fn resolve_description(stripe: &StripeClient, charge: &Charge) -> String {
    let session = match &charge.payment_intent {
        Some(intent) => stripe
            .find_session_by_payment_intent(intent)
            .await
            .ok()
            .flatten(),
        None => None,
    };

    let line_items = match &session {
        Some(session) => stripe
            .list_session_line_items(&session.id)
            .await
            .unwrap_or_default(),
        None => Vec::new(),
    };

    describe_charge(&line_items, charge.description.as_deref())
}

/// Fetch a customer's charges, reconcile local records, and return the
/// merged order list.
///
/// # Errors
///
/// Returns [`OrderSyncError`] when the charge listing or any local store
/// operation fails. Per-charge description lookups are best-effort and do
/// not fail the sync.
pub async fn sync_orders(
    stripe: &StripeClient,
    orders: &OrderRepository<'_>,
    customer: &guardlan_core::CustomerRef,
) -> Result<Vec<OrderView>, OrderSyncError> {
    let charges = stripe.list_charges(customer, CHARGE_PAGE_LIMIT).await?;
    if charges.is_empty() {
        return Ok(Vec::new());
    }

    let all_refs: Vec<ChargeRef> = charges.iter().map(|c| c.id.clone()).collect();
    let existing = orders.existing_refs(&all_refs).await?;
    let missing = missing_refs(&charges, &existing);

    if !missing.is_empty() {
        tracing::info!(
            customer = %customer,
            count = missing.len(),
            "Recording newly seen charges"
        );
        orders.insert_pending(&missing).await?;
    }

    let enriched = orders.list_enriched(&all_refs).await?;

    let mut descriptions = Vec::with_capacity(charges.len());
    for charge in &charges {
        descriptions.push(resolve_description(stripe, charge).await);
    }

    Ok(merge(&charges, &descriptions, &enriched))
}

#[cfg(test)]
mod tests {
    use super::*;
    use guardlan_core::MinorUnits;

    fn charge(id: &str, amount: i64, created: i64, description: Option<&str>) -> Charge {
        Charge {
            id: ChargeRef::new(id),
            amount: MinorUnits::new(amount),
            currency: "gbp".to_owned(),
            status: "succeeded".to_owned(),
            created,
            description: description.map(str::to_owned),
            payment_intent: None,
        }
    }

    fn line_item(description: Option<&str>) -> SessionLineItem {
        SessionLineItem {
            id: "li_1".to_owned(),
            description: description.map(str::to_owned),
            quantity: Some(1),
            price: None,
        }
    }

    fn enriched(id: &str, note: &str, status_label: &str) -> EnrichedOrder {
        EnrichedOrder {
            stripe_charge_id: id.to_owned(),
            note: note.to_owned(),
            status_label: status_label.to_owned(),
        }
    }

    #[test]
    fn test_describe_prefers_line_items() {
        let items = vec![line_item(Some("GuardLAN Hub")), line_item(Some("Mesh Node"))];
        assert_eq!(
            describe_charge(&items, Some("charge desc")),
            "GuardLAN Hub, Mesh Node"
        );
    }

    #[test]
    fn test_describe_falls_back_to_charge_description() {
        assert_eq!(describe_charge(&[], Some("Invoice #42")), "Invoice #42");
        // Line items without descriptions count as absent.
        assert_eq!(
            describe_charge(&[line_item(None)], Some("Invoice #42")),
            "Invoice #42"
        );
    }

    #[test]
    fn test_describe_bottoms_out_at_placeholder() {
        assert_eq!(describe_charge(&[], None), "Unknown item");
    }

    #[test]
    fn test_missing_refs_diff() {
        let charges = vec![
            charge("ch_1", 7500, 1_700_000_000, None),
            charge("ch_2", 2500, 1_700_000_100, None),
            charge("ch_3", 1000, 1_700_000_200, None),
        ];
        let existing = vec![ChargeRef::new("ch_2")];

        let missing = missing_refs(&charges, &existing);
        let ids: Vec<&str> = missing.iter().map(ChargeRef::as_str).collect();
        assert_eq!(ids, vec!["ch_1", "ch_3"]);
    }

    #[test]
    fn test_missing_refs_empty_when_all_known() {
        let charges = vec![charge("ch_1", 7500, 1_700_000_000, None)];
        let existing = vec![ChargeRef::new("ch_1")];
        assert!(missing_refs(&charges, &existing).is_empty());
    }

    #[test]
    fn test_merge_enriches_known_charges() {
        let charges = vec![
            charge("ch_1", 7500, 1_700_000_000, None),
            charge("ch_2", 2500, 1_700_086_400, None),
        ];
        let descriptions = vec!["GuardLAN Hub".to_owned(), "Mesh Node".to_owned()];
        let rows = vec![
            enriched("ch_1", "left at door", "Shipped"),
            enriched("ch_2", "", "Pending"),
        ];

        let views = merge(&charges, &descriptions, &rows);
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].id, "ch_1");
        assert_eq!(views[0].items, "GuardLAN Hub");
        assert_eq!(views[0].amount, "75.00");
        assert_eq!(views[0].status, "Shipped");
        assert_eq!(views[0].note, "left at door");
        assert_eq!(views[1].status, "Pending");
        assert_eq!(views[1].note, "");
    }

    #[test]
    fn test_merge_defaults_for_absent_record() {
        let charges = vec![charge("ch_9", 999, 1_700_000_000, None)];
        let descriptions = vec!["Unknown item".to_owned()];

        let views = merge(&charges, &descriptions, &[]);
        assert_eq!(views[0].status, "Unknown");
        assert_eq!(views[0].note, "");
    }

    #[test]
    fn test_merge_preserves_charge_order() {
        let charges = vec![
            charge("ch_new", 100, 1_700_100_000, None),
            charge("ch_old", 100, 1_600_000_000, None),
        ];
        let descriptions = vec!["a".to_owned(), "b".to_owned()];
        let rows = vec![enriched("ch_old", "", "Pending"), enriched("ch_new", "", "Pending")];

        let views = merge(&charges, &descriptions, &rows);
        assert_eq!(views[0].id, "ch_new");
        assert_eq!(views[1].id, "ch_old");
    }

    #[test]
    fn test_charge_date_formatting() {
        // 2023-11-14T22:13:20Z
        assert_eq!(charge_date(1_700_000_000), "2023-11-14");
    }
}
