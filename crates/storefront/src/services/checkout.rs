//! Checkout session building.
//!
//! Turns a client-declared cart into at most one payment-mode checkout
//! session. Recurring items never enter that session; they are deferred to
//! the post-checkout subscription offer, and a cart holding only recurring
//! items skips straight to it.
//!
//! The cart is an externally supplied value: the client owns cart state, the
//! server validates and classifies it per request and persists nothing.

use serde::Deserialize;

use guardlan_core::{PriceRef, UserId};

use crate::db::CustomerRepository;
use crate::error::AppError;
use crate::models::user::CustomerProfile;
use crate::stripe::{
    CreateSessionRequest, SessionLineItemParams, SessionMode, StripeClient,
};

/// A cart line item as submitted by the client.
///
/// Quantities below 1 are rejected up front; the client removes an item by
/// omitting it, not by zeroing it.
#[derive(Debug, Clone, Deserialize)]
pub struct CartItem {
    /// External price reference.
    pub price: PriceRef,
    pub quantity: u32,
}

/// Result of the checkout builder.
#[derive(Debug)]
pub enum CheckoutOutcome {
    /// Redirect the browser to the hosted session.
    Redirect { url: String },
    /// Cart held only recurring items; the caller should start the
    /// subscription flow instead of a payment session.
    SubscriptionOnly,
}

/// Cart split by billing type, preserving input order within each side.
#[derive(Debug)]
struct Partition {
    one_time: Vec<CartItem>,
    recurring: Vec<CartItem>,
}

impl Partition {
    fn has_subscription(&self) -> bool {
        !self.recurring.is_empty()
    }
}

/// Split cart items by their classification.
///
/// `classes` is the parallel recurring-flag list from price classification,
/// one entry per item, in input order.
fn partition_items(items: Vec<CartItem>, classes: &[bool]) -> Partition {
    let mut one_time = Vec::new();
    let mut recurring = Vec::new();

    for (item, &is_recurring) in items.into_iter().zip(classes) {
        if is_recurring {
            recurring.push(item);
        } else {
            one_time.push(item);
        }
    }

    Partition { one_time, recurring }
}

/// Map one-time items to session line-item parameters.
fn one_time_line_items(partition: &Partition) -> Vec<SessionLineItemParams> {
    partition
        .one_time
        .iter()
        .map(|item| SessionLineItemParams {
            price: item.price.clone(),
            quantity: item.quantity,
        })
        .collect()
}

/// Success URL for the payment session.
///
/// `hasSubscription` tells the post-redirect page whether to offer the
/// subscription add-on.
fn success_url(base_url: &str, has_subscription: bool) -> String {
    format!("{base_url}/checkout-success?hasSubscription={has_subscription}")
}

/// Validate the submitted cart before any provider calls.
fn validate_cart(items: &[CartItem]) -> Result<(), AppError> {
    if items.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".to_owned()));
    }
    if items.iter().any(|item| item.quantity == 0) {
        return Err(AppError::BadRequest(
            "Item quantity must be at least 1".to_owned(),
        ));
    }
    Ok(())
}

/// Resolve each price ref to its recurring flag, in input order.
///
/// Any unknown price fails the whole classification; a checkout must not
/// proceed with a partially classified cart.
async fn classify_prices(
    stripe: &StripeClient,
    items: &[CartItem],
) -> Result<Vec<bool>, AppError> {
    let mut classes = Vec::with_capacity(items.len());
    for item in items {
        let price = stripe.retrieve_price(&item.price).await?;
        classes.push(price.is_recurring());
    }
    Ok(classes)
}

/// Look up the user's provider customer ref, creating one on first purchase.
async fn resolve_customer_ref(
    stripe: &StripeClient,
    customers: &CustomerRepository<'_>,
    profile: &CustomerProfile,
) -> Result<guardlan_core::CustomerRef, AppError> {
    if let Some(existing) = &profile.stripe_customer_id {
        return Ok(existing.clone());
    }

    let customer = stripe
        .create_customer(&profile.email, &profile.display_name, profile.id)
        .await?;
    customers.set_stripe_ref(profile.id, &customer.id).await?;

    tracing::info!(user_id = %profile.id, customer = %customer.id, "Created provider customer");
    Ok(customer.id)
}

/// Build a payment-mode checkout session from a cart.
///
/// Classifies every item, partitions out recurring ones, lazily creates the
/// provider customer, and returns the session redirect URL - or the
/// [`CheckoutOutcome::SubscriptionOnly`] sentinel when there is nothing to
/// charge one-time.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for an invalid cart, and propagates
/// provider/store failures; a customer record created before a later
/// failure is not rolled back.
pub async fn build_checkout_session(
    stripe: &StripeClient,
    customers: &CustomerRepository<'_>,
    profile: &CustomerProfile,
    base_url: &str,
    items: Vec<CartItem>,
) -> Result<CheckoutOutcome, AppError> {
    validate_cart(&items)?;

    let classes = classify_prices(stripe, &items).await?;
    let partition = partition_items(items, &classes);

    if partition.one_time.is_empty() {
        return Ok(CheckoutOutcome::SubscriptionOnly);
    }

    let customer_ref = resolve_customer_ref(stripe, customers, profile).await?;

    let request = CreateSessionRequest {
        mode: SessionMode::Payment,
        line_items: one_time_line_items(&partition),
        customer: Some(customer_ref),
        success_url: success_url(base_url, partition.has_subscription()),
        cancel_url: format!("{base_url}/shop"),
        metadata_user: Some(profile.id),
    };

    let session = stripe.create_checkout_session(&request).await?;
    let url = session
        .url
        .ok_or_else(|| AppError::Internal("checkout session has no redirect URL".to_owned()))?;

    Ok(CheckoutOutcome::Redirect { url })
}

/// Build a subscription-mode session for the configured recurring price.
///
/// Independent of cart state; triggered from the post-checkout page when
/// the user opts in. Assumes the customer identity is already linked (or
/// will be, via the completion webhook) and performs no identity creation.
///
/// # Errors
///
/// Propagates provider failures.
pub async fn build_subscription_session(
    stripe: &StripeClient,
    subscription_price: &PriceRef,
    base_url: &str,
    user: Option<UserId>,
) -> Result<String, AppError> {
    let request = CreateSessionRequest {
        mode: SessionMode::Subscription,
        line_items: vec![SessionLineItemParams {
            price: subscription_price.clone(),
            quantity: 1,
        }],
        customer: None,
        success_url: format!("{base_url}/success"),
        cancel_url: format!("{base_url}/checkout-success?subscriptionAdded=true"),
        metadata_user: user,
    };

    let session = stripe.create_checkout_session(&request).await?;
    session
        .url
        .ok_or_else(|| AppError::Internal("checkout session has no redirect URL".to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(price: &str, quantity: u32) -> CartItem {
        CartItem {
            price: PriceRef::new(price),
            quantity,
        }
    }

    #[test]
    fn test_partition_splits_by_class() {
        let items = vec![item("price_A", 2), item("price_sub", 1), item("price_B", 1)];
        let partition = partition_items(items, &[false, true, false]);

        let one_time: Vec<&str> = partition
            .one_time
            .iter()
            .map(|i| i.price.as_str())
            .collect();
        assert_eq!(one_time, vec!["price_A", "price_B"]);
        assert_eq!(
            partition.recurring.first().map(|i| i.price.as_str()),
            Some("price_sub")
        );
        assert!(partition.has_subscription());
    }

    #[test]
    fn test_line_items_exclude_recurring() {
        // A payment-mode session must contain exactly the one-time items'
        // price refs with matching quantities.
        let items = vec![item("price_A", 2), item("price_sub", 1)];
        let partition = partition_items(items, &[false, true]);
        let line_items = one_time_line_items(&partition);

        assert_eq!(line_items.len(), 1);
        assert_eq!(
            line_items,
            vec![SessionLineItemParams {
                price: PriceRef::new("price_A"),
                quantity: 2,
            }]
        );
    }

    #[test]
    fn test_subscription_only_cart_has_no_one_time_items() {
        let items = vec![item("price_sub", 1)];
        let partition = partition_items(items, &[true]);
        assert!(partition.one_time.is_empty());
        assert!(partition.has_subscription());
    }

    #[test]
    fn test_all_one_time_cart_has_no_subscription_flag() {
        let items = vec![item("price_A", 1), item("price_B", 3)];
        let partition = partition_items(items, &[false, false]);
        assert!(!partition.has_subscription());
        assert_eq!(partition.one_time.len(), 2);
    }

    #[test]
    fn test_success_url_carries_subscription_flag() {
        assert_eq!(
            success_url("https://shop.test", true),
            "https://shop.test/checkout-success?hasSubscription=true"
        );
        assert_eq!(
            success_url("https://shop.test", false),
            "https://shop.test/checkout-success?hasSubscription=false"
        );
    }

    #[test]
    fn test_validate_cart_rejects_empty() {
        assert!(validate_cart(&[]).is_err());
    }

    #[test]
    fn test_validate_cart_rejects_zero_quantity() {
        assert!(validate_cart(&[item("price_A", 0)]).is_err());
        assert!(validate_cart(&[item("price_A", 1)]).is_ok());
    }
}
