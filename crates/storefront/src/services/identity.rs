//! Customer identity linking.
//!
//! The completion webhook carries the provider's customer ref plus our own
//! user ID in session metadata; this module writes that ref onto the local
//! profile so later order reconciliation can key off it.

use guardlan_core::{CustomerRef, UserId};

use crate::db::CustomerRepository;
use crate::error::AppError;
use crate::models::CustomerProfile;

/// Result of a link attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The profile's customer ref was written or replaced.
    Linked,
    /// The profile already held this exact ref; nothing was written.
    Unchanged,
}

/// Whether an incoming customer ref requires a write.
///
/// A profile with no ref always needs one; a profile with the same ref
/// does not. A differing ref still links (last write wins), which the
/// caller logs before performing.
fn needs_link(current: Option<&CustomerRef>, incoming: &CustomerRef) -> bool {
    current != Some(incoming)
}

/// Resolve the profile a delivery claims to be about.
///
/// A user ID that matches no profile means the delivery's metadata is bad,
/// the same failure class as missing metadata: reject the request, don't
/// signal a server fault.
fn known_profile(
    profile: Option<CustomerProfile>,
    user: UserId,
) -> Result<CustomerProfile, AppError> {
    profile.ok_or_else(|| AppError::BadRequest(format!("No profile for user {user}")))
}

/// Link a provider customer ref to a local user profile.
///
/// Reads before writing so a replayed webhook for an already-linked
/// profile is a no-op rather than a redundant update.
///
/// # Errors
///
/// Returns `AppError::BadRequest` when the user ID from webhook metadata
/// does not match any profile, and propagates store failures.
pub async fn link_customer(
    customers: &CustomerRepository<'_>,
    user: UserId,
    incoming: &CustomerRef,
) -> Result<LinkOutcome, AppError> {
    let profile = known_profile(customers.get_by_id(user).await?, user)?;

    if !needs_link(profile.stripe_customer_id.as_ref(), incoming) {
        tracing::debug!(user_id = %user, customer = %incoming, "Customer ref already linked");
        return Ok(LinkOutcome::Unchanged);
    }

    if let Some(previous) = &profile.stripe_customer_id {
        tracing::warn!(
            user_id = %user,
            previous = %previous,
            incoming = %incoming,
            "Replacing existing customer ref"
        );
    }

    customers.set_stripe_ref(user, incoming).await?;
    tracing::info!(user_id = %user, customer = %incoming, "Linked provider customer");
    Ok(LinkOutcome::Linked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use chrono::Utc;
    use guardlan_core::Email;

    #[test]
    fn test_unknown_user_is_a_client_error() {
        // A delivery naming a user we have never seen is a malformed
        // delivery, not a server fault: the endpoint's failure classes are
        // 400 (bad fields/signature) and 500 (store error) only.
        let err = known_profile(None, UserId::generate()).expect_err("no profile");
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_known_user_passes_through() {
        let id = UserId::generate();
        let profile = CustomerProfile {
            id,
            email: Email::parse("jo@example.com").expect("valid"),
            display_name: "Jo".to_owned(),
            stripe_customer_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let resolved = known_profile(Some(profile), id).expect("profile");
        assert_eq!(resolved.id, id);
    }

    #[test]
    fn test_unlinked_profile_needs_link() {
        let incoming = CustomerRef::new("cus_123");
        assert!(needs_link(None, &incoming));
    }

    #[test]
    fn test_same_ref_is_a_noop() {
        let current = CustomerRef::new("cus_123");
        let incoming = CustomerRef::new("cus_123");
        assert!(!needs_link(Some(&current), &incoming));
    }

    #[test]
    fn test_different_ref_relinks() {
        // Last write wins when the provider hands us a different customer
        // for the same user, e.g. after a provider-side merge.
        let current = CustomerRef::new("cus_old");
        let incoming = CustomerRef::new("cus_new");
        assert!(needs_link(Some(&current), &incoming));
    }
}
