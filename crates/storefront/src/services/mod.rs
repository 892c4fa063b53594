//! Business logic services.
//!
//! Each service is a thin orchestration over the Stripe client and the
//! repositories; decision logic (partitioning, diffing, merging, link
//! guards) lives in pure functions so it can be tested without I/O.

pub mod checkout;
pub mod identity;
pub mod mailer;
pub mod orders;

pub use checkout::{CartItem, CheckoutOutcome};
pub use identity::LinkOutcome;
pub use mailer::{MailerClient, MailerError};
pub use orders::OrderView;
