//! Domain models for the storefront.

pub mod session;
pub mod ticket;
pub mod user;

pub use session::{CurrentUser, session_keys};
pub use ticket::{Ticket, TicketNote};
pub use user::CustomerProfile;
