//! Core types for GuardLAN.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod refs;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::MinorUnits;
pub use refs::{ChargeRef, CustomerRef, PriceRef, SessionRef};
pub use status::*;
