//! GuardLAN storefront library.
//!
//! JSON API for the GuardLAN shop: checkout session creation, payment
//! webhook handling, order reconciliation against Stripe, support tickets,
//! and the contact form. Exposed as a library so handlers and services can
//! be exercised in tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod stripe;
