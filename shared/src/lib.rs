//! Shared types and computation for the coffee shop material ledger
//!
//! This crate contains the domain models and the pure arithmetic behind
//! consumption, costing and reconciliation, shared between the backend and
//! the admin dashboard (via WASM).

pub mod consumption;
pub mod costing;
pub mod ledger;
pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
