//! Domain models for the coffee shop material ledger

mod contracting;
mod material;
mod order;
mod recipe;

pub use contracting::*;
pub use material::*;
pub use order::*;
pub use recipe::*;
