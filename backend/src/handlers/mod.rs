//! HTTP handlers

pub mod contracting;
pub mod health;
pub mod materials;
pub mod recipes;
pub mod reporting;

pub use contracting::*;
pub use health::*;
pub use materials::*;
pub use recipes::*;
pub use reporting::*;
