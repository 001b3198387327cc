//! Business logic services for the material consumption ledger

pub mod consumption;
pub mod contracting;
pub mod costing;
pub mod material;
pub mod recipe;
pub mod reporting;

pub use consumption::ConsumptionService;
pub use contracting::ContractingService;
pub use costing::CostBasisCalculator;
pub use material::MaterialService;
pub use recipe::RecipeService;
pub use reporting::ReportingService;
