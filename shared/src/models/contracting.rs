//! Daily material requisitions and reconciliation results

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Material withdrawn from stock for one day's expected sales
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contracting {
    pub id: i32,
    pub material_id: i32,
    pub contract_date: NaiveDate,
    pub quantity: Decimal,
    pub employee_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Consumed quantity of one material
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaterialConsumption {
    pub material_id: i32,
    pub consumed: Decimal,
}

/// Consumption for a single day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyConsumption {
    pub date: NaiveDate,
    pub consumption: Vec<MaterialConsumption>,
}

/// Reconciliation of one contracting row against actual usage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemainingResult {
    pub material_id: i32,
    pub material_name: String,
    pub material_code: String,
    pub unit: String,
    pub contracted_quantity: Decimal,
    pub actual_consumed: Decimal,
    pub remaining: Decimal,
}

/// Reconciliation results for a day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyRemaining {
    pub date: NaiveDate,
    pub results: Vec<RemainingResult>,
}
