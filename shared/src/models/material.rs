//! Material units and remain snapshots

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Measurement class of a unit. Display only, quantities are never converted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnitClass {
    Weight,
    Volume,
    Count,
}

impl UnitClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitClass::Weight => "weight",
            UnitClass::Volume => "volume",
            UnitClass::Count => "count",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "weight" => Some(UnitClass::Weight),
            "volume" => Some(UnitClass::Volume),
            "count" => Some(UnitClass::Count),
            _ => None,
        }
    }
}

/// Daily leftover snapshot, the next day's starting balance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRemain {
    pub material_id: i32,
    pub remain_date: NaiveDate,
    pub quantity: Decimal,
}
