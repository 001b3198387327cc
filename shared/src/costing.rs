//! Weighted-average costing, COGS and profit

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::consumption::ConsumptionMap;

/// Quantity and unit price of one import batch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportBatch {
    pub quantity: Decimal,
    pub price_per_unit: Decimal,
}

/// `Σ(price × qty) / Σ(qty)`, zero when nothing was ever imported
pub fn weighted_average_cost(batches: &[ImportBatch]) -> Decimal {
    let (spend, quantity) = batches.iter().fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(spend, quantity), b| (spend + b.price_per_unit * b.quantity, quantity + b.quantity),
    );
    average_from_totals(spend, quantity)
}

/// Average from pre-aggregated totals
pub fn average_from_totals(total_spend: Decimal, total_quantity: Decimal) -> Decimal {
    if total_quantity.is_zero() {
        Decimal::ZERO
    } else {
        total_spend / total_quantity
    }
}

/// Per-material average costs, scoped to a single report computation
#[derive(Debug, Clone, Default)]
pub struct CostMemo {
    costs: HashMap<i32, Decimal>,
}

impl CostMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, material_id: i32) -> Option<Decimal> {
        self.costs.get(&material_id).copied()
    }

    pub fn insert(&mut self, material_id: i32, cost: Decimal) {
        self.costs.insert(material_id, cost);
    }

    /// Ids from `material_ids` that are not memoised yet
    pub fn missing(&self, material_ids: &[i32]) -> Vec<i32> {
        let mut ids: Vec<i32> = material_ids
            .iter()
            .copied()
            .filter(|id| !self.costs.contains_key(id))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }
}

/// Round a money amount to cents, halves away from zero
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Cost attributed to one material
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaterialCostLine {
    pub material_id: i32,
    pub consumed: Decimal,
    pub average_cost: Decimal,
    pub cost: Decimal,
}

/// Per-material cost lines; materials with no memoised cost are costed at zero
pub fn cost_lines(consumption: &ConsumptionMap, costs: &CostMemo) -> Vec<MaterialCostLine> {
    consumption
        .iter()
        .map(|(material_id, consumed)| {
            let average_cost = costs.get(*material_id).unwrap_or(Decimal::ZERO);
            MaterialCostLine {
                material_id: *material_id,
                consumed: *consumed,
                average_cost,
                cost: *consumed * average_cost,
            }
        })
        .collect()
}

/// Σ consumed × average cost, rounded once at the end
pub fn compute_cogs(consumption: &ConsumptionMap, costs: &CostMemo) -> Decimal {
    let raw: Decimal = cost_lines(consumption, costs).iter().map(|l| l.cost).sum();
    round_money(raw)
}

/// Revenue, cost of goods sold and profit for a period
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfitReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_revenue: Decimal,
    pub cogs: Decimal,
    pub profit: Decimal,
}

impl ProfitReport {
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        total_revenue: Decimal,
        cogs: Decimal,
    ) -> Self {
        Self {
            start_date,
            end_date,
            total_revenue,
            cogs,
            profit: total_revenue - cogs,
        }
    }
}
