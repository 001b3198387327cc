//! WebAssembly module for the coffee shop admin dashboard
//!
//! Previews computed in the browser before anything is submitted:
//! - Weighted-average cost of import batches
//! - Material usage of a recipe for a size and quantity
//! - Leftover of a contracted quantity
//! - Recipe row validation
//!
//! Quantities and money cross the boundary as decimal strings.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use shared::consumption::{aggregate_consumption, to_rows, ConsumptionLine};
use shared::costing::{weighted_average_cost, ImportBatch};
use shared::ledger::remaining_after;
use shared::models::{MaterialConsumption, MaterialRecipe, Recipe, RecipeBook};
use shared::validation::validate_recipe_rows;

// Product id used for previews of a recipe that is not saved yet
const PREVIEW_PRODUCT: i32 = 0;

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, String> {
    Decimal::from_str(value.trim()).map_err(|e| format!("Invalid {}: {}", field, e))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("Serialization failed: {}", e))
}

fn weighted_cost(batches_json: &str) -> Result<String, String> {
    let batches: Vec<ImportBatch> =
        serde_json::from_str(batches_json).map_err(|e| format!("Invalid batches JSON: {}", e))?;
    Ok(weighted_average_cost(&batches).to_string())
}

fn recipe_consumption(
    rows_json: &str,
    size_id: Option<i32>,
    quantity: i32,
) -> Result<Vec<MaterialConsumption>, String> {
    if quantity < 1 {
        return Err("Quantity must be at least 1".to_string());
    }

    let rows: Vec<MaterialRecipe> =
        serde_json::from_str(rows_json).map_err(|e| format!("Invalid recipe JSON: {}", e))?;
    validate_recipe_rows(&rows)?;

    let book: RecipeBook = std::iter::once(Recipe::new(PREVIEW_PRODUCT, rows)).collect();
    let line = ConsumptionLine {
        order_id: 0,
        product_id: PREVIEW_PRODUCT,
        size_id,
        quantity,
    };

    Ok(to_rows(&aggregate_consumption(&[line], &book)))
}

fn leftover(contracted: &str, consumed: &str) -> Result<String, String> {
    let contracted = parse_decimal("contracted quantity", contracted)?;
    let consumed = parse_decimal("consumed quantity", consumed)?;
    Ok(remaining_after(contracted, consumed).to_string())
}

fn recipe_errors(rows_json: &str) -> Option<String> {
    match serde_json::from_str::<Vec<MaterialRecipe>>(rows_json) {
        Ok(rows) => validate_recipe_rows(&rows).err().map(str::to_string),
        Err(e) => Some(format!("Invalid recipe JSON: {}", e)),
    }
}

/// Weighted-average cost of `[{quantity, pricePerUnit}]` batches, "0" when
/// nothing was imported
#[wasm_bindgen]
pub fn calculate_weighted_average_cost(batches_json: &str) -> Result<String, JsValue> {
    weighted_cost(batches_json).map_err(|e| JsValue::from_str(&e))
}

/// Material usage of `quantity` units of a recipe sold in `size_id`, as a
/// JSON array of `{materialId, consumed}`
#[wasm_bindgen]
pub fn preview_recipe_consumption(
    rows_json: &str,
    size_id: Option<i32>,
    quantity: i32,
) -> Result<String, JsValue> {
    recipe_consumption(rows_json, size_id, quantity)
        .and_then(|rows| to_json(&rows))
        .map_err(|e| JsValue::from_str(&e))
}

/// Leftover of a contracted quantity after usage, never below zero
#[wasm_bindgen]
pub fn calculate_remaining(contracted: &str, consumed: &str) -> Result<String, JsValue> {
    leftover(contracted, consumed).map_err(|e| JsValue::from_str(&e))
}

/// First problem found in a set of recipe rows, `None` when they are valid
#[wasm_bindgen]
pub fn validate_recipe_json(rows_json: &str) -> Option<String> {
    recipe_errors(rows_json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_cost() {
        let batches = r#"[
            {"quantity": "10", "pricePerUnit": "100"},
            {"quantity": "30", "pricePerUnit": "200"}
        ]"#;
        assert_eq!(weighted_cost(batches).unwrap(), "175");
        assert_eq!(weighted_cost("[]").unwrap(), "0");
        assert!(weighted_cost("not json").is_err());
    }

    #[test]
    fn test_recipe_consumption_prefers_size_row() {
        let rows = r#"[
            {"materialId": 1, "consume": "0.02", "sizeId": null},
            {"materialId": 2, "consume": "0.18", "sizeId": null},
            {"materialId": 2, "consume": "0.25", "sizeId": 3}
        ]"#;

        let regular = recipe_consumption(rows, None, 3).unwrap();
        assert_eq!(regular[0].consumed, Decimal::from_str("0.06").unwrap());
        assert_eq!(regular[1].consumed, Decimal::from_str("0.54").unwrap());

        let large = recipe_consumption(rows, Some(3), 2).unwrap();
        assert_eq!(large[1].consumed, Decimal::from_str("0.5").unwrap());
    }

    #[test]
    fn test_recipe_consumption_rejects_zero_quantity() {
        assert!(recipe_consumption("[]", None, 0).is_err());
    }

    #[test]
    fn test_leftover() {
        assert_eq!(leftover("50", "12").unwrap(), "38");
        assert_eq!(leftover("5", "9").unwrap(), "0");
        assert!(leftover("five", "1").is_err());
    }

    #[test]
    fn test_recipe_errors() {
        let valid = r#"[{"materialId": 1, "consume": "0.02", "sizeId": null}]"#;
        let negative = r#"[{"materialId": 1, "consume": "-0.5", "sizeId": null}]"#;
        assert!(validate_recipe_json(valid).is_none());
        assert!(validate_recipe_json(negative).is_some());
        assert!(validate_recipe_json("{").is_some());
    }
}
