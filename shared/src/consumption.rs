//! Material consumption aggregation over order line items

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{MaterialConsumption, RecipeBook};

/// Total consumed quantity keyed by material id
pub type ConsumptionMap = BTreeMap<i32, Decimal>;

/// A qualifying order line item, as loaded for aggregation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionLine {
    pub order_id: i32,
    pub product_id: i32,
    pub size_id: Option<i32>,
    pub quantity: i32,
}

/// Expand every line through its product recipe and sum `per_unit * quantity`
/// per material. Lines of products without a recipe contribute nothing.
pub fn aggregate_consumption(lines: &[ConsumptionLine], book: &RecipeBook) -> ConsumptionMap {
    let mut totals = ConsumptionMap::new();

    for line in lines {
        let quantity = Decimal::from(line.quantity);
        for component in book.resolve(line.product_id, line.size_id) {
            *totals.entry(component.material_id).or_insert(Decimal::ZERO) +=
                component.per_unit * quantity;
        }
    }

    totals
}

/// Distinct product ids referenced by the lines, for batch recipe loading
pub fn product_ids(lines: &[ConsumptionLine]) -> Vec<i32> {
    let mut ids: Vec<i32> = lines.iter().map(|l| l.product_id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Flatten a consumption map into the response rows
pub fn to_rows(map: &ConsumptionMap) -> Vec<MaterialConsumption> {
    map.iter()
        .map(|(material_id, consumed)| MaterialConsumption {
            material_id: *material_id,
            consumed: consumed.normalize(),
        })
        .collect()
}

/// Consumed quantity for one material, zero when untouched
pub fn consumed_of(map: &ConsumptionMap, material_id: i32) -> Decimal {
    map.get(&material_id).copied().unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MaterialRecipe, Recipe};
    use proptest::prelude::*;
    use std::str::FromStr;

    const COFFEE: i32 = 1;
    const MILK: i32 = 2;
    const LATTE: i32 = 100;
    const WATER_BOTTLE: i32 = 200;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn latte_book() -> RecipeBook {
        RecipeBook::from_iter([Recipe::new(
            LATTE,
            vec![
                MaterialRecipe { material_id: COFFEE, consume: dec("0.02"), size_id: None },
                MaterialRecipe { material_id: MILK, consume: dec("0.18"), size_id: None },
            ],
        )])
    }

    fn line(product_id: i32, size_id: Option<i32>, quantity: i32) -> ConsumptionLine {
        ConsumptionLine { order_id: 1, product_id, size_id, quantity }
    }

    #[test]
    fn test_three_lattes_consume_coffee_and_milk() {
        let totals = aggregate_consumption(&[line(LATTE, None, 3)], &latte_book());

        assert_eq!(consumed_of(&totals, COFFEE), dec("0.06"));
        assert_eq!(consumed_of(&totals, MILK), dec("0.54"));
    }

    #[test]
    fn test_product_without_recipe_consumes_nothing() {
        let totals = aggregate_consumption(&[line(WATER_BOTTLE, None, 12)], &latte_book());
        assert!(totals.is_empty());
    }

    #[test]
    fn test_lines_accumulate_per_material() {
        let lines = vec![line(LATTE, None, 1), line(LATTE, None, 2), line(WATER_BOTTLE, None, 5)];
        let totals = aggregate_consumption(&lines, &latte_book());

        assert_eq!(totals.len(), 2);
        assert_eq!(consumed_of(&totals, COFFEE), dec("0.06"));
    }

    #[test]
    fn test_size_override_used_for_matching_lines() {
        let mut book = latte_book();
        book.push_row(
            LATTE,
            MaterialRecipe {
                material_id: MILK,
                consume: dec("0.25"),
                size_id: Some(3),
            },
        );

        let totals = aggregate_consumption(&[line(LATTE, Some(3), 2), line(LATTE, None, 1)], &book);
        // 2 * 0.25 + 1 * 0.18
        assert_eq!(consumed_of(&totals, MILK), dec("0.68"));
    }

    #[test]
    fn test_rows_are_sorted_and_normalized() {
        let totals = aggregate_consumption(&[line(LATTE, None, 5)], &latte_book());
        let rows = to_rows(&totals);

        assert_eq!(rows[0].material_id, COFFEE);
        assert_eq!(rows[0].consumed.to_string(), "0.1");
        assert_eq!(rows[1].consumed.to_string(), "0.9");
    }

    #[test]
    fn test_product_ids_deduplicated() {
        let lines = vec![line(3, None, 1), line(1, None, 1), line(3, Some(2), 1)];
        assert_eq!(product_ids(&lines), vec![1, 3]);
    }

    proptest! {
        #[test]
        fn prop_consumption_is_per_unit_times_quantity(
            per_unit in (1i64..=10_000i64).prop_map(|n| Decimal::new(n, 3)),
            quantity in 1i32..500
        ) {
            let book = RecipeBook::from_iter([Recipe::new(
                LATTE,
                vec![MaterialRecipe { material_id: COFFEE, consume: per_unit, size_id: None }],
            )]);
            let totals = aggregate_consumption(&[line(LATTE, None, quantity)], &book);
            prop_assert_eq!(consumed_of(&totals, COFFEE), per_unit * Decimal::from(quantity));
        }

        #[test]
        fn prop_splitting_lines_does_not_change_totals(
            parts in prop::collection::vec(1i32..50, 1..10)
        ) {
            let book = latte_book();
            let split: Vec<ConsumptionLine> = parts.iter().map(|q| line(LATTE, None, *q)).collect();
            let merged = vec![line(LATTE, None, parts.iter().sum())];

            prop_assert_eq!(
                aggregate_consumption(&split, &book),
                aggregate_consumption(&merged, &book)
            );
        }
    }
}
