//! Daily close pipeline tests
//!
//! Runs the pure half of a day's close without a database: recipes resolve
//! line items into consumption, consumption reconciles against contracted
//! quantities, and the same consumption is costed for the profit report.

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::consumption::{aggregate_consumption, consumed_of, ConsumptionLine};
use shared::costing::{compute_cogs, CostMemo, ProfitReport};
use shared::ledger::{check_allocation, remaining_after, Availability};
use shared::models::{MaterialRecipe, Recipe, RecipeBook};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

const COFFEE: i32 = 1;
const MILK: i32 = 2;
const LATTE: i32 = 10;
const ESPRESSO: i32 = 11;
const LARGE: i32 = 3;

fn row(material_id: i32, consume: &str, size_id: Option<i32>) -> MaterialRecipe {
    MaterialRecipe {
        material_id,
        consume: dec(consume),
        size_id,
    }
}

fn menu() -> RecipeBook {
    [
        Recipe::new(
            LATTE,
            vec![
                row(COFFEE, "0.02", None),
                row(MILK, "0.18", None),
                row(MILK, "0.25", Some(LARGE)),
            ],
        ),
        Recipe::new(ESPRESSO, vec![row(COFFEE, "0.018", None)]),
    ]
    .into_iter()
    .collect()
}

fn line(order_id: i32, product_id: i32, size_id: Option<i32>, quantity: i32) -> ConsumptionLine {
    ConsumptionLine {
        order_id,
        product_id,
        size_id,
        quantity,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_latte_day_close() {
        let lines = vec![line(1, LATTE, None, 3)];
        let consumption = aggregate_consumption(&lines, &menu());

        assert_eq!(consumed_of(&consumption, COFFEE), dec("0.06"));
        assert_eq!(consumed_of(&consumption, MILK), dec("0.54"));

        // 2 kg of coffee contracted for the day
        assert_eq!(remaining_after(dec("2"), consumed_of(&consumption, COFFEE)), dec("1.94"));
    }

    #[test]
    fn test_mixed_orders_day_close() {
        let lines = vec![
            line(1, LATTE, None, 2),
            line(1, ESPRESSO, None, 1),
            line(2, LATTE, Some(LARGE), 1),
            line(3, 99, None, 4),
        ];
        let consumption = aggregate_consumption(&lines, &menu());

        // 2 × 0.02 + 0.018 + 0.02
        assert_eq!(consumed_of(&consumption, COFFEE), dec("0.078"));
        // 2 × 0.18 + 0.25
        assert_eq!(consumed_of(&consumption, MILK), dec("0.61"));
        assert_eq!(consumption.len(), 2);
    }

    #[test]
    fn test_profit_from_costed_consumption() {
        let lines = vec![line(1, LATTE, None, 100)];
        let consumption = aggregate_consumption(&lines, &menu());

        let mut costs = CostMemo::new();
        costs.insert(COFFEE, dec("175"));
        costs.insert(MILK, dec("1.333"));

        // 2 × 175 + 18 × 1.333 = 373.994
        let cogs = compute_cogs(&consumption, &costs);
        assert_eq!(cogs, dec("373.99"));

        let start = chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let report = ProfitReport::new(start, start, dec("6500"), cogs);
        assert_eq!(report.profit, dec("6126.01"));
    }

    #[test]
    fn test_allocation_within_availability() {
        let availability = Availability {
            last_remain: dec("1.5"),
            imported_since: dec("10"),
            contracted: dec("3"),
        };

        assert_eq!(availability.available(), dec("8.5"));
        assert!(check_allocation(dec("8.5"), availability.available(), "kg").is_ok());

        let rejected = check_allocation(dec("9"), availability.available(), "kg").unwrap_err();
        assert_eq!(rejected.available, dec("8.5"));
        assert_eq!(rejected.to_string(), "Requested 9 kg but only 8.5 kg available");
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for generating line quantities
    fn quantity_strategy() -> impl Strategy<Value = i32> {
        1i32..=50
    }

    /// Strategy for generating contracted quantities
    fn contracted_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..=10000i64).prop_map(|n| Decimal::new(n, 2)) // 0.00 to 100.00
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Consumption is linear in line quantity
        #[test]
        fn prop_consumption_linear_in_quantity(n in quantity_strategy(), k in 1i32..=5) {
            let book = menu();
            let once = aggregate_consumption(&[line(1, LATTE, None, n)], &book);
            let scaled = aggregate_consumption(&[line(1, LATTE, None, n * k)], &book);

            for (material_id, consumed) in &once {
                prop_assert_eq!(consumed_of(&scaled, *material_id), *consumed * Decimal::from(k));
            }
        }

        /// Splitting a quantity across line items does not change consumption
        #[test]
        fn prop_split_lines_consume_the_same(a in quantity_strategy(), b in quantity_strategy()) {
            let book = menu();
            let combined = aggregate_consumption(&[line(1, ESPRESSO, None, a + b)], &book);
            let split = aggregate_consumption(
                &[line(1, ESPRESSO, None, a), line(2, ESPRESSO, None, b)],
                &book,
            );
            prop_assert_eq!(combined, split);
        }

        /// Leftover plus usage never exceeds what was contracted
        #[test]
        fn prop_remaining_plus_consumed_covers_contracted(
            contracted in contracted_strategy(),
            n in 0i32..=200,
        ) {
            let consumption = aggregate_consumption(&[line(1, LATTE, None, n.max(1))], &menu());
            let consumed = consumed_of(&consumption, MILK);
            let remaining = remaining_after(contracted, consumed);

            prop_assert!(remaining >= Decimal::ZERO);
            prop_assert!(remaining <= contracted);
            if consumed <= contracted {
                prop_assert_eq!(remaining + consumed, contracted);
            }
        }

        /// An accepted allocation never drives availability negative
        #[test]
        fn prop_accepted_allocation_keeps_availability(
            last_remain in contracted_strategy(),
            imported in contracted_strategy(),
            requested in contracted_strategy(),
        ) {
            let before = Availability {
                last_remain,
                imported_since: imported,
                contracted: Decimal::ZERO,
            };
            if check_allocation(requested, before.available(), "kg").is_ok() {
                let after = Availability { contracted: requested, ..before };
                prop_assert_eq!(after.available(), before.available() - requested);
            }
        }
    }
}
