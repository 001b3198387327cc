//! Inventory ledger arithmetic: availability, leftovers and allocation checks

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Inputs of the availability formula for one material and day
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    /// Latest snapshot strictly before the day, zero when none exists
    pub last_remain: Decimal,
    /// Imports after the snapshot date, up to and including the day
    pub imported_since: Decimal,
    /// Already contracted for the day
    pub contracted: Decimal,
}

impl Availability {
    /// `last_remain + imported_since - contracted`, never below zero
    pub fn available(&self) -> Decimal {
        (self.last_remain + self.imported_since - self.contracted).max(Decimal::ZERO)
    }

    /// Stock on hand before any contracting for the day
    pub fn on_hand(&self) -> Decimal {
        (self.last_remain + self.imported_since).max(Decimal::ZERO)
    }
}

/// Leftover of a contracted quantity after actual usage, never below zero
pub fn remaining_after(contracted: Decimal, consumed: Decimal) -> Decimal {
    (contracted - consumed).max(Decimal::ZERO)
}

/// Requested allocation exceeds what is available
#[derive(Debug, Clone, Error, PartialEq)]
#[error("Requested {requested} {unit} but only {available} {unit} available")]
pub struct AllocationRejected {
    pub requested: Decimal,
    pub available: Decimal,
    pub unit: String,
}

/// Reject allocations larger than the available quantity
pub fn check_allocation(
    requested: Decimal,
    available: Decimal,
    unit: &str,
) -> Result<(), AllocationRejected> {
    if requested > available {
        return Err(AllocationRejected {
            requested,
            available,
            unit: unit.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn qty(n: i64) -> Decimal {
        Decimal::from(n)
    }

    #[test]
    fn test_available_sums_remain_and_imports() {
        let a = Availability {
            last_remain: qty(20),
            imported_since: qty(50),
            contracted: qty(30),
        };
        assert_eq!(a.available(), qty(40));
        assert_eq!(a.on_hand(), qty(70));
    }

    #[test]
    fn test_available_floored_at_zero() {
        let a = Availability {
            last_remain: qty(5),
            imported_since: Decimal::ZERO,
            contracted: qty(80),
        };
        assert_eq!(a.available(), Decimal::ZERO);
    }

    #[test]
    fn test_remaining_after_consumption() {
        assert_eq!(remaining_after(qty(50), qty(12)), qty(38));
        assert_eq!(remaining_after(qty(10), qty(12)), Decimal::ZERO);
    }

    #[test]
    fn test_check_allocation() {
        assert!(check_allocation(qty(10), qty(10), "kg").is_ok());

        let err = check_allocation(qty(11), qty(10), "kg").unwrap_err();
        assert_eq!(err.available, qty(10));
        assert_eq!(err.to_string(), "Requested 11 kg but only 10 kg available");
    }

    proptest! {
        #[test]
        fn prop_available_never_negative(
            remain in 0i64..10_000,
            imported in 0i64..10_000,
            contracted in 0i64..1_000_000
        ) {
            let a = Availability {
                last_remain: Decimal::new(remain, 2),
                imported_since: Decimal::new(imported, 2),
                contracted: Decimal::new(contracted, 2),
            };
            prop_assert!(a.available() >= Decimal::ZERO);
            prop_assert!(a.available() <= a.on_hand());
        }

        #[test]
        fn prop_remaining_never_exceeds_contracted(
            contracted in 0i64..100_000,
            consumed in 0i64..100_000
        ) {
            let r = remaining_after(Decimal::from(contracted), Decimal::from(consumed));
            prop_assert!(r >= Decimal::ZERO);
            prop_assert!(r <= Decimal::from(contracted));
        }
    }
}
