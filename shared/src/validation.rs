//! Validation utilities shared by the backend and the dashboard

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::MaterialRecipe;

/// Quantities requisitioned or recorded must be strictly positive
pub fn validate_positive_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Snapshots may be zero but never negative
pub fn validate_remain_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity < Decimal::ZERO {
        return Err("Remaining quantity cannot be negative");
    }
    Ok(())
}

/// Report ranges must not end before they start
pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), &'static str> {
    if end < start {
        return Err("End date must not be before start date");
    }
    Ok(())
}

/// At most one row per (material, size) within a recipe, and no negative usage
pub fn validate_recipe_rows(rows: &[MaterialRecipe]) -> Result<(), &'static str> {
    for (i, row) in rows.iter().enumerate() {
        if row.consume < Decimal::ZERO {
            return Err("Recipe consumption cannot be negative");
        }
        if rows[..i]
            .iter()
            .any(|prev| prev.material_id == row.material_id && prev.size_id == row.size_id)
        {
            return Err("Duplicate recipe row for material and size");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(material_id: i32, consume: i64, size_id: Option<i32>) -> MaterialRecipe {
        MaterialRecipe {
            material_id,
            consume: Decimal::from(consume),
            size_id,
        }
    }

    #[test]
    fn test_positive_quantity() {
        assert!(validate_positive_quantity(Decimal::ONE).is_ok());
        assert!(validate_positive_quantity(Decimal::ZERO).is_err());
        assert!(validate_positive_quantity(Decimal::NEGATIVE_ONE).is_err());
    }

    #[test]
    fn test_remain_quantity_allows_zero() {
        assert!(validate_remain_quantity(Decimal::ZERO).is_ok());
        assert!(validate_remain_quantity(Decimal::NEGATIVE_ONE).is_err());
    }

    #[test]
    fn test_date_range() {
        let a = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert!(validate_date_range(a, b).is_ok());
        assert!(validate_date_range(a, a).is_ok());
        assert!(validate_date_range(b, a).is_err());
    }

    #[test]
    fn test_recipe_rows() {
        assert!(validate_recipe_rows(&[row(1, 1, None), row(1, 2, Some(3))]).is_ok());
        assert!(validate_recipe_rows(&[row(1, 1, None), row(1, 2, None)]).is_err());
        assert!(validate_recipe_rows(&[row(1, -1, None)]).is_err());
    }
}
