//! Weighted-average cost basis for materials

use rust_decimal::Decimal;
use sqlx::PgPool;

use shared::costing::{average_from_totals, CostMemo};

use crate::error::AppResult;

/// Resolves the weighted-average import cost of materials.
///
/// Costs are memoised for the lifetime of the calculator, so one calculator
/// should serve exactly one report computation.
pub struct CostBasisCalculator {
    db: PgPool,
    memo: CostMemo,
}

impl CostBasisCalculator {
    pub fn new(db: PgPool) -> Self {
        Self {
            db,
            memo: CostMemo::new(),
        }
    }

    /// Load the average cost of every material in `material_ids` not yet
    /// memoised, with one grouped query
    pub async fn prefetch(&mut self, material_ids: &[i32]) -> AppResult<()> {
        let missing = self.memo.missing(material_ids);
        if missing.is_empty() {
            return Ok(());
        }

        let totals = sqlx::query_as::<_, (i32, Decimal, Decimal)>(
            r#"
            SELECT material_id,
                   COALESCE(SUM(price_per_unit * quantity), 0) AS total_spend,
                   COALESCE(SUM(quantity), 0) AS total_quantity
            FROM material_importations
            WHERE material_id = ANY($1)
            GROUP BY material_id
            "#,
        )
        .bind(&missing)
        .fetch_all(&self.db)
        .await?;

        for (material_id, spend, quantity) in totals {
            self.memo.insert(material_id, average_from_totals(spend, quantity));
        }

        // never imported
        for material_id in missing {
            if self.memo.get(material_id).is_none() {
                self.memo.insert(material_id, Decimal::ZERO);
            }
        }

        Ok(())
    }

    pub async fn average_cost(&mut self, material_id: i32) -> AppResult<Decimal> {
        if let Some(cost) = self.memo.get(material_id) {
            return Ok(cost);
        }
        self.prefetch(&[material_id]).await?;
        Ok(self.memo.get(material_id).unwrap_or(Decimal::ZERO))
    }

    pub fn memo(&self) -> &CostMemo {
        &self.memo
    }
}
