//! Consumption aggregation over qualifying orders

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use shared::consumption::{
    aggregate_consumption, product_ids, to_rows, ConsumptionLine, ConsumptionMap,
};
use shared::models::{status_strings, DailyConsumption, OrderStatus, CONSUMPTION_STATUSES};
use shared::types::{DateRange, TimeWindow};

use crate::error::{AppError, AppResult};
use crate::queue::OrderConsumptionRecorder;
use crate::services::material::MaterialService;
use crate::services::recipe::RecipeService;

/// Consumption service
#[derive(Clone)]
pub struct ConsumptionService {
    db: PgPool,
    recipes: RecipeService,
}

/// Row for line item queries
#[derive(Debug, FromRow)]
struct LineRow {
    order_id: i32,
    product_id: i32,
    size_id: Option<i32>,
    quantity: i32,
}

impl From<LineRow> for ConsumptionLine {
    fn from(row: LineRow) -> Self {
        ConsumptionLine {
            order_id: row.order_id,
            product_id: row.product_id,
            size_id: row.size_id,
            quantity: row.quantity,
        }
    }
}

/// Consumption report entry with material details
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionReportRow {
    pub material_id: i32,
    pub material_name: String,
    pub material_code: String,
    pub unit: String,
    pub consumed: Decimal,
}

impl ConsumptionService {
    pub fn new(db: PgPool) -> Self {
        Self {
            recipes: RecipeService::new(db.clone()),
            db,
        }
    }

    /// Line items of orders in `statuses` created inside `window`
    async fn load_lines(
        &self,
        window: TimeWindow,
        statuses: &[OrderStatus],
    ) -> AppResult<Vec<ConsumptionLine>> {
        let rows = sqlx::query_as::<_, LineRow>(
            r#"
            SELECT od.order_id, od.product_id, od.size_id, od.quantity
            FROM order_details od
            JOIN orders o ON o.id = od.order_id
            WHERE o.status = ANY($1)
              AND o.created_at >= $2
              AND o.created_at < $3
            "#,
        )
        .bind(status_strings(statuses))
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(ConsumptionLine::from).collect())
    }

    /// Total consumption per material for orders in `statuses` inside `window`.
    ///
    /// Recipes are batch-loaded once for every product in the window before
    /// aggregating.
    pub async fn consumption_between(
        &self,
        window: TimeWindow,
        statuses: &[OrderStatus],
    ) -> AppResult<ConsumptionMap> {
        let lines = self.load_lines(window, statuses).await?;
        let book = self.recipes.load_book(&product_ids(&lines)).await?;
        let totals = aggregate_consumption(&lines, &book);

        tracing::debug!(
            "Aggregated {} line items into {} materials for {} .. {}",
            lines.len(),
            totals.len(),
            window.start,
            window.end
        );

        Ok(totals)
    }

    /// Operational consumption for one day
    pub async fn consumption_for_date(&self, date: NaiveDate) -> AppResult<DailyConsumption> {
        let totals = self
            .consumption_between(TimeWindow::day(date), CONSUMPTION_STATUSES)
            .await?;

        Ok(DailyConsumption {
            date,
            consumption: to_rows(&totals),
        })
    }

    /// Consumption over a date range with material names, for reporting
    pub async fn consumption_report(
        &self,
        range: DateRange,
    ) -> AppResult<Vec<ConsumptionReportRow>> {
        let totals = self
            .consumption_between(range.window(), CONSUMPTION_STATUSES)
            .await?;
        let ids: Vec<i32> = totals.keys().copied().collect();
        let details = MaterialService::new(self.db.clone()).details(&ids).await?;

        Ok(totals
            .into_iter()
            .map(|(material_id, consumed)| {
                let detail = details.get(&material_id);
                ConsumptionReportRow {
                    material_id,
                    material_name: detail.map(|d| d.name.clone()).unwrap_or_default(),
                    material_code: detail.map(|d| d.code.clone()).unwrap_or_default(),
                    unit: detail.map(|d| d.unit.clone()).unwrap_or_default(),
                    consumed: consumed.normalize(),
                }
            })
            .collect())
    }

    /// Recompute and store the consumption of a single order.
    ///
    /// Replaces whatever was stored for the order, so running it again for
    /// the same order yields the same rows. Orders outside the consumption
    /// statuses end up with no rows.
    pub async fn record_order_consumption(&self, order_id: i32) -> AppResult<ConsumptionMap> {
        let status = sqlx::query_scalar::<_, String>("SELECT status FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {}", order_id)))?;

        let status: OrderStatus = status
            .parse()
            .map_err(|e: shared::models::UnknownOrderStatus| AppError::Internal(e.to_string()))?;

        let totals = if CONSUMPTION_STATUSES.contains(&status) {
            let lines: Vec<ConsumptionLine> = sqlx::query_as::<_, LineRow>(
                r#"
                SELECT order_id, product_id, size_id, quantity
                FROM order_details
                WHERE order_id = $1
                "#,
            )
            .bind(order_id)
            .fetch_all(&self.db)
            .await?
            .into_iter()
            .map(ConsumptionLine::from)
            .collect();

            let book = self.recipes.load_book(&product_ids(&lines)).await?;
            aggregate_consumption(&lines, &book)
        } else {
            ConsumptionMap::new()
        };

        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM order_material_consumptions WHERE order_id = $1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        for (material_id, consumed) in &totals {
            sqlx::query(
                r#"
                INSERT INTO order_material_consumptions (order_id, material_id, consumed)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(order_id)
            .bind(material_id)
            .bind(consumed)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            "Recorded consumption of {} materials for order {} ({})",
            totals.len(),
            order_id,
            status
        );

        Ok(totals)
    }
}

#[async_trait]
impl OrderConsumptionRecorder for ConsumptionService {
    async fn record_order_consumption(&self, order_id: i32) -> AppResult<()> {
        ConsumptionService::record_order_consumption(self, order_id)
            .await
            .map(|_| ())
    }
}
