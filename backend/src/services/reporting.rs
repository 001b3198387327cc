//! Reporting service for revenue, cost of goods sold and dashboard figures

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use shared::consumption::ConsumptionMap;
use shared::costing::{compute_cogs, cost_lines, ProfitReport};
use shared::models::{status_strings, OrderStatus, COGS_STATUSES, REVENUE_STATUSES};
use shared::types::{DateRange, TimeWindow};
use shared::validation::validate_date_range;

use crate::error::{AppError, AppResult};
use crate::services::consumption::ConsumptionService;
use crate::services::costing::CostBasisCalculator;
use crate::services::material::MaterialService;

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
    consumption: ConsumptionService,
    materials: MaterialService,
}

/// Report filter parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFilter {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ReportFilter {
    pub fn range(&self) -> AppResult<DateRange> {
        validate_date_range(self.start_date, self.end_date)
            .map_err(|msg| AppError::validation("startDate", msg))?;
        Ok(DateRange {
            start: self.start_date,
            end: self.end_date,
        })
    }
}

/// Cost attributed to one material over a period
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CogsLine {
    pub material_id: i32,
    pub material_name: String,
    pub unit: String,
    pub consumed: Decimal,
    pub average_cost: Decimal,
    pub cost: Decimal,
}

/// Per-material COGS breakdown
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CogsBreakdown {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub lines: Vec<CogsLine>,
    pub total_cogs: Decimal,
}

/// Dashboard figures for one day
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub date: NaiveDate,
    pub revenue: Decimal,
    pub completed_orders: i64,
    pub paid_orders: i64,
    pub contracted_materials: i64,
    pub depleted_materials: i64,
}

/// Cache parameters of the dashboard report, shared by readers and by
/// mutations that invalidate it
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DashboardKey {
    pub date: NaiveDate,
}

impl DashboardKey {
    pub const REPORT: &'static str = "dashboard";
}

impl ReportingService {
    pub fn new(db: PgPool) -> Self {
        Self {
            consumption: ConsumptionService::new(db.clone()),
            materials: MaterialService::new(db.clone()),
            db,
        }
    }

    /// Σ final_price of revenue-status orders in the window, unrounded
    pub async fn revenue(&self, window: TimeWindow) -> AppResult<Decimal> {
        let total: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(final_price), 0)
            FROM orders
            WHERE status = ANY($1)
              AND created_at >= $2
              AND created_at < $3
            "#,
        )
        .bind(status_strings(REVENUE_STATUSES))
        .bind(window.start)
        .bind(window.end)
        .fetch_one(&self.db)
        .await?;

        Ok(total)
    }

    /// Consumption of COGS-status orders and a calculator primed for it
    async fn costed_consumption(
        &self,
        window: TimeWindow,
    ) -> AppResult<(ConsumptionMap, CostBasisCalculator)> {
        let consumption = self.consumption.consumption_between(window, COGS_STATUSES).await?;
        let mut calculator = CostBasisCalculator::new(self.db.clone());
        let ids: Vec<i32> = consumption.keys().copied().collect();
        calculator.prefetch(&ids).await?;
        Ok((consumption, calculator))
    }

    /// Cost of goods sold over the window, rounded to 2 dp
    pub async fn cogs(&self, window: TimeWindow) -> AppResult<Decimal> {
        let (consumption, calculator) = self.costed_consumption(window).await?;
        Ok(compute_cogs(&consumption, calculator.memo()))
    }

    pub async fn cogs_breakdown(&self, filter: &ReportFilter) -> AppResult<CogsBreakdown> {
        let range = filter.range()?;
        let (consumption, calculator) = self.costed_consumption(range.window()).await?;
        let ids: Vec<i32> = consumption.keys().copied().collect();
        let details = self.materials.details(&ids).await?;

        let lines = cost_lines(&consumption, calculator.memo())
            .into_iter()
            .map(|line| {
                let detail = details.get(&line.material_id);
                CogsLine {
                    material_id: line.material_id,
                    material_name: detail.map(|d| d.name.clone()).unwrap_or_default(),
                    unit: detail.map(|d| d.unit.clone()).unwrap_or_default(),
                    consumed: line.consumed.normalize(),
                    average_cost: line.average_cost,
                    cost: line.cost,
                }
            })
            .collect();

        Ok(CogsBreakdown {
            start_date: range.start,
            end_date: range.end,
            lines,
            total_cogs: compute_cogs(&consumption, calculator.memo()),
        })
    }

    /// Revenue minus cost of goods sold over an inclusive date range
    pub async fn profit_on_material_import(
        &self,
        filter: &ReportFilter,
    ) -> AppResult<ProfitReport> {
        let range = filter.range()?;
        let window = range.window();

        let (total_revenue, cogs) = tokio::try_join!(self.revenue(window), self.cogs(window))?;

        tracing::debug!(
            "Profit {} .. {}: revenue {}, cogs {}",
            range.start,
            range.end,
            total_revenue,
            cogs
        );

        Ok(ProfitReport::new(range.start, range.end, total_revenue, cogs))
    }

    /// Get dashboard figures for `date`
    pub async fn dashboard_stats(&self, date: NaiveDate) -> AppResult<DashboardStats> {
        let window = TimeWindow::day(date);

        let (completed, paid): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = $1) AS completed,
                COUNT(*) FILTER (WHERE status = $2) AS paid
            FROM orders
            WHERE created_at >= $3 AND created_at < $4
            "#,
        )
        .bind(OrderStatus::Completed.as_str())
        .bind(OrderStatus::Paid.as_str())
        .bind(window.start)
        .bind(window.end)
        .fetch_one(&self.db)
        .await?;

        let contracted: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT material_id) FROM contractings WHERE contract_date = $1",
        )
        .bind(date)
        .fetch_one(&self.db)
        .await?;

        let revenue = self.revenue(window).await?;
        let depleted = self.materials.depleted_count(date).await?;

        Ok(DashboardStats {
            date,
            revenue,
            completed_orders: completed,
            paid_orders: paid,
            contracted_materials: contracted,
            depleted_materials: depleted,
        })
    }

    /// Export data to CSV format
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}

