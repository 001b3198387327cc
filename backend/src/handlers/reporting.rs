//! Reporting handlers for profit, COGS and consumption reports

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use shared::costing::ProfitReport;

use crate::cache::ReportTtl;
use crate::error::AppResult;
use crate::services::consumption::{ConsumptionReportRow, ConsumptionService};
use crate::services::reporting::{
    CogsBreakdown, DashboardKey, DashboardStats, ReportFilter, ReportingService,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub format: Option<String>, // "json" or "csv"
}

impl ReportQuery {
    fn filter(&self) -> ReportFilter {
        ReportFilter {
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub date: Option<NaiveDate>,
}

/// Revenue, COGS and profit for a date range
pub async fn get_profit_on_material_import(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<ProfitReport>> {
    let service = ReportingService::new(state.db.clone());
    let filter = query.filter();

    let report = state
        .cache
        .get_or_compute("profit-on-material-import", &filter, ReportTtl::Revenue, || {
            service.profit_on_material_import(&filter)
        })
        .await?;

    Ok(Json(report))
}

/// Per-material cost of goods sold
pub async fn get_cogs_breakdown(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<CogsBreakdown>> {
    let service = ReportingService::new(state.db.clone());
    let filter = query.filter();

    let breakdown = state
        .cache
        .get_or_compute("cogs-breakdown", &filter, ReportTtl::Revenue, || {
            service.cogs_breakdown(&filter)
        })
        .await?;

    Ok(Json(breakdown))
}

/// Material consumption over a date range, as JSON or CSV
pub async fn get_material_consumption_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> AppResult<impl IntoResponse> {
    let service = ConsumptionService::new(state.db.clone());
    let filter = query.filter();
    let range = filter.range()?;

    let data: Vec<ConsumptionReportRow> = state
        .cache
        .get_or_compute("material-consumption", &filter, ReportTtl::Consumption, || {
            service.consumption_report(range)
        })
        .await?;

    if query.format.as_deref() == Some("csv") {
        let csv = ReportingService::export_to_csv(&data)?;
        Ok((
            [
                (header::CONTENT_TYPE, "text/csv"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"material_consumption.csv\"",
                ),
            ],
            csv,
        )
            .into_response())
    } else {
        Ok(Json(data).into_response())
    }
}

/// Get dashboard figures, today unless a date is given
pub async fn get_dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Json<DashboardStats>> {
    let service = ReportingService::new(state.db.clone());
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());

    let stats = state
        .cache
        .get_or_compute(
            DashboardKey::REPORT,
            &DashboardKey { date },
            ReportTtl::Dashboard,
            || service.dashboard_stats(date),
        )
        .await?;

    Ok(Json(stats))
}
