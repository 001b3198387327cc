//! HTTP handlers for daily contracting and reconciliation endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use shared::models::{Contracting, DailyConsumption, DailyRemaining, MaterialRemain};

use crate::error::{AppError, AppResult};
use crate::queue::ConsumptionConsumer;
use crate::services::contracting::{
    AvailableQuantity, ContractingService, CreateContractingInput, RecordRemainInput,
    UpdateContractingInput,
};
use crate::services::reporting::DashboardKey;
use crate::services::ConsumptionService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct AutoRecordQuery {
    #[serde(rename = "autoRecord", default)]
    pub auto_record: bool,
}

#[derive(Debug, Deserialize)]
pub struct DateBody {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableQuery {
    pub material_id: i32,
    pub date: NaiveDate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedConsumption {
    pub message_id: uuid::Uuid,
    pub order_id: i32,
    pub topic: String,
}

/// Dashboard figures change with every allocation
async fn invalidate_dashboard(state: &AppState, date: NaiveDate) {
    state
        .cache
        .invalidate(DashboardKey::REPORT, &DashboardKey { date })
        .await;
}

/// Actual consumption of a day
pub async fn calculate_consumption(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> AppResult<Json<DailyConsumption>> {
    let service = ConsumptionService::new(state.db);
    let consumption = service.consumption_for_date(query.date).await?;
    Ok(Json(consumption))
}

/// Reconcile contracted against consumed quantities for a day
pub async fn calculate_remaining(
    State(state): State<AppState>,
    Query(query): Query<AutoRecordQuery>,
    Json(body): Json<DateBody>,
) -> AppResult<Json<DailyRemaining>> {
    let service = ContractingService::new(state.db.clone());
    let remaining = service.calculate_remaining(body.date, query.auto_record).await?;

    if query.auto_record {
        invalidate_dashboard(&state, body.date).await;
    }

    Ok(Json(remaining))
}

/// Create a contracting
pub async fn create_contracting(
    State(state): State<AppState>,
    Json(input): Json<CreateContractingInput>,
) -> AppResult<(StatusCode, Json<Contracting>)> {
    let service = ContractingService::new(state.db.clone());
    let contracting = service.create(input).await?;
    invalidate_dashboard(&state, contracting.contract_date).await;
    Ok((StatusCode::CREATED, Json(contracting)))
}

/// List contractings of a day
pub async fn list_contractings(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> AppResult<Json<Vec<Contracting>>> {
    let service = ContractingService::new(state.db);
    let contractings = service.list_by_date(query.date).await?;
    Ok(Json(contractings))
}

pub async fn get_contracting(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Contracting>> {
    let service = ContractingService::new(state.db);
    let contracting = service.get(id).await?;
    Ok(Json(contracting))
}

/// Change the quantity of an open contracting
pub async fn update_contracting(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<UpdateContractingInput>,
) -> AppResult<Json<Contracting>> {
    let service = ContractingService::new(state.db.clone());
    let contracting = service.update(id, input).await?;
    invalidate_dashboard(&state, contracting.contract_date).await;
    Ok(Json(contracting))
}

/// Quantity still available for contracting
pub async fn get_available_quantity(
    State(state): State<AppState>,
    Query(query): Query<AvailableQuery>,
) -> AppResult<Json<AvailableQuantity>> {
    let service = ContractingService::new(state.db);
    let available = service
        .available_quantity(query.material_id, query.date)
        .await?;
    Ok(Json(available))
}

/// Record a leftover snapshot
pub async fn record_remain(
    State(state): State<AppState>,
    Json(input): Json<RecordRemainInput>,
) -> AppResult<Json<MaterialRemain>> {
    let service = ContractingService::new(state.db.clone());
    let remain = service.record_remain(input).await?;
    invalidate_dashboard(&state, remain.remain_date).await;
    Ok(Json(remain))
}

/// Queue consumption recording for an order
pub async fn enqueue_order_consumption(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
) -> AppResult<(StatusCode, Json<QueuedConsumption>)> {
    if order_id < 1 {
        return Err(AppError::validation("orderId", "Order id must be positive"));
    }

    let topic = &state.config.queue.consumption_topic;
    let message = ConsumptionConsumer::publish(state.queue.as_ref(), topic, order_id)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to queue consumption: {}", e)))?;

    tracing::debug!("Queued consumption of order {} as {}", order_id, message.id);

    Ok((
        StatusCode::ACCEPTED,
        Json(QueuedConsumption {
            message_id: message.id,
            order_id,
            topic: message.topic,
        }),
    ))
}
