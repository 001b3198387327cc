//! HTTP handlers for the material catalogue

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::error::AppResult;
use crate::services::material::{MaterialService, MaterialStock};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsOfQuery {
    pub as_of: Option<NaiveDate>,
}

impl AsOfQuery {
    fn date(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Utc::now().date_naive())
    }
}

/// List materials with their stock on hand
pub async fn list_materials(
    State(state): State<AppState>,
    Query(query): Query<AsOfQuery>,
) -> AppResult<Json<Vec<MaterialStock>>> {
    let service = MaterialService::new(state.db);
    let materials = service.list_materials(query.date()).await?;
    Ok(Json(materials))
}

pub async fn get_material(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<AsOfQuery>,
) -> AppResult<Json<MaterialStock>> {
    let service = MaterialService::new(state.db);
    let material = service.get_material(id, query.date()).await?;
    Ok(Json(material))
}
