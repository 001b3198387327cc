//! HTTP handlers for recipe resolution

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::services::recipe::{RecipeService, ResolvedRecipe};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveQuery {
    pub size_id: Option<i32>,
}

/// Material usage of one unit of a product in a size
pub async fn resolve_recipe(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
    Query(query): Query<ResolveQuery>,
) -> AppResult<Json<ResolvedRecipe>> {
    let service = RecipeService::new(state.db);
    let resolved = service.resolve(product_id, query.size_id).await?;
    Ok(Json(resolved))
}
