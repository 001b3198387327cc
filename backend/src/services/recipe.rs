//! Recipe loading and resolution

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use shared::models::{MaterialRecipe, Recipe, RecipeBook, RecipeComponent};
use shared::validation::validate_recipe_rows;

use crate::error::{AppError, AppResult};

/// Recipe service for resolving products into material usage
#[derive(Clone)]
pub struct RecipeService {
    db: PgPool,
}

/// Row for the batch recipe query
#[derive(Debug, FromRow)]
struct RecipeRow {
    product_id: i32,
    material_id: i32,
    consume: Decimal,
    size_id: Option<i32>,
}

/// Resolved usage of one unit of a product
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRecipe {
    pub product_id: i32,
    pub size_id: Option<i32>,
    pub components: Vec<RecipeComponent>,
}

impl RecipeService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Load the recipes of every product in `product_ids` with a single query
    pub async fn load_book(&self, product_ids: &[i32]) -> AppResult<RecipeBook> {
        let mut book = RecipeBook::new();
        if product_ids.is_empty() {
            return Ok(book);
        }

        let rows = sqlx::query_as::<_, RecipeRow>(
            r#"
            SELECT r.product_id, mr.material_id, mr.consume, mr.size_id
            FROM recipes r
            JOIN material_recipes mr ON mr.recipe_id = r.id
            WHERE r.product_id = ANY($1)
            ORDER BY r.product_id, mr.id
            "#,
        )
        .bind(product_ids)
        .fetch_all(&self.db)
        .await?;

        for row in rows {
            book.push_row(
                row.product_id,
                MaterialRecipe {
                    material_id: row.material_id,
                    consume: row.consume,
                    size_id: row.size_id,
                },
            );
        }

        tracing::debug!(
            "Loaded {} recipes for {} products",
            book.len(),
            product_ids.len()
        );

        Ok(book)
    }

    /// Recipe of a product; a product without one gets an empty recipe
    pub async fn get_recipe(&self, product_id: i32) -> AppResult<Recipe> {
        let product_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)",
        )
        .bind(product_id)
        .fetch_one(&self.db)
        .await?;

        if !product_exists {
            return Err(AppError::NotFound("Product".to_string()));
        }

        let book = self.load_book(&[product_id]).await?;
        let recipe = book
            .get(product_id)
            .cloned()
            .unwrap_or_else(|| Recipe::new(product_id, Vec::new()));

        if let Err(msg) = validate_recipe_rows(&recipe.components) {
            tracing::warn!("Recipe of product {} is inconsistent: {}", product_id, msg);
        }

        Ok(recipe)
    }

    /// Material usage of one unit of `product_id` sold in `size_id`
    pub async fn resolve(
        &self,
        product_id: i32,
        size_id: Option<i32>,
    ) -> AppResult<ResolvedRecipe> {
        let recipe = self.get_recipe(product_id).await?;
        Ok(ResolvedRecipe {
            product_id,
            size_id,
            components: recipe.resolve(size_id),
        })
    }
}
