//! Recipe models and resolution of per-unit material usage

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One line of a recipe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRecipe {
    pub material_id: i32,
    /// Quantity consumed per unit sold, in the material's unit
    pub consume: Decimal,
    /// `None` is the default row, applied to every size without an override
    pub size_id: Option<i32>,
}

/// The single recipe owned by a product
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub product_id: i32,
    pub components: Vec<MaterialRecipe>,
}

/// Material usage for one unit of a product
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecipeComponent {
    pub material_id: i32,
    pub per_unit: Decimal,
}

impl Recipe {
    pub fn new(product_id: i32, components: Vec<MaterialRecipe>) -> Self {
        Self {
            product_id,
            components,
        }
    }

    /// Resolve the components applicable to one unit sold in `size_id`.
    ///
    /// Rows without a size apply to every size. When a material has both a
    /// default row and a row for the requested size, the size-specific row
    /// wins regardless of row order. Output is ordered by material id.
    pub fn resolve(&self, size_id: Option<i32>) -> Vec<RecipeComponent> {
        // material -> (per_unit, is_size_specific)
        let mut picked: BTreeMap<i32, (Decimal, bool)> = BTreeMap::new();

        for row in &self.components {
            let specific = match row.size_id {
                None => false,
                Some(s) if Some(s) == size_id => true,
                Some(_) => continue,
            };

            match picked.get(&row.material_id) {
                Some((_, true)) if !specific => {}
                _ => {
                    picked.insert(row.material_id, (row.consume, specific));
                }
            }
        }

        picked
            .into_iter()
            .map(|(material_id, (per_unit, _))| RecipeComponent {
                material_id,
                per_unit,
            })
            .collect()
    }

    /// Distinct materials referenced by any row
    pub fn material_ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self.components.iter().map(|c| c.material_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// Recipes keyed by product, loaded once per computation
#[derive(Debug, Clone, Default)]
pub struct RecipeBook {
    recipes: HashMap<i32, Recipe>,
}

impl RecipeBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, recipe: Recipe) {
        self.recipes.insert(recipe.product_id, recipe);
    }

    /// Add a single recipe row, creating the product's recipe on first use
    pub fn push_row(&mut self, product_id: i32, row: MaterialRecipe) {
        self.recipes
            .entry(product_id)
            .or_insert_with(|| Recipe::new(product_id, Vec::new()))
            .components
            .push(row);
    }

    pub fn get(&self, product_id: i32) -> Option<&Recipe> {
        self.recipes.get(&product_id)
    }

    /// Products without a recipe resolve to nothing; that is not an error.
    pub fn resolve(&self, product_id: i32, size_id: Option<i32>) -> Vec<RecipeComponent> {
        self.recipes
            .get(&product_id)
            .map(|r| r.resolve(size_id))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

impl FromIterator<Recipe> for RecipeBook {
    fn from_iter<I: IntoIterator<Item = Recipe>>(iter: I) -> Self {
        let mut book = RecipeBook::new();
        for recipe in iter {
            book.insert(recipe);
        }
        book
    }
}
