//! Material catalogue with derived stock on hand

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use shared::ledger::Availability;
use shared::models::UnitClass;

use crate::error::{AppError, AppResult};

/// Material service
#[derive(Clone)]
pub struct MaterialService {
    db: PgPool,
}

/// Name, code and unit symbol of a material
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MaterialDetails {
    pub id: i32,
    pub name: String,
    pub code: String,
    pub unit: String,
}

#[derive(Debug, FromRow)]
struct StockRow {
    id: i32,
    name: String,
    code: String,
    unit: String,
    unit_class: String,
    last_remain: Decimal,
    last_remain_date: Option<NaiveDate>,
    imported_since: Decimal,
}

/// Material with its stock on hand as of a date
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialStock {
    pub id: i32,
    pub name: String,
    pub code: String,
    pub unit: String,
    pub unit_class: Option<UnitClass>,
    pub last_remain_date: Option<NaiveDate>,
    pub current_remain: Decimal,
}

impl From<StockRow> for MaterialStock {
    fn from(row: StockRow) -> Self {
        let balance = Availability {
            last_remain: row.last_remain,
            imported_since: row.imported_since,
            contracted: Decimal::ZERO,
        };
        MaterialStock {
            id: row.id,
            name: row.name,
            code: row.code,
            unit: row.unit,
            unit_class: UnitClass::parse(&row.unit_class),
            last_remain_date: row.last_remain_date,
            current_remain: balance.on_hand(),
        }
    }
}

// Latest snapshot on or before $1 plus imports after it, up to $1
const STOCK_QUERY: &str = r#"
    SELECT m.id, m.name, m.code, u.symbol AS unit, u.class AS unit_class,
           COALESCE(r.quantity, 0) AS last_remain,
           r.remain_date AS last_remain_date,
           COALESCE((
               SELECT SUM(mi.quantity)
               FROM material_importations mi
               WHERE mi.material_id = m.id
                 AND mi.import_date <= $1
                 AND (r.remain_date IS NULL OR mi.import_date > r.remain_date)
           ), 0) AS imported_since
    FROM materials m
    JOIN units u ON u.id = m.unit_id
    LEFT JOIN LATERAL (
        SELECT quantity, remain_date
        FROM material_remains
        WHERE material_id = m.id AND remain_date <= $1
        ORDER BY remain_date DESC
        LIMIT 1
    ) r ON true
"#;

impl MaterialService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Stock on hand of every material as of `as_of`
    pub async fn list_materials(&self, as_of: NaiveDate) -> AppResult<Vec<MaterialStock>> {
        let query = format!("{} ORDER BY m.name", STOCK_QUERY);
        let rows = sqlx::query_as::<_, StockRow>(&query)
            .bind(as_of)
            .fetch_all(&self.db)
            .await?;

        Ok(rows.into_iter().map(MaterialStock::from).collect())
    }

    pub async fn get_material(&self, id: i32, as_of: NaiveDate) -> AppResult<MaterialStock> {
        let query = format!("{} WHERE m.id = $2", STOCK_QUERY);
        sqlx::query_as::<_, StockRow>(&query)
            .bind(as_of)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .map(MaterialStock::from)
            .ok_or_else(|| AppError::NotFound("Material".to_string()))
    }

    /// Details of the given materials keyed by id; unknown ids are skipped
    pub async fn details(&self, ids: &[i32]) -> AppResult<HashMap<i32, MaterialDetails>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, MaterialDetails>(
            r#"
            SELECT m.id, m.name, m.code, u.symbol AS unit
            FROM materials m
            JOIN units u ON u.id = m.unit_id
            WHERE m.id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(|d| (d.id, d)).collect())
    }

    /// Count of materials with nothing on hand as of `as_of`
    pub async fn depleted_count(&self, as_of: NaiveDate) -> AppResult<i64> {
        let stock = self.list_materials(as_of).await?;
        Ok(stock
            .iter()
            .filter(|m| m.current_remain.is_zero())
            .count() as i64)
    }
}
