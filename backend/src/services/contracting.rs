//! Contracting ledger: daily requisitions, availability and leftover snapshots

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use validator::{Validate, ValidationError};

use shared::consumption::consumed_of;
use shared::ledger::{check_allocation, remaining_after, Availability};
use shared::models::{
    Contracting, DailyRemaining, MaterialRemain, RemainingResult, CONSUMPTION_STATUSES,
};
use shared::types::TimeWindow;
use shared::validation::{validate_positive_quantity, validate_remain_quantity};

use crate::error::{AppError, AppResult};
use crate::services::consumption::ConsumptionService;

/// Contracting service for allocating material to a business day
#[derive(Clone)]
pub struct ContractingService {
    db: PgPool,
    consumption: ConsumptionService,
}

fn positive_quantity(quantity: &Decimal) -> Result<(), ValidationError> {
    validate_positive_quantity(*quantity).map_err(|msg| {
        let mut err = ValidationError::new("positive_quantity");
        err.message = Some(msg.into());
        err
    })
}

fn remain_quantity(quantity: &Decimal) -> Result<(), ValidationError> {
    validate_remain_quantity(*quantity).map_err(|msg| {
        let mut err = ValidationError::new("remain_quantity");
        err.message = Some(msg.into());
        err
    })
}

/// Input for creating a contracting
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateContractingInput {
    pub date: NaiveDate,
    #[validate(range(min = 1, message = "Material id must be positive"))]
    pub material_id: i32,
    #[validate(custom = "positive_quantity")]
    pub quantity: Decimal,
    pub employee_id: Option<i32>,
}

/// Input for changing the quantity of an open contracting
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContractingInput {
    #[validate(custom = "positive_quantity")]
    pub quantity: Decimal,
    pub employee_id: Option<i32>,
}

/// Input for recording a leftover snapshot
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordRemainInput {
    #[validate(range(min = 1, message = "Material id must be positive"))]
    pub material_id: i32,
    pub date: NaiveDate,
    #[validate(custom = "remain_quantity")]
    pub quantity: Decimal,
}

/// Availability of a material for a day, with the figures behind it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableQuantity {
    pub material_id: i32,
    pub date: NaiveDate,
    pub unit: String,
    pub last_remain_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub breakdown: Availability,
    pub available: Decimal,
}

/// Contracting row joined with its material, for reconciliation
#[derive(Debug, FromRow)]
struct ContractedRow {
    material_id: i32,
    name: String,
    code: String,
    unit: String,
    quantity: Decimal,
}

const CONTRACTING_COLUMNS: &str =
    "id, material_id, contract_date, quantity, employee_id, created_at, updated_at";

/// Availability figures of `material_id` for `date`, read on `conn`.
///
/// `exclude` leaves one contracting out of the contracted total, so an
/// update can be checked against everything except its own allocation.
async fn load_availability(
    conn: &mut PgConnection,
    material_id: i32,
    date: NaiveDate,
    exclude: Option<i32>,
) -> AppResult<(Availability, Option<NaiveDate>)> {
    let snapshot = sqlx::query_as::<_, (Decimal, NaiveDate)>(
        r#"
        SELECT quantity, remain_date
        FROM material_remains
        WHERE material_id = $1 AND remain_date < $2
        ORDER BY remain_date DESC
        LIMIT 1
        "#,
    )
    .bind(material_id)
    .bind(date)
    .fetch_optional(&mut *conn)
    .await?;

    let (last_remain, snapshot_date) = match snapshot {
        Some((quantity, remain_date)) => (quantity, Some(remain_date)),
        None => (Decimal::ZERO, None),
    };

    let imported_since = sqlx::query_scalar::<_, Decimal>(
        r#"
        SELECT COALESCE(SUM(quantity), 0)
        FROM material_importations
        WHERE material_id = $1
          AND import_date <= $2
          AND ($3::date IS NULL OR import_date > $3)
        "#,
    )
    .bind(material_id)
    .bind(date)
    .bind(snapshot_date)
    .fetch_one(&mut *conn)
    .await?;

    let contracted = sqlx::query_scalar::<_, Decimal>(
        r#"
        SELECT COALESCE(SUM(quantity), 0)
        FROM contractings
        WHERE material_id = $1
          AND contract_date = $2
          AND ($3::int IS NULL OR id <> $3)
        "#,
    )
    .bind(material_id)
    .bind(date)
    .bind(exclude)
    .fetch_one(&mut *conn)
    .await?;

    Ok((
        Availability {
            last_remain,
            imported_since,
            contracted,
        },
        snapshot_date,
    ))
}

/// Lock the material row for the rest of the transaction and return its unit symbol
async fn lock_material(conn: &mut PgConnection, material_id: i32) -> AppResult<String> {
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT u.symbol
        FROM materials m
        JOIN units u ON u.id = m.unit_id
        WHERE m.id = $1
        FOR UPDATE OF m
        "#,
    )
    .bind(material_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Material".to_string()))
}

async fn upsert_remain(
    conn: &mut PgConnection,
    material_id: i32,
    date: NaiveDate,
    quantity: Decimal,
) -> AppResult<MaterialRemain> {
    let (material_id, remain_date, quantity) = sqlx::query_as::<_, (i32, NaiveDate, Decimal)>(
        r#"
        INSERT INTO material_remains (material_id, remain_date, quantity)
        VALUES ($1, $2, $3)
        ON CONFLICT (material_id, remain_date)
        DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = NOW()
        RETURNING material_id, remain_date, quantity
        "#,
    )
    .bind(material_id)
    .bind(date)
    .bind(quantity)
    .fetch_one(&mut *conn)
    .await?;

    Ok(MaterialRemain {
        material_id,
        remain_date,
        quantity,
    })
}

#[derive(Debug, FromRow)]
struct ContractingRow {
    id: i32,
    material_id: i32,
    contract_date: NaiveDate,
    quantity: Decimal,
    employee_id: Option<i32>,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

impl From<ContractingRow> for Contracting {
    fn from(row: ContractingRow) -> Self {
        Contracting {
            id: row.id,
            material_id: row.material_id,
            contract_date: row.contract_date,
            quantity: row.quantity,
            employee_id: row.employee_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl ContractingService {
    pub fn new(db: PgPool) -> Self {
        Self {
            consumption: ConsumptionService::new(db.clone()),
            db,
        }
    }

    /// Quantity of a material that can still be contracted for `date`
    pub async fn available_quantity(
        &self,
        material_id: i32,
        date: NaiveDate,
    ) -> AppResult<AvailableQuantity> {
        let mut conn = self.db.acquire().await?;

        let unit = sqlx::query_scalar::<_, String>(
            r#"
            SELECT u.symbol
            FROM materials m
            JOIN units u ON u.id = m.unit_id
            WHERE m.id = $1
            "#,
        )
        .bind(material_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Material".to_string()))?;

        let (breakdown, last_remain_date) =
            load_availability(&mut conn, material_id, date, None).await?;

        Ok(AvailableQuantity {
            material_id,
            date,
            unit,
            last_remain_date,
            available: breakdown.available(),
            breakdown,
        })
    }

    /// Allocate material to a day.
    ///
    /// The material row stays locked from the availability read until the
    /// insert commits, so concurrent requests for the same material are
    /// checked one after the other.
    pub async fn create(&self, input: CreateContractingInput) -> AppResult<Contracting> {
        input.validate()?;

        let mut tx = self.db.begin().await?;
        let unit = lock_material(&mut tx, input.material_id).await?;

        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM contractings WHERE material_id = $1 AND contract_date = $2
            )
            "#,
        )
        .bind(input.material_id)
        .bind(input.date)
        .fetch_one(&mut *tx)
        .await?;

        if exists {
            return Err(AppError::contracting_exists(input.material_id, input.date));
        }

        let (availability, _) =
            load_availability(&mut tx, input.material_id, input.date, None).await?;
        check_allocation(input.quantity, availability.available(), &unit)?;

        let query = format!(
            r#"
            INSERT INTO contractings (material_id, contract_date, quantity, employee_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            CONTRACTING_COLUMNS
        );
        let row = sqlx::query_as::<_, ContractingRow>(&query)
            .bind(input.material_id)
            .bind(input.date)
            .bind(input.quantity)
            .bind(input.employee_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match AppError::from(e) {
                AppError::Conflict(_) => {
                    AppError::contracting_exists(input.material_id, input.date)
                }
                other => other,
            })?;

        tx.commit().await?;

        tracing::info!(
            "Contracted {} {} of material {} for {}",
            row.quantity,
            unit,
            row.material_id,
            row.contract_date
        );

        Ok(row.into())
    }

    /// Change the quantity of a contracting while its day is still open
    pub async fn update(&self, id: i32, input: UpdateContractingInput) -> AppResult<Contracting> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        let (material_id, contract_date) = sqlx::query_as::<_, (i32, NaiveDate)>(
            "SELECT material_id, contract_date FROM contractings WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Contracting".to_string()))?;

        if contract_date < Utc::now().date_naive() {
            return Err(AppError::contracting_closed(contract_date));
        }

        let unit = lock_material(&mut tx, material_id).await?;
        let (availability, _) =
            load_availability(&mut tx, material_id, contract_date, Some(id)).await?;
        check_allocation(input.quantity, availability.available(), &unit)?;

        let query = format!(
            r#"
            UPDATE contractings
            SET quantity = $2, employee_id = COALESCE($3, employee_id), updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CONTRACTING_COLUMNS
        );
        let row = sqlx::query_as::<_, ContractingRow>(&query)
            .bind(id)
            .bind(input.quantity)
            .bind(input.employee_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!("Updated contracting {} to {} {}", id, row.quantity, unit);

        Ok(row.into())
    }

    pub async fn get(&self, id: i32) -> AppResult<Contracting> {
        let query = format!("SELECT {} FROM contractings WHERE id = $1", CONTRACTING_COLUMNS);
        sqlx::query_as::<_, ContractingRow>(&query)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .map(Contracting::from)
            .ok_or_else(|| AppError::NotFound("Contracting".to_string()))
    }

    pub async fn list_by_date(&self, date: NaiveDate) -> AppResult<Vec<Contracting>> {
        let query = format!(
            "SELECT {} FROM contractings WHERE contract_date = $1 ORDER BY material_id",
            CONTRACTING_COLUMNS
        );
        let rows = sqlx::query_as::<_, ContractingRow>(&query)
            .bind(date)
            .fetch_all(&self.db)
            .await?;

        Ok(rows.into_iter().map(Contracting::from).collect())
    }

    /// Record the leftover of a material at the end of `date`; recording the
    /// same material and day again overwrites the earlier snapshot
    pub async fn record_remain(&self, input: RecordRemainInput) -> AppResult<MaterialRemain> {
        input.validate()?;

        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM materials WHERE id = $1)")
                .bind(input.material_id)
                .fetch_one(&self.db)
                .await?;

        if !exists {
            return Err(AppError::NotFound("Material".to_string()));
        }

        let mut conn = self.db.acquire().await?;
        let remain = upsert_remain(&mut conn, input.material_id, input.date, input.quantity).await?;

        tracing::info!(
            "Recorded remain of material {} on {}: {}",
            remain.material_id,
            remain.remain_date,
            remain.quantity
        );

        Ok(remain)
    }

    /// Reconcile the day's contractings against actual consumption.
    ///
    /// With `auto_record` every leftover is stored as that day's snapshot in
    /// a single transaction.
    pub async fn calculate_remaining(
        &self,
        date: NaiveDate,
        auto_record: bool,
    ) -> AppResult<DailyRemaining> {
        let contracted = sqlx::query_as::<_, ContractedRow>(
            r#"
            SELECT c.material_id, m.name, m.code, u.symbol AS unit, c.quantity
            FROM contractings c
            JOIN materials m ON m.id = c.material_id
            JOIN units u ON u.id = m.unit_id
            WHERE c.contract_date = $1
            ORDER BY c.material_id
            "#,
        )
        .bind(date)
        .fetch_all(&self.db)
        .await?;

        let consumption = self
            .consumption
            .consumption_between(TimeWindow::day(date), CONSUMPTION_STATUSES)
            .await?;

        let results: Vec<RemainingResult> = contracted
            .into_iter()
            .map(|row| {
                let actual_consumed = consumed_of(&consumption, row.material_id);
                RemainingResult {
                    material_id: row.material_id,
                    material_name: row.name,
                    material_code: row.code,
                    unit: row.unit,
                    contracted_quantity: row.quantity,
                    actual_consumed,
                    remaining: remaining_after(row.quantity, actual_consumed),
                }
            })
            .collect();

        if auto_record && !results.is_empty() {
            let mut tx = self.db.begin().await?;
            for result in &results {
                upsert_remain(&mut tx, result.material_id, date, result.remaining).await?;
            }
            tx.commit().await?;

            tracing::info!("Recorded {} remains for {}", results.len(), date);
        }

        Ok(DailyRemaining { date, results })
    }
}
