//! Repository: persisted recipes, reference values and run logs
//!
//! All SQL uses `?` placeholders and portable syntax so the same statements
//! run on both engines. A recipe, its reference rows and its ingredient
//! lines are written in one transaction; dropping an uncommitted
//! transaction rolls it back.

use crate::error::{EtlError, EtlResult};
use crate::models::{
    BreakdownEntry, CategoryInfo, EntityCounts, IngredientLine, MealFilter, OperationLogEntry,
    Recipe, StoredLogEntry, StoredRecipe, TableSummary, UpsertOutcome,
};
use mealdb_common::config::DatabaseSection;
use mealdb_common::db::{self, Database, SchemaIntrospector, SqlDialect, TABLE_NAMES};
use mealdb_common::time::{db_now, format_db_timestamp, parse_db_timestamp};
use sqlx::any::AnyRow;
use sqlx::{Any, Row, Transaction};
use std::collections::HashSet;
use tracing::{debug, info};

const MEAL_COLUMNS: &str = "id, meal_name, category, area, instructions, meal_thumb, tags, \
     youtube, source, image_source, creative_commons_confirmed, date_modified, created_at, \
     updated_at";

/// Escape character for LIKE patterns
const LIKE_ESCAPE: char = '!';

/// Store handle passed to the pipeline and the dashboard
#[derive(Debug, Clone)]
pub struct Repository {
    db: Database,
}

impl Repository {
    /// Connect and make sure the schema exists
    ///
    /// Connection problems are configuration errors; schema creation
    /// problems are storage errors.
    pub async fn open(section: &DatabaseSection) -> EtlResult<Self> {
        let database = db::connect(section).await.map_err(|e| {
            EtlError::Configuration(format!(
                "Cannot open database {}: {}",
                section.display_target(),
                e
            ))
        })?;

        db::init_schema(&database)
            .await
            .map_err(|e| EtlError::Storage(format!("Schema initialization failed: {}", e)))?;

        Ok(Self::new(database))
    }

    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn dialect(&self) -> SqlDialect {
        self.db.dialect()
    }

    pub async fn close(&self) {
        self.db.close().await;
    }

    pub async fn exists(&self, id: &str) -> EtlResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM meals WHERE id = ?")
            .bind(id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(count > 0)
    }

    /// Every stored recipe identifier
    pub async fn existing_ids(&self) -> EtlResult<HashSet<String>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM meals")
            .fetch_all(self.db.pool())
            .await?;
        Ok(ids.into_iter().collect())
    }

    /// Insert or update a recipe and replace its ingredient lines
    ///
    /// On update `created_at` is preserved and `updated_at` refreshed.
    pub async fn upsert(
        &self,
        recipe: &Recipe,
        lines: &[IngredientLine],
    ) -> EtlResult<UpsertOutcome> {
        if let Some(line) = lines.iter().find(|l| l.meal_id != recipe.id) {
            return Err(EtlError::Validation(format!(
                "Ingredient line for meal {} passed with meal {}",
                line.meal_id, recipe.id
            )));
        }

        let now = db_now();
        let tags = recipe.joined_tags();
        let date_modified = recipe.date_modified.as_ref().map(format_db_timestamp);

        let mut tx = self.db.pool().begin().await?;

        if let Some(category) = &recipe.category {
            ensure_reference(&mut tx, "categories", "category_name", category).await?;
        }
        if let Some(area) = &recipe.area {
            ensure_reference(&mut tx, "areas", "area_name", area).await?;
        }

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM meals WHERE id = ?")
            .bind(&recipe.id)
            .fetch_one(&mut *tx)
            .await?;

        let outcome = if existing > 0 {
            sqlx::query(
                r#"
                UPDATE meals SET
                    meal_name = ?, category = ?, area = ?, instructions = ?, meal_thumb = ?,
                    tags = ?, youtube = ?, source = ?, image_source = ?,
                    creative_commons_confirmed = ?, date_modified = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&recipe.name)
            .bind(&recipe.category)
            .bind(&recipe.area)
            .bind(&recipe.instructions)
            .bind(&recipe.thumbnail)
            .bind(&tags)
            .bind(&recipe.youtube)
            .bind(&recipe.source)
            .bind(&recipe.image_source)
            .bind(&recipe.creative_commons_confirmed)
            .bind(&date_modified)
            .bind(&now)
            .bind(&recipe.id)
            .execute(&mut *tx)
            .await?;

            sqlx::query("DELETE FROM ingredients WHERE meal_id = ?")
                .bind(&recipe.id)
                .execute(&mut *tx)
                .await?;

            UpsertOutcome::Updated
        } else {
            sqlx::query(&format!(
                "INSERT INTO meals ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                MEAL_COLUMNS
            ))
            .bind(&recipe.id)
            .bind(&recipe.name)
            .bind(&recipe.category)
            .bind(&recipe.area)
            .bind(&recipe.instructions)
            .bind(&recipe.thumbnail)
            .bind(&tags)
            .bind(&recipe.youtube)
            .bind(&recipe.source)
            .bind(&recipe.image_source)
            .bind(&recipe.creative_commons_confirmed)
            .bind(&date_modified)
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

            UpsertOutcome::Inserted
        };

        for line in lines {
            sqlx::query(
                "INSERT INTO ingredients (meal_id, ingredient_name, measurement, ingredient_order) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(&recipe.id)
            .bind(&line.name)
            .bind(&line.measurement)
            .bind(i64::from(line.position))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(
            meal_id = %recipe.id,
            ingredients = lines.len(),
            outcome = ?outcome,
            "Upserted meal"
        );

        Ok(outcome)
    }

    pub async fn get_meal(&self, id: &str) -> EtlResult<Option<StoredRecipe>> {
        let row = sqlx::query(&format!("SELECT {} FROM meals WHERE id = ?", MEAL_COLUMNS))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(recipe_from_row).transpose()
    }

    /// Recipes matching `filter`, ordered by name then id
    pub async fn query_meals(&self, filter: &MealFilter) -> EtlResult<Vec<StoredRecipe>> {
        let mut conditions = Vec::new();
        let mut params = Vec::new();

        if let Some(category) = non_blank(filter.category.as_deref()) {
            conditions.push("category = ?".to_string());
            params.push(category.to_string());
        }
        if let Some(area) = non_blank(filter.area.as_deref()) {
            conditions.push("area = ?".to_string());
            params.push(area.to_string());
        }
        if let Some(name) = non_blank(filter.name.as_deref()) {
            conditions.push(format!("LOWER(meal_name) LIKE ? ESCAPE '{}'", LIKE_ESCAPE));
            params.push(format!("%{}%", escape_like(&name.to_lowercase())));
        }

        let mut sql = format!("SELECT {} FROM meals", MEAL_COLUMNS);
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY meal_name, id LIMIT ? OFFSET ?");

        let mut query = sqlx::query(&sql);
        for param in params {
            query = query.bind(param);
        }
        let rows = query
            .bind(filter.effective_limit())
            .bind(filter.effective_offset())
            .fetch_all(self.db.pool())
            .await?;

        rows.iter().map(recipe_from_row).collect()
    }

    /// Ingredient lines of one recipe in slot order
    pub async fn ingredients_for(&self, id: &str) -> EtlResult<Vec<IngredientLine>> {
        let rows = sqlx::query(
            "SELECT meal_id, ingredient_name, measurement, ingredient_order \
             FROM ingredients WHERE meal_id = ? ORDER BY ingredient_order",
        )
        .bind(id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter()
            .map(|row| -> EtlResult<IngredientLine> {
                let position: i64 = row.try_get("ingredient_order")?;
                Ok(IngredientLine {
                    meal_id: row.try_get("meal_id")?,
                    name: row.try_get("ingredient_name")?,
                    measurement: row.try_get("measurement")?,
                    position: u32::try_from(position).map_err(|_| {
                        EtlError::Storage(format!("Invalid ingredient order {}", position))
                    })?,
                })
            })
            .collect()
    }

    /// Delete a recipe; its ingredient lines go with it
    pub async fn delete_meal(&self, id: &str) -> EtlResult<bool> {
        let result = sqlx::query("DELETE FROM meals WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(meal_id = %id, "Deleted meal");
        }
        Ok(deleted)
    }

    /// Tables of the schema with their live column lists
    ///
    /// A missing table is a storage error.
    pub async fn schema_summary(&self) -> EtlResult<Vec<TableSummary>> {
        let mut tables = Vec::with_capacity(TABLE_NAMES.len());
        for name in TABLE_NAMES {
            if !SchemaIntrospector::table_exists(self.db.pool(), self.dialect(), name).await? {
                return Err(EtlError::Storage(format!("Table {} is missing", name)));
            }
            let columns =
                SchemaIntrospector::column_names(self.db.pool(), self.dialect(), name).await?;
            tables.push(TableSummary {
                name: name.to_string(),
                columns,
            });
        }
        Ok(tables)
    }

    /// Row counts for every entity
    pub async fn get_stats(&self) -> EtlResult<EntityCounts> {
        Ok(EntityCounts {
            meals: self.count("meals").await?,
            ingredients: self.count("ingredients").await?,
            categories: self.count("categories").await?,
            areas: self.count("areas").await?,
            etl_logs: self.count("etl_logs").await?,
        })
    }

    async fn count(&self, table: &'static str) -> EtlResult<i64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    /// Append one run log entry, returning its id
    pub async fn append_log(&self, entry: &OperationLogEntry) -> EtlResult<i64> {
        let result = sqlx::query(
            "INSERT INTO etl_logs \
             (operation_type, status, records_processed, error_message, execution_time, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.operation.as_str())
        .bind(entry.status.as_str())
        .bind(entry.records_processed)
        .bind(&entry.error_message)
        .bind(entry.execution_time)
        .bind(db_now())
        .execute(self.db.pool())
        .await?;

        match result.last_insert_id() {
            Some(id) => Ok(id),
            None => {
                let id: Option<i64> = sqlx::query_scalar("SELECT MAX(id) FROM etl_logs")
                    .fetch_one(self.db.pool())
                    .await?;
                id.ok_or_else(|| EtlError::Storage("Log entry id unavailable".to_string()))
            }
        }
    }

    /// Most recent log entries first
    pub async fn recent_logs(&self, limit: i64) -> EtlResult<Vec<StoredLogEntry>> {
        let rows = sqlx::query(
            "SELECT id, operation_type, status, records_processed, error_message, \
             execution_time, created_at FROM etl_logs ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(limit.max(1))
        .fetch_all(self.db.pool())
        .await?;

        rows.iter()
            .map(|row| -> EtlResult<StoredLogEntry> {
                let operation: String = row.try_get("operation_type")?;
                let status: String = row.try_get("status")?;
                Ok(StoredLogEntry {
                    id: row.try_get("id")?,
                    entry: OperationLogEntry {
                        operation: operation.parse()?,
                        status: status.parse()?,
                        records_processed: row.try_get("records_processed")?,
                        error_message: row.try_get("error_message")?,
                        execution_time: row.try_get("execution_time")?,
                    },
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    /// Recipe counts per category, largest first
    pub async fn category_breakdown(&self) -> EtlResult<Vec<BreakdownEntry>> {
        self.breakdown("category").await
    }

    /// Recipe counts per area, largest first
    pub async fn area_breakdown(&self) -> EtlResult<Vec<BreakdownEntry>> {
        self.breakdown("area").await
    }

    async fn breakdown(&self, column: &'static str) -> EtlResult<Vec<BreakdownEntry>> {
        let sql = format!(
            "SELECT {col} AS name, COUNT(*) AS meal_count FROM meals \
             WHERE {col} IS NOT NULL GROUP BY {col} ORDER BY meal_count DESC, {col}",
            col = column
        );
        let rows = sqlx::query(&sql).fetch_all(self.db.pool()).await?;

        rows.iter()
            .map(|row| -> EtlResult<BreakdownEntry> {
                Ok(BreakdownEntry {
                    name: row.try_get("name")?,
                    count: row.try_get("meal_count")?,
                })
            })
            .collect()
    }

    /// Insert a category or refresh its thumbnail and description
    pub async fn upsert_category(&self, info: &CategoryInfo) -> EtlResult<()> {
        let mut tx = self.db.pool().begin().await?;

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE category_name = ?")
                .bind(&info.name)
                .fetch_one(&mut *tx)
                .await?;

        if existing > 0 {
            sqlx::query(
                "UPDATE categories SET category_thumb = ?, category_description = ? \
                 WHERE category_name = ?",
            )
            .bind(&info.thumbnail)
            .bind(&info.description)
            .bind(&info.name)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query(
                "INSERT INTO categories (category_name, category_thumb, category_description) \
                 VALUES (?, ?, ?)",
            )
            .bind(&info.name)
            .bind(&info.thumbnail)
            .bind(&info.description)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Create an area row if it does not exist yet
    pub async fn ensure_area(&self, name: &str) -> EtlResult<()> {
        let mut tx = self.db.pool().begin().await?;
        ensure_reference(&mut tx, "areas", "area_name", name).await?;
        tx.commit().await?;
        Ok(())
    }
}

/// Insert `value` into a unique-name reference table unless present
async fn ensure_reference(
    tx: &mut Transaction<'_, Any>,
    table: &'static str,
    column: &'static str,
    value: &str,
) -> EtlResult<()> {
    let existing: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM {} WHERE {} = ?",
        table, column
    ))
    .bind(value)
    .fetch_one(&mut **tx)
    .await?;

    if existing == 0 {
        sqlx::query(&format!("INSERT INTO {} ({}) VALUES (?)", table, column))
            .bind(value)
            .execute(&mut **tx)
            .await?;
        debug!(table, value, "Created reference value");
    }

    Ok(())
}

fn recipe_from_row(row: &AnyRow) -> EtlResult<StoredRecipe> {
    let tags: Option<String> = row.try_get("tags")?;
    let date_modified: Option<String> = row.try_get("date_modified")?;

    Ok(StoredRecipe {
        recipe: Recipe {
            id: row.try_get("id")?,
            name: row.try_get("meal_name")?,
            category: row.try_get("category")?,
            area: row.try_get("area")?,
            instructions: row.try_get("instructions")?,
            thumbnail: row.try_get("meal_thumb")?,
            tags: Recipe::split_tags(tags.as_deref()),
            youtube: row.try_get("youtube")?,
            source: row.try_get("source")?,
            image_source: row.try_get("image_source")?,
            creative_commons_confirmed: row.try_get("creative_commons_confirmed")?,
            date_modified: date_modified.as_deref().and_then(parse_db_timestamp),
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c == LIKE_ESCAPE || c == '%' || c == '_' {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}
