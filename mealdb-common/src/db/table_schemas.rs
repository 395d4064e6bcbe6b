//! Table Schema Definitions
//!
//! Single source of truth for the recipe store schema. Each struct defines
//! one table; `schema_statements` renders them in dependency order.

use crate::db::schema::{
    create_index_sql, create_table_sql, ColumnDefinition, ColumnType, ForeignKey,
    IndexDefinition, SqlDialect, TableSchema,
};

/// All tables, parents before children
pub const TABLE_NAMES: [&str; 5] = ["meals", "ingredients", "categories", "areas", "etl_logs"];

/// Recipes keyed by their external identifier
pub struct MealsTableSchema;

impl TableSchema for MealsTableSchema {
    fn table_name() -> &'static str {
        "meals"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", ColumnType::Key).primary_key(),
            ColumnDefinition::new("meal_name", ColumnType::ShortText).not_null(),
            ColumnDefinition::new("category", ColumnType::ShortText),
            ColumnDefinition::new("area", ColumnType::ShortText),
            ColumnDefinition::new("instructions", ColumnType::LongText),
            ColumnDefinition::new("meal_thumb", ColumnType::LongText),
            // Comma-joined tag list
            ColumnDefinition::new("tags", ColumnType::LongText),
            ColumnDefinition::new("youtube", ColumnType::LongText),
            ColumnDefinition::new("source", ColumnType::LongText),
            ColumnDefinition::new("image_source", ColumnType::LongText),
            ColumnDefinition::new("creative_commons_confirmed", ColumnType::ShortText),
            ColumnDefinition::new("date_modified", ColumnType::Timestamp),
            ColumnDefinition::new("created_at", ColumnType::Timestamp).not_null(),
            ColumnDefinition::new("updated_at", ColumnType::Timestamp).not_null(),
        ]
    }

    fn indexes() -> Vec<IndexDefinition> {
        vec![
            IndexDefinition {
                name: "idx_meals_category",
                columns: &["category"],
            },
            IndexDefinition {
                name: "idx_meals_area",
                columns: &["area"],
            },
            IndexDefinition {
                name: "idx_meals_name",
                columns: &["meal_name"],
            },
        ]
    }
}

/// Ingredient lines, removed together with their meal
pub struct IngredientsTableSchema;

impl TableSchema for IngredientsTableSchema {
    fn table_name() -> &'static str {
        "ingredients"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", ColumnType::AutoId),
            ColumnDefinition::new("meal_id", ColumnType::Key).not_null(),
            ColumnDefinition::new("ingredient_name", ColumnType::ShortText).not_null(),
            ColumnDefinition::new("measurement", ColumnType::ShortText),
            ColumnDefinition::new("ingredient_order", ColumnType::BigInt).not_null(),
        ]
    }

    fn foreign_keys() -> Vec<ForeignKey> {
        vec![ForeignKey {
            column: "meal_id",
            references_table: "meals",
            references_column: "id",
            on_delete_cascade: true,
        }]
    }

    fn indexes() -> Vec<IndexDefinition> {
        vec![IndexDefinition {
            name: "idx_ingredients_meal_id",
            columns: &["meal_id"],
        }]
    }
}

pub struct CategoriesTableSchema;

impl TableSchema for CategoriesTableSchema {
    fn table_name() -> &'static str {
        "categories"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", ColumnType::AutoId),
            ColumnDefinition::new("category_name", ColumnType::ShortText)
                .not_null()
                .unique(),
            ColumnDefinition::new("category_thumb", ColumnType::LongText),
            ColumnDefinition::new("category_description", ColumnType::LongText),
        ]
    }
}

pub struct AreasTableSchema;

impl TableSchema for AreasTableSchema {
    fn table_name() -> &'static str {
        "areas"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", ColumnType::AutoId),
            ColumnDefinition::new("area_name", ColumnType::ShortText)
                .not_null()
                .unique(),
        ]
    }
}

/// Append-only pipeline run log
pub struct EtlLogsTableSchema;

impl TableSchema for EtlLogsTableSchema {
    fn table_name() -> &'static str {
        "etl_logs"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", ColumnType::AutoId),
            ColumnDefinition::new("operation_type", ColumnType::ShortText).not_null(),
            ColumnDefinition::new("status", ColumnType::ShortText).not_null(),
            ColumnDefinition::new("records_processed", ColumnType::BigInt)
                .not_null()
                .default("0"),
            ColumnDefinition::new("error_message", ColumnType::LongText),
            // Seconds
            ColumnDefinition::new("execution_time", ColumnType::Real)
                .not_null()
                .default("0"),
            ColumnDefinition::new("created_at", ColumnType::Timestamp).not_null(),
        ]
    }

    fn indexes() -> Vec<IndexDefinition> {
        vec![IndexDefinition {
            name: "idx_etl_logs_created_at",
            columns: &["created_at"],
        }]
    }
}

fn statements_for<T: TableSchema>(dialect: SqlDialect, out: &mut Vec<String>) {
    out.push(create_table_sql::<T>(dialect));
    out.extend(create_index_sql::<T>(dialect));
}

/// Every DDL statement needed for an empty database, in execution order
pub fn schema_statements(dialect: SqlDialect) -> Vec<String> {
    let mut statements = Vec::new();
    statements_for::<MealsTableSchema>(dialect, &mut statements);
    statements_for::<IngredientsTableSchema>(dialect, &mut statements);
    statements_for::<CategoriesTableSchema>(dialect, &mut statements);
    statements_for::<AreasTableSchema>(dialect, &mut statements);
    statements_for::<EtlLogsTableSchema>(dialect, &mut statements);
    statements
}

// ============================================================================
// Tests
// ============================================================================
