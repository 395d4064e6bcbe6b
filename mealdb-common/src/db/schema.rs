//! Declarative schema definition
//!
//! **Design:** Single source of truth - each table is described once with
//! logical column types, then rendered into DDL for the active dialect.
//! Only this module knows how SQLite and MySQL spell the same table.
//!
//! # Usage
//!
//! ```rust,ignore
//! pub struct AreasTableSchema;
//!
//! impl TableSchema for AreasTableSchema {
//!     fn table_name() -> &'static str { "areas" }
//!
//!     fn expected_columns() -> Vec<ColumnDefinition> {
//!         vec![
//!             ColumnDefinition::new("id", ColumnType::AutoId),
//!             ColumnDefinition::new("area_name", ColumnType::ShortText).not_null().unique(),
//!         ]
//!     }
//! }
//!
//! let ddl = create_table_sql::<AreasTableSchema>(SqlDialect::Mysql);
//! ```

use crate::config::StorageEngine;
use crate::Result;
use sqlx::{AnyPool, Row};

/// SQL dialect spoken by the connected engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    Sqlite,
    Mysql,
}

impl From<StorageEngine> for SqlDialect {
    fn from(engine: StorageEngine) -> Self {
        match engine {
            StorageEngine::Sqlite => SqlDialect::Sqlite,
            StorageEngine::Mysql => SqlDialect::Mysql,
        }
    }
}

impl SqlDialect {
    pub fn name(&self) -> &'static str {
        match self {
            SqlDialect::Sqlite => "sqlite",
            SqlDialect::Mysql => "mysql",
        }
    }
}

/// Logical column type, rendered per dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Auto-incrementing integer primary key
    AutoId,
    /// Short external identifier (indexable)
    Key,
    /// Bounded text (names, URLs; indexable)
    ShortText,
    /// Unbounded text (instructions, descriptions, error messages)
    LongText,
    /// 64-bit integer
    BigInt,
    /// Double precision float
    Real,
    /// `YYYY-MM-DD HH:MM:SS` text timestamp
    Timestamp,
}

impl ColumnType {
    pub fn render(self, dialect: SqlDialect) -> &'static str {
        match dialect {
            SqlDialect::Sqlite => match self {
                ColumnType::AutoId => "INTEGER PRIMARY KEY AUTOINCREMENT",
                ColumnType::Key | ColumnType::ShortText | ColumnType::LongText => "TEXT",
                ColumnType::BigInt => "INTEGER",
                ColumnType::Real => "REAL",
                ColumnType::Timestamp => "TEXT",
            },
            SqlDialect::Mysql => match self {
                ColumnType::AutoId => "BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY",
                ColumnType::Key => "VARCHAR(64)",
                ColumnType::ShortText => "VARCHAR(255)",
                ColumnType::LongText => "TEXT",
                ColumnType::BigInt => "BIGINT",
                ColumnType::Real => "DOUBLE",
                ColumnType::Timestamp => "VARCHAR(19)",
            },
        }
    }
}

/// Column definition with SQL constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    /// Column name
    pub name: String,
    /// Logical type
    pub column_type: ColumnType,
    /// NOT NULL constraint
    pub not_null: bool,
    /// PRIMARY KEY constraint
    pub primary_key: bool,
    /// UNIQUE constraint
    pub unique: bool,
    /// DEFAULT value (SQL literal)
    pub default_value: Option<String>,
}

impl ColumnDefinition {
    /// Create new column definition
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            not_null: false,
            primary_key: column_type == ColumnType::AutoId,
            unique: false,
            default_value: None,
        }
    }

    /// Mark column as PRIMARY KEY
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark column as NOT NULL
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Mark column as UNIQUE
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Set DEFAULT value
    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Column clause for CREATE TABLE
    pub fn render(&self, dialect: SqlDialect) -> String {
        let mut sql = format!("{} {}", self.name, self.column_type.render(dialect));

        // AutoId carries its own key constraints
        if self.column_type == ColumnType::AutoId {
            return sql;
        }

        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if self.unique {
            sql.push_str(" UNIQUE");
        }
        if let Some(default) = &self.default_value {
            sql.push_str(&format!(" DEFAULT {}", default));
        }
        sql
    }
}

/// Foreign key from one column of this table to another table
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references_table: &'static str,
    pub references_column: &'static str,
    pub on_delete_cascade: bool,
}

impl ForeignKey {
    fn render(&self) -> String {
        let mut sql = format!(
            "FOREIGN KEY ({}) REFERENCES {}({})",
            self.column, self.references_table, self.references_column
        );
        if self.on_delete_cascade {
            sql.push_str(" ON DELETE CASCADE");
        }
        sql
    }
}

/// Secondary index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

/// Defines expected schema for a database table
pub trait TableSchema {
    /// Table name in database
    fn table_name() -> &'static str;

    /// Expected column definitions (order matters for table creation)
    fn expected_columns() -> Vec<ColumnDefinition>;

    fn foreign_keys() -> Vec<ForeignKey> {
        Vec::new()
    }

    fn indexes() -> Vec<IndexDefinition> {
        Vec::new()
    }
}

/// CREATE TABLE statement for one table
///
/// MySQL has no `CREATE INDEX IF NOT EXISTS`, so its indexes are declared
/// inline and the table is pinned to InnoDB, which enforces foreign keys.
pub fn create_table_sql<T: TableSchema>(dialect: SqlDialect) -> String {
    let mut clauses: Vec<String> = T::expected_columns()
        .iter()
        .map(|c| c.render(dialect))
        .collect();

    clauses.extend(T::foreign_keys().iter().map(ForeignKey::render));

    if dialect == SqlDialect::Mysql {
        clauses.extend(
            T::indexes()
                .iter()
                .map(|idx| format!("INDEX {} ({})", idx.name, idx.columns.join(", "))),
        );
    }

    let mut sql = format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        T::table_name(),
        clauses.join(",\n    ")
    );

    if dialect == SqlDialect::Mysql {
        sql.push_str(" ENGINE=InnoDB DEFAULT CHARSET=utf8mb4");
    }

    sql
}

/// Standalone CREATE INDEX statements (SQLite only; MySQL declares them inline)
pub fn create_index_sql<T: TableSchema>(dialect: SqlDialect) -> Vec<String> {
    match dialect {
        SqlDialect::Sqlite => T::indexes()
            .iter()
            .map(|idx| {
                format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                    idx.name,
                    T::table_name(),
                    idx.columns.join(", ")
                )
            })
            .collect(),
        SqlDialect::Mysql => Vec::new(),
    }
}

/// Schema introspection against the live database
pub struct SchemaIntrospector;

impl SchemaIntrospector {
    /// Check if table exists
    pub async fn table_exists(
        pool: &AnyPool,
        dialect: SqlDialect,
        table_name: &str,
    ) -> Result<bool> {
        let sql = match dialect {
            SqlDialect::Sqlite => {
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?"
            }
            SqlDialect::Mysql => {
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_schema = DATABASE() AND table_name = ?"
            }
        };

        let count: i64 = sqlx::query_scalar(sql)
            .bind(table_name)
            .fetch_one(pool)
            .await?;

        Ok(count > 0)
    }

    /// Column names of a table in declaration order
    pub async fn column_names(
        pool: &AnyPool,
        dialect: SqlDialect,
        table_name: &str,
    ) -> Result<Vec<String>> {
        let rows = match dialect {
            SqlDialect::Sqlite => {
                sqlx::query("SELECT name FROM pragma_table_info(?) ORDER BY cid")
                    .bind(table_name)
                    .fetch_all(pool)
                    .await?
            }
            SqlDialect::Mysql => {
                sqlx::query(
                    "SELECT column_name AS name FROM information_schema.columns \
                     WHERE table_schema = DATABASE() AND table_name = ? \
                     ORDER BY ordinal_position",
                )
                .bind(table_name)
                .fetch_all(pool)
                .await?
            }
        };

        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(Into::into))
            .collect()
    }
}
