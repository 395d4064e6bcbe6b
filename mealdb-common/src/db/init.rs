//! Database initialization
//!
//! Opens a connection pool for the configured engine and creates the schema
//! if it does not exist yet. Both engines go through sqlx's `Any` driver so
//! callers hold a single pool type.

use crate::config::{DatabaseSection, StorageEngine};
use crate::db::schema::SqlDialect;
use crate::db::table_schemas::schema_statements;
use crate::Result;
use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::AnyPool;
use std::time::Duration;
use tracing::{debug, info};

/// Open connection pool plus the dialect it speaks
#[derive(Debug, Clone)]
pub struct Database {
    pool: AnyPool,
    dialect: SqlDialect,
}

impl Database {
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection closed");
    }
}

/// Connect to the configured store without touching the schema
pub async fn connect(section: &DatabaseSection) -> Result<Database> {
    install_default_drivers();

    let dialect = SqlDialect::from(section.engine);

    if section.engine == StorageEngine::Sqlite {
        let newly_created = !section.sqlite_path.exists();

        // Create parent directory if it doesn't exist
        if let Some(parent) = section.sqlite_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        if newly_created {
            info!("Creating new database: {}", section.sqlite_path.display());
        } else {
            info!("Opening existing database: {}", section.sqlite_path.display());
        }
    }

    debug!("Connecting to database: {}", section.display_target());

    // SQLite only enforces ON DELETE CASCADE when asked, per connection
    let enforce_foreign_keys = dialect == SqlDialect::Sqlite;

    let pool = AnyPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                if enforce_foreign_keys {
                    sqlx::query("PRAGMA foreign_keys = ON")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout = 5000")
                        .execute(&mut *conn)
                        .await?;
                }
                Ok(())
            })
        })
        .connect(&section.connection_url())
        .await?;

    info!("Connected to {}", section.display_target());

    Ok(Database { pool, dialect })
}

/// Create all tables and indexes (idempotent - safe to call multiple times)
pub async fn init_schema(db: &Database) -> Result<()> {
    for statement in schema_statements(db.dialect) {
        sqlx::query(&statement).execute(&db.pool).await?;
    }

    info!(
        "Database schema initialized ({} dialect)",
        db.dialect.name()
    );

    Ok(())
}

/// Connect and make sure the schema exists
pub async fn init_database(section: &DatabaseSection) -> Result<Database> {
    let db = connect(section).await?;
    init_schema(&db).await?;
    Ok(db)
}
