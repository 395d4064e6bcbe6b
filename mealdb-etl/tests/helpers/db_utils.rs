//! Database Test Utilities
//!
//! Temporary SQLite stores for repository and pipeline tests

use anyhow::Result;
use mealdb_common::config::DatabaseSection;
use mealdb_etl::fetcher::MealSource;
use mealdb_etl::{Pipeline, Repository};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Create temporary test repository with the schema applied
///
/// Returns (TempDir, Repository) - TempDir must be kept alive for duration of test
pub async fn create_test_repository() -> Result<(TempDir, Repository)> {
    let temp_dir = TempDir::new()?;
    let section = DatabaseSection {
        sqlite_path: temp_dir.path().join("test_mealdb.db"),
        ..Default::default()
    };

    let repository = Repository::open(&section).await?;

    Ok((temp_dir, repository))
}

/// Create a pipeline over `source` and a fresh temporary store
pub async fn create_test_pipeline<S>(source: Arc<S>) -> Result<(TempDir, Pipeline)>
where
    S: MealSource + 'static,
{
    let (temp_dir, repository) = create_test_repository().await?;
    Ok((temp_dir, Pipeline::new(source, repository)))
}

/// Run one statement on a separate connection to the test database
async fn execute_on(db_path: &Path, sql: &str, binds: &[&str]) -> Result<()> {
    sqlx::any::install_default_drivers();
    let url = format!("sqlite://{}", db_path.display());
    let pool = sqlx::AnyPool::connect(&url).await?;
    let mut query = sqlx::query(sql);
    for value in binds {
        query = query.bind(*value);
    }
    query.execute(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Backdate a stored meal's `created_at` and `updated_at`
pub async fn set_created_at(db_path: &Path, meal_id: &str, timestamp: &str) -> Result<()> {
    execute_on(
        db_path,
        "UPDATE meals SET created_at = ?, updated_at = ? WHERE id = ?",
        &[timestamp, timestamp, meal_id],
    )
    .await
}

/// Make every insert of an ingredient named `ingredient` abort
///
/// Lets tests force a storage error halfway through a recipe write.
pub async fn fail_ingredient_inserts(db_path: &Path, ingredient: &str) -> Result<()> {
    // Trigger bodies cannot take bound parameters
    let sql = format!(
        "CREATE TRIGGER fail_ingredient_insert BEFORE INSERT ON ingredients \
         WHEN NEW.ingredient_name = '{}' \
         BEGIN SELECT RAISE(ABORT, 'ingredient insert rejected'); END",
        ingredient.replace('\'', "''")
    );
    execute_on(db_path, &sql, &[]).await
}
