//! # mealdb-common
//!
//! Shared code for the mealdb workspace:
//! - Error type used across crates
//! - Bootstrap configuration loading (TOML, environment, defaults)
//! - Database connection setup for both storage engines
//! - Declarative schema rendered per SQL dialect

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
