//! Test Helper Utilities
//!
//! Shared utilities for testing mealdb-etl

#![allow(dead_code)]

pub mod db_utils;
pub mod fake_source;
pub mod log_capture;

// Re-export commonly used items
pub use db_utils::{
    create_test_pipeline, create_test_repository, fail_ingredient_inserts, set_created_at,
};
pub use fake_source::{raw_meal, FakeSource};
pub use log_capture::{capture_logs, LogCapture};
