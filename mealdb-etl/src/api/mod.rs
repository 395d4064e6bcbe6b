//! HTTP API handlers for the mealdb dashboard

pub mod etl;
pub mod health;
pub mod meals;
pub mod ui;

pub use etl::etl_routes;
pub use health::health_routes;
pub use meals::meal_routes;
pub use ui::ui_routes;
