//! In-memory MealSource
//!
//! Serves a fixed catalogue so pipeline and API tests never touch the network.

use async_trait::async_trait;
use mealdb_etl::fetcher::{FilterKind, MealSource, MealSummary, RawArea, RawCategory, RawMeal};
use mealdb_etl::{EtlError, EtlResult};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Recipe with a category, an area and one ingredient in slot 1
pub fn raw_meal(id: &str, name: &str, category: &str, area: &str) -> RawMeal {
    let mut meal = RawMeal::new(id, name).with_ingredient(1, "Salt", "1 tsp");
    meal.category = Some(category.to_string());
    meal.area = Some(area.to_string());
    meal.instructions = Some(format!("Cook the {}.", name));
    meal
}

#[derive(Default)]
pub struct FakeSource {
    /// Records served by lookup, search and filter calls
    catalogue: Vec<RawMeal>,
    /// Answers for successive random draws; an empty queue answers `None`
    random: Mutex<VecDeque<Result<Option<RawMeal>, String>>>,
    categories: Vec<RawCategory>,
    areas: Vec<String>,
    failing: bool,
    fail_reference: bool,
    lookup_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record to the catalogue
    pub fn with_meal(mut self, meal: RawMeal) -> Self {
        self.catalogue.push(meal);
        self
    }

    /// Queue a random draw answer
    pub fn with_random(self, meal: RawMeal) -> Self {
        self.random.lock().unwrap().push_back(Ok(Some(meal)));
        self
    }

    /// Queue a failed random draw
    pub fn with_random_error(self, message: &str) -> Self {
        self.random.lock().unwrap().push_back(Err(message.to_string()));
        self
    }

    pub fn with_category(mut self, name: &str, description: &str) -> Self {
        self.categories.push(RawCategory {
            id: Some((self.categories.len() + 1).to_string()),
            name: Some(name.to_string()),
            thumbnail: Some(format!("https://img.example/{}.png", name)),
            description: Some(description.to_string()),
        });
        self
    }

    pub fn with_area(mut self, name: &str) -> Self {
        self.areas.push(name.to_string());
        self
    }

    /// Every call fails with a network error
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Only the category and area listings fail
    pub fn failing_reference(mut self) -> Self {
        self.fail_reference = true;
        self
    }

    /// Number of `lookup_meal` calls so far
    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> EtlResult<()> {
        if self.failing {
            return Err(EtlError::Network("connection refused".to_string()));
        }
        Ok(())
    }

    fn check_reference(&self) -> EtlResult<()> {
        self.check()?;
        if self.fail_reference {
            return Err(EtlError::Network("reference listing unavailable".to_string()));
        }
        Ok(())
    }

    fn summaries<F>(&self, keep: F) -> Vec<MealSummary>
    where
        F: Fn(&RawMeal) -> bool,
    {
        self.catalogue
            .iter()
            .filter(|meal| keep(meal))
            .map(|meal| MealSummary {
                id: meal.id.clone(),
                name: meal.name.clone(),
                thumbnail: meal.thumbnail.clone(),
            })
            .collect()
    }
}

fn field_eq(field: &Option<String>, value: &str) -> bool {
    field
        .as_deref()
        .map(|f| f.eq_ignore_ascii_case(value))
        .unwrap_or(false)
}

#[async_trait]
impl MealSource for FakeSource {
    async fn random_meal(&self) -> EtlResult<Option<RawMeal>> {
        self.check()?;
        match self.random.lock().unwrap().pop_front() {
            Some(Ok(meal)) => Ok(meal),
            Some(Err(message)) => Err(EtlError::Network(message)),
            None => Ok(None),
        }
    }

    async fn lookup_meal(&self, id: &str) -> EtlResult<Option<RawMeal>> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self
            .catalogue
            .iter()
            .find(|meal| meal.trimmed_id() == Some(id))
            .cloned())
    }

    async fn search_by_name(&self, name: &str) -> EtlResult<Vec<RawMeal>> {
        self.check()?;
        let needle = name.to_lowercase();
        Ok(self
            .catalogue
            .iter()
            .filter(|meal| {
                meal.name
                    .as_deref()
                    .map(|n| n.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn search_by_letter(&self, letter: char) -> EtlResult<Vec<RawMeal>> {
        self.check()?;
        let letter = letter.to_ascii_lowercase();
        Ok(self
            .catalogue
            .iter()
            .filter(|meal| {
                meal.name
                    .as_deref()
                    .and_then(|n| n.chars().next())
                    .map(|c| c.to_ascii_lowercase() == letter)
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn filter_by(&self, kind: FilterKind, value: &str) -> EtlResult<Vec<MealSummary>> {
        self.check()?;
        Ok(match kind {
            FilterKind::Category => self.summaries(|meal| field_eq(&meal.category, value)),
            FilterKind::Area => self.summaries(|meal| field_eq(&meal.area, value)),
            FilterKind::Ingredient => self.summaries(|meal| {
                meal.ingredients
                    .iter()
                    .any(|slot| field_eq(&slot.ingredient, value))
            }),
        })
    }

    async fn list_categories(&self) -> EtlResult<Vec<RawCategory>> {
        self.check_reference()?;
        Ok(self.categories.clone())
    }

    async fn list_areas(&self) -> EtlResult<Vec<RawArea>> {
        self.check_reference()?;
        Ok(self
            .areas
            .iter()
            .map(|name| RawArea {
                name: Some(name.clone()),
            })
            .collect())
    }
}
