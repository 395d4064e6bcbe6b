//! Fetcher: obtains raw recipe records from a `MealSource`
//!
//! `fetch_records` turns a request descriptor into a `FetchBatch`. Single
//! record problems (failed request, absent record, duplicate, already
//! stored) are tallied on the batch. The call only fails when nothing at
//! all could be fetched.

pub mod client;
pub mod raw;

pub use client::MealDbClient;
pub use raw::{IngredientSlot, MealSummary, RawArea, RawCategory, RawMeal, INGREDIENT_SLOTS};

use crate::error::{EtlError, EtlResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Filter endpoints returning light records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Category,
    Area,
    Ingredient,
}

impl FilterKind {
    /// Query parameter used by `filter.php`
    pub fn query_key(&self) -> &'static str {
        match self {
            FilterKind::Category => "c",
            FilterKind::Area => "a",
            FilterKind::Ingredient => "i",
        }
    }
}

/// Remote recipe API surface used by the pipeline
///
/// An absent record is `Ok(None)` or an empty list, never an error.
#[async_trait]
pub trait MealSource: Send + Sync {
    async fn random_meal(&self) -> EtlResult<Option<RawMeal>>;

    async fn lookup_meal(&self, id: &str) -> EtlResult<Option<RawMeal>>;

    async fn search_by_name(&self, name: &str) -> EtlResult<Vec<RawMeal>>;

    async fn search_by_letter(&self, letter: char) -> EtlResult<Vec<RawMeal>>;

    async fn filter_by(&self, kind: FilterKind, value: &str) -> EtlResult<Vec<MealSummary>>;

    async fn list_categories(&self) -> EtlResult<Vec<RawCategory>>;

    async fn list_areas(&self) -> EtlResult<Vec<RawArea>>;
}

/// How a search term is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Name,
    Letter,
    Category,
    Area,
    Ingredient,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Name => "name",
            SearchType::Letter => "letter",
            SearchType::Category => "category",
            SearchType::Area => "area",
            SearchType::Ingredient => "ingredient",
        }
    }

    /// Filter endpoint for this search, `None` for full-record searches
    pub fn filter_kind(&self) -> Option<FilterKind> {
        match self {
            SearchType::Category => Some(FilterKind::Category),
            SearchType::Area => Some(FilterKind::Area),
            SearchType::Ingredient => Some(FilterKind::Ingredient),
            SearchType::Name | SearchType::Letter => None,
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchType {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(SearchType::Name),
            "letter" => Ok(SearchType::Letter),
            "category" => Ok(SearchType::Category),
            "area" => Ok(SearchType::Area),
            "ingredient" => Ok(SearchType::Ingredient),
            other => Err(EtlError::Validation(format!(
                "Unknown search type '{}'. Use name, letter, category, area or ingredient.",
                other
            ))),
        }
    }
}

/// Shape of one fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRequest {
    /// N independent random draws
    Random { count: usize },
    /// Single lookup by identifier
    ById(String),
    Search { term: String, search_type: SearchType },
}

impl FetchRequest {
    /// Reject requests that cannot be sent
    pub fn validate(&self) -> EtlResult<()> {
        match self {
            FetchRequest::Random { .. } => Ok(()),
            FetchRequest::ById(id) => {
                if id.trim().is_empty() {
                    return Err(EtlError::Validation("Meal id must not be empty".to_string()));
                }
                Ok(())
            }
            FetchRequest::Search { term, search_type } => {
                let term = term.trim();
                if term.is_empty() {
                    return Err(EtlError::Validation(
                        "Search term must not be empty".to_string(),
                    ));
                }
                if *search_type == SearchType::Letter && term.chars().count() != 1 {
                    return Err(EtlError::Validation(format!(
                        "Letter search needs exactly one character, got '{}'",
                        term
                    )));
                }
                Ok(())
            }
        }
    }

    /// Short description for logs and error messages
    pub fn describe(&self) -> String {
        match self {
            FetchRequest::Random { count } => format!("random x{}", count),
            FetchRequest::ById(id) => format!("lookup {}", id),
            FetchRequest::Search { term, search_type } => {
                format!("{} search '{}'", search_type, term)
            }
        }
    }
}

/// Result of one fetch, with every discarded record accounted for
#[derive(Debug, Default)]
pub struct FetchBatch {
    pub records: Vec<RawMeal>,
    /// Requests or lookups that failed
    pub fetch_failures: usize,
    /// Lookups that returned nothing
    pub missing: usize,
    /// Records dropped because their id is in the skip set
    pub skipped_existing: usize,
    /// Repeats of an id already in this batch
    pub duplicates: usize,
    /// One message per fetch failure
    pub errors: Vec<String>,
}

impl FetchBatch {
    /// Keep a full record unless its id was already seen or must be skipped
    fn accept(&mut self, meal: RawMeal, seen: &mut HashSet<String>, skip_ids: &HashSet<String>) {
        // Records without an id pass through so validation can count them
        if let Some(id) = meal.trimmed_id() {
            if skip_ids.contains(id) {
                debug!(meal_id = %id, "Skipping existing meal");
                self.skipped_existing += 1;
                return;
            }
            if !seen.insert(id.to_string()) {
                debug!(meal_id = %id, "Dropping duplicate meal in batch");
                self.duplicates += 1;
                return;
            }
        }
        self.records.push(meal);
    }

    fn record_failure(&mut self, context: String, err: EtlError) {
        warn!("{}: {}", context, err);
        self.fetch_failures += 1;
        self.errors.push(format!("{}: {}", context, err));
    }
}

/// Fetch the raw records for `request`
///
/// Ids in `skip_ids` are dropped before any per-record lookup (filter
/// searches) or right after the fetch when the id is only known then
/// (random draws, name and letter searches).
pub async fn fetch_records(
    source: &dyn MealSource,
    request: &FetchRequest,
    skip_ids: &HashSet<String>,
) -> EtlResult<FetchBatch> {
    request.validate()?;

    let mut batch = FetchBatch::default();
    let mut seen = HashSet::new();

    match request {
        FetchRequest::Random { count } => {
            for attempt in 1..=*count {
                match source.random_meal().await {
                    Ok(Some(meal)) => batch.accept(meal, &mut seen, skip_ids),
                    Ok(None) => batch.missing += 1,
                    Err(e) => batch.record_failure(format!("Random draw {}", attempt), e),
                }
            }

            if *count > 0 && batch.fetch_failures == *count {
                return Err(EtlError::Network(format!(
                    "All {} random requests failed; last error: {}",
                    count,
                    batch.errors.last().map(String::as_str).unwrap_or("unknown")
                )));
            }
        }

        FetchRequest::ById(id) => match source.lookup_meal(id.trim()).await? {
            Some(meal) => batch.accept(meal, &mut seen, skip_ids),
            None => batch.missing += 1,
        },

        FetchRequest::Search { term, search_type } => {
            let term = term.trim();
            match search_type.filter_kind() {
                None => {
                    let meals = if *search_type == SearchType::Letter {
                        // validate() guarantees exactly one character
                        let letter = term.chars().next().unwrap_or('a');
                        source.search_by_letter(letter).await?
                    } else {
                        source.search_by_name(term).await?
                    };
                    for meal in meals {
                        batch.accept(meal, &mut seen, skip_ids);
                    }
                }
                Some(kind) => {
                    let summaries = source.filter_by(kind, term).await?;
                    fetch_summaries(source, summaries, &mut batch, &mut seen, skip_ids).await?;
                }
            }
        }
    }

    debug!(
        request = %request.describe(),
        fetched = batch.records.len(),
        failures = batch.fetch_failures,
        missing = batch.missing,
        skipped_existing = batch.skipped_existing,
        duplicates = batch.duplicates,
        "Fetch complete"
    );

    Ok(batch)
}

/// Look up the full record behind each light record
async fn fetch_summaries(
    source: &dyn MealSource,
    summaries: Vec<MealSummary>,
    batch: &mut FetchBatch,
    seen: &mut HashSet<String>,
    skip_ids: &HashSet<String>,
) -> EtlResult<()> {
    let mut attempted = 0;

    for summary in summaries {
        let Some(id) = summary
            .id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
        else {
            warn!(name = ?summary.name, "Filter result without id");
            batch.missing += 1;
            continue;
        };

        if skip_ids.contains(&id) {
            debug!(meal_id = %id, "Skipping existing meal before lookup");
            batch.skipped_existing += 1;
            continue;
        }
        if seen.contains(&id) {
            batch.duplicates += 1;
            continue;
        }

        attempted += 1;
        match source.lookup_meal(&id).await {
            Ok(Some(meal)) => batch.accept(meal, seen, skip_ids),
            Ok(None) => {
                warn!(meal_id = %id, "Lookup returned no meal");
                batch.missing += 1;
            }
            Err(e) => batch.record_failure(format!("Lookup {}", id), e),
        }
    }

    if attempted > 0 && batch.fetch_failures == attempted {
        return Err(EtlError::Network(format!(
            "All {} lookups failed; last error: {}",
            attempted,
            batch.errors.last().map(String::as_str).unwrap_or("unknown")
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted source: random draws cycle through `random`, lookups hit `by_id`
    #[derive(Default)]
    struct ScriptedSource {
        random: Vec<Option<RawMeal>>,
        fail_random: bool,
        by_id: HashMap<String, RawMeal>,
        fail_lookups: HashSet<String>,
        summaries: Vec<MealSummary>,
        random_calls: AtomicUsize,
        lookup_calls: AtomicUsize,
    }

    #[async_trait]
    impl MealSource for ScriptedSource {
        async fn random_meal(&self) -> EtlResult<Option<RawMeal>> {
            let n = self.random_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_random {
                return Err(EtlError::Network("connection refused".into()));
            }
            Ok(self.random[n % self.random.len()].clone())
        }

        async fn lookup_meal(&self, id: &str) -> EtlResult<Option<RawMeal>> {
            self.lookup_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_lookups.contains(id) {
                return Err(EtlError::Network("timeout".into()));
            }
            Ok(self.by_id.get(id).cloned())
        }

        async fn search_by_name(&self, name: &str) -> EtlResult<Vec<RawMeal>> {
            Ok(self
                .by_id
                .values()
                .filter(|m| m.name.as_deref().unwrap_or("").contains(name))
                .cloned()
                .collect())
        }

        async fn search_by_letter(&self, letter: char) -> EtlResult<Vec<RawMeal>> {
            Ok(self
                .by_id
                .values()
                .filter(|m| m.name.as_deref().unwrap_or("").starts_with(letter))
                .cloned()
                .collect())
        }

        async fn filter_by(&self, _kind: FilterKind, _value: &str) -> EtlResult<Vec<MealSummary>> {
            Ok(self.summaries.clone())
        }

        async fn list_categories(&self) -> EtlResult<Vec<RawCategory>> {
            Ok(Vec::new())
        }

        async fn list_areas(&self) -> EtlResult<Vec<RawArea>> {
            Ok(Vec::new())
        }
    }

    fn summary(id: &str) -> MealSummary {
        MealSummary {
            id: Some(id.to_string()),
            name: Some(format!("Meal {}", id)),
            thumbnail: None,
        }
    }

    #[tokio::test]
    async fn test_random_dedupes_within_batch() {
        let source = ScriptedSource {
            random: vec![
                Some(RawMeal::new("1", "A")),
                Some(RawMeal::new("2", "B")),
                Some(RawMeal::new("1", "A")),
            ],
            ..Default::default()
        };

        let batch = fetch_records(&source, &FetchRequest::Random { count: 3 }, &HashSet::new())
            .await
            .unwrap();

        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.duplicates, 1);
        assert_eq!(source.random_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_random_all_failed_is_network_error() {
        let source = ScriptedSource {
            fail_random: true,
            ..Default::default()
        };

        let result =
            fetch_records(&source, &FetchRequest::Random { count: 4 }, &HashSet::new()).await;
        assert!(matches!(result, Err(EtlError::Network(_))));
    }

    #[tokio::test]
    async fn test_random_zero_is_empty_success() {
        let source = ScriptedSource::default();
        let batch = fetch_records(&source, &FetchRequest::Random { count: 0 }, &HashSet::new())
            .await
            .unwrap();
        assert!(batch.records.is_empty());
        assert_eq!(source.random_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_random_skips_existing_after_fetch() {
        let source = ScriptedSource {
            random: vec![Some(RawMeal::new("1", "A")), Some(RawMeal::new("2", "B"))],
            ..Default::default()
        };
        let skip: HashSet<String> = ["1".to_string()].into_iter().collect();

        let batch = fetch_records(&source, &FetchRequest::Random { count: 2 }, &skip)
            .await
            .unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.skipped_existing, 1);
    }

    #[tokio::test]
    async fn test_filter_skips_before_lookup() {
        let mut by_id = HashMap::new();
        by_id.insert("10".to_string(), RawMeal::new("10", "Ten"));
        by_id.insert("11".to_string(), RawMeal::new("11", "Eleven"));
        let source = ScriptedSource {
            by_id,
            summaries: vec![summary("10"), summary("11"), summary("12")],
            ..Default::default()
        };
        let skip: HashSet<String> = ["10".to_string()].into_iter().collect();

        let request = FetchRequest::Search {
            term: "Seafood".into(),
            search_type: SearchType::Category,
        };
        let batch = fetch_records(&source, &request, &skip).await.unwrap();

        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.skipped_existing, 1);
        assert_eq!(batch.missing, 1, "id 12 has no full record");
        // Only 11 and 12 were looked up
        assert_eq!(source.lookup_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_filter_partial_lookup_failure_is_tallied() {
        let mut by_id = HashMap::new();
        by_id.insert("1".to_string(), RawMeal::new("1", "One"));
        let source = ScriptedSource {
            by_id,
            fail_lookups: ["2".to_string()].into_iter().collect(),
            summaries: vec![summary("1"), summary("2")],
            ..Default::default()
        };

        let request = FetchRequest::Search {
            term: "Canadian".into(),
            search_type: SearchType::Area,
        };
        let batch = fetch_records(&source, &request, &HashSet::new()).await.unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.fetch_failures, 1);
        assert_eq!(batch.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_filter_all_lookups_failed_is_network_error() {
        let source = ScriptedSource {
            fail_lookups: ["1".to_string(), "2".to_string()].into_iter().collect(),
            summaries: vec![summary("1"), summary("2")],
            ..Default::default()
        };

        let request = FetchRequest::Search {
            term: "garlic".into(),
            search_type: SearchType::Ingredient,
        };
        let result = fetch_records(&source, &request, &HashSet::new()).await;
        assert!(matches!(result, Err(EtlError::Network(_))));
    }

    #[tokio::test]
    async fn test_lookup_absent_is_missing_not_error() {
        let source = ScriptedSource::default();
        let batch = fetch_records(&source, &FetchRequest::ById("999".into()), &HashSet::new())
            .await
            .unwrap();
        assert!(batch.records.is_empty());
        assert_eq!(batch.missing, 1);
    }

    #[test]
    fn test_validate_letter_search() {
        let ok = FetchRequest::Search {
            term: " b ".into(),
            search_type: SearchType::Letter,
        };
        assert!(ok.validate().is_ok());

        let too_long = FetchRequest::Search {
            term: "ab".into(),
            search_type: SearchType::Letter,
        };
        assert!(matches!(too_long.validate(), Err(EtlError::Validation(_))));

        let empty = FetchRequest::Search {
            term: "  ".into(),
            search_type: SearchType::Name,
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_search_type_parse() {
        assert_eq!("Area".parse::<SearchType>().unwrap(), SearchType::Area);
        assert_eq!("letter".parse::<SearchType>().unwrap(), SearchType::Letter);
        assert!("cuisine".parse::<SearchType>().is_err());
        assert_eq!(SearchType::Name.filter_kind(), None);
        assert_eq!(SearchType::Ingredient.filter_kind(), Some(FilterKind::Ingredient));
    }
}
