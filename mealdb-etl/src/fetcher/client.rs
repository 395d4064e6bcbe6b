//! TheMealDB HTTP client
//!
//! One GET per call, paced by a minimum interval between requests. No
//! retries: every transport, status or decode problem surfaces as
//! `EtlError::Network`.

use super::raw::{CategoriesEnvelope, MealSummary, MealsEnvelope, RawArea, RawCategory, RawMeal};
use super::{FilterKind, MealSource};
use crate::error::{EtlError, EtlResult};
use async_trait::async_trait;
use mealdb_common::config::ApiSection;
use mealdb_common::time::millis_to_duration;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const USER_AGENT: &str = concat!("mealdb-etl/", env!("CARGO_PKG_VERSION"));

/// Rate limiter enforcing a minimum spacing between requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: millis_to_duration(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with rate limit
    async fn wait(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Remote recipe API client
pub struct MealDbClient {
    http_client: reqwest::Client,
    base_url: String,
    rate_limiter: Arc<RateLimiter>,
}

impl MealDbClient {
    pub fn new(api: &ApiSection) -> EtlResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()
            .map_err(|e| EtlError::Configuration(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            rate_limiter: Arc::new(RateLimiter::new(api.request_interval_ms)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `{base_url}/{endpoint}` and decode the JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> EtlResult<T> {
        self.rate_limiter.wait().await;

        let url = format!("{}/{}", self.base_url, endpoint);

        tracing::debug!(url = %url, ?query, "Querying recipe API");

        let response = self
            .http_client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| EtlError::Network(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();

        if !status.is_success() {
            return Err(EtlError::Network(format!(
                "HTTP {} from {}",
                status.as_u16(),
                url
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| EtlError::Network(format!("Invalid response body from {}: {}", url, e)))
    }
}

#[async_trait]
impl MealSource for MealDbClient {
    async fn random_meal(&self) -> EtlResult<Option<RawMeal>> {
        let envelope: MealsEnvelope<RawMeal> = self.get_json("random.php", &[]).await?;
        Ok(envelope.into_vec().into_iter().next())
    }

    async fn lookup_meal(&self, id: &str) -> EtlResult<Option<RawMeal>> {
        let envelope: MealsEnvelope<RawMeal> =
            self.get_json("lookup.php", &[("i", id)]).await?;
        Ok(envelope.into_vec().into_iter().next())
    }

    async fn search_by_name(&self, name: &str) -> EtlResult<Vec<RawMeal>> {
        let envelope: MealsEnvelope<RawMeal> =
            self.get_json("search.php", &[("s", name)]).await?;
        Ok(envelope.into_vec())
    }

    async fn search_by_letter(&self, letter: char) -> EtlResult<Vec<RawMeal>> {
        let letter = letter.to_string();
        let envelope: MealsEnvelope<RawMeal> =
            self.get_json("search.php", &[("f", letter.as_str())]).await?;
        Ok(envelope.into_vec())
    }

    async fn filter_by(&self, kind: FilterKind, value: &str) -> EtlResult<Vec<MealSummary>> {
        let envelope: MealsEnvelope<MealSummary> = self
            .get_json("filter.php", &[(kind.query_key(), value)])
            .await?;
        Ok(envelope.into_vec())
    }

    async fn list_categories(&self) -> EtlResult<Vec<RawCategory>> {
        let envelope: CategoriesEnvelope = self.get_json("categories.php", &[]).await?;
        Ok(envelope.categories.unwrap_or_default())
    }

    async fn list_areas(&self) -> EtlResult<Vec<RawArea>> {
        let envelope: MealsEnvelope<RawArea> =
            self.get_json("list.php", &[("a", "list")]).await?;
        Ok(envelope.into_vec())
    }
}
