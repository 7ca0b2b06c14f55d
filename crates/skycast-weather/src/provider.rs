//! weatherapi.com client: 7-day forecast with air quality, and location
//! search.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::instrument;

use crate::types::{Coordinates, LocationSuggestion, WeatherDocument, WeatherError};

pub const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const FORECAST_DAYS: u8 = 7;
const MIN_SEARCH_QUERY_LEN: usize = 3;

/// Source of weather documents for a coordinate pair.
#[async_trait]
pub trait ForecastSource: Send + Sync {
    /// Fetch a complete forecast document.
    ///
    /// # Errors
    /// Any transport, status, decode or completeness failure.
    async fn forecast(&self, coords: Coordinates) -> Result<WeatherDocument, WeatherError>;
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
    days: u8,
}

impl WeatherProvider {
    /// # Errors
    /// Returns `MissingApiKey` for an empty key, or a network error if the
    /// HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>) -> Result<Self, WeatherError> {
        Self::with_options(
            api_key,
            DEFAULT_BASE_URL,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// # Errors
    /// Same as [`WeatherProvider::new`].
    pub fn with_options(
        api_key: impl Into<String>,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, WeatherError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(WeatherError::MissingApiKey);
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            days: FORECAST_DAYS,
        })
    }

    /// Override the number of forecast days requested.
    pub fn with_days(mut self, days: u8) -> Self {
        self.days = days;
        self
    }

    /// Search locations matching `query`.
    ///
    /// Queries shorter than three characters return no suggestions without
    /// touching the network.
    ///
    /// # Errors
    /// Transport, status or decode failures.
    #[instrument(skip(self), level = "info")]
    pub async fn search(&self, query: &str) -> Result<Vec<LocationSuggestion>, WeatherError> {
        let query = query.trim();
        if query.chars().count() < MIN_SEARCH_QUERY_LEN {
            return Ok(Vec::new());
        }

        let url = format!("{}/search.json", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("q", query)])
            .send()
            .await?;

        let response = check_status(response)?;
        response
            .json()
            .await
            .map_err(|e| WeatherError::Parse(format!("search response: {}", e)))
    }
}

#[async_trait]
impl ForecastSource for WeatherProvider {
    #[instrument(skip(self), level = "info")]
    async fn forecast(&self, coords: Coordinates) -> Result<WeatherDocument, WeatherError> {
        let url = format!("{}/forecast.json", self.base_url);
        let days = self.days.to_string();
        let q = coords.as_query();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", q.as_str()),
                ("days", days.as_str()),
                ("aqi", "yes"),
                ("alerts", "no"),
            ])
            .send()
            .await?;

        let response = check_status(response)?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| WeatherError::Parse(format!("forecast response: {}", e)))?;

        let document = WeatherDocument::new(body);
        document.validate()?;
        Ok(document)
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, WeatherError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        Err(WeatherError::RateLimited)
    } else {
        Err(WeatherError::Status(status.as_u16()))
    }
}
