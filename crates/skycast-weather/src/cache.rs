//! Weather retrieval with a persistent, connectivity-aware cache.
//!
//! Every call ends in either a document or `None`; failures are logged and
//! never surfaced to the caller. See [`WeatherCache::get_weather`] for the
//! decision order.

use std::sync::Arc;
use std::time::Duration;

use crate::provider::ForecastSource;
use crate::reachability::Reachability;
use crate::store::KeyValueStore;
use crate::types::{CacheEntry, Coordinates, WeatherDocument};

const CACHE_KEY_PREFIX: &str = "weatherData_";

/// Age thresholds for cached entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Below this age an entry is served without consulting the network.
    pub fresh_for: Duration,
    /// Above this age an entry is discarded when online.
    pub stale_after: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            fresh_for: Duration::from_secs(10 * 60),
            stale_after: Duration::from_secs(60 * 60),
        }
    }
}

impl CachePolicy {
    fn fresh_ms(&self) -> i64 {
        i64::try_from(self.fresh_for.as_millis()).unwrap_or(i64::MAX)
    }

    fn stale_ms(&self) -> i64 {
        i64::try_from(self.stale_after.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Store key for a coordinate pair: `weatherData_{lat}_{lon}`.
///
/// No rounding, so `1.5` and `1.50001` are different entries. Negative zero
/// shares the `0` key and infinities render as `Infinity`.
pub fn cache_key(latitude: f64, longitude: f64) -> String {
    format!(
        "{}{}_{}",
        CACHE_KEY_PREFIX,
        key_component(latitude),
        key_component(longitude)
    )
}

fn key_component(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else if value == f64::INFINITY {
        "Infinity".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        value.to_string()
    }
}

/// Current time in epoch milliseconds.
pub type Clock = fn() -> i64;

fn system_clock() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub struct WeatherCache {
    store: Arc<dyn KeyValueStore>,
    reachability: Arc<dyn Reachability>,
    source: Arc<dyn ForecastSource>,
    policy: CachePolicy,
    now: Clock,
}

impl WeatherCache {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        reachability: Arc<dyn Reachability>,
        source: Arc<dyn ForecastSource>,
    ) -> Self {
        Self {
            store,
            reachability,
            source,
            policy: CachePolicy::default(),
            now: system_clock,
        }
    }

    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the clock used for entry ages and write timestamps.
    pub fn with_clock(mut self, now: Clock) -> Self {
        self.now = now;
        self
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Weather for a coordinate pair, or `None` when nothing usable exists.
    ///
    /// 1. Read the stored entry once.
    /// 2. An unparseable entry is removed and a fetch follows.
    /// 3. A fresh entry is returned as is. Offline, any entry is returned.
    ///    A stale entry is removed before fetching when online; an entry in
    ///    between is kept and refetched.
    /// 4. A successful fetch overwrites the entry and is returned.
    /// 5. A failed fetch falls back to whatever was read in step 1.
    pub async fn get_weather(&self, latitude: f64, longitude: f64) -> Option<WeatherDocument> {
        let key = cache_key(latitude, longitude);

        let cached_raw = match self.store.get(&key).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Failed to read cached weather for {}: {}", key, e);
                None
            }
        };

        match cached_raw.as_deref() {
            Some(raw) => match CacheEntry::parse(raw) {
                Ok(entry) => {
                    if let Some(data) = self.evaluate_entry(&key, entry).await {
                        return Some(data);
                    }
                }
                Err(e) => {
                    tracing::error!("Error parsing cached weather for {}: {}", key, e);
                    self.remove_entry(&key).await;
                }
            },
            None => {
                tracing::debug!("No cached weather for {}", key);
            }
        }

        match self
            .source
            .forecast(Coordinates::new(latitude, longitude))
            .await
        {
            Ok(document) => {
                let entry = CacheEntry::new(document, (self.now)());
                self.write_entry(&key, &entry).await;
                Some(entry.data)
            }
            Err(e) => {
                if e.is_rate_limited() {
                    tracing::warn!("Weather API rate limit exceeded for {}", key);
                } else {
                    tracing::error!("Error fetching weather data for {}: {}", key, e);
                }
                Self::fallback(&key, cached_raw.as_deref())
            }
        }
    }

    /// Apply the freshness rules to a parsed entry.
    ///
    /// Returns the data when the entry should be served, `None` when a fetch
    /// is needed.
    async fn evaluate_entry(&self, key: &str, entry: CacheEntry) -> Option<WeatherDocument> {
        let age = entry.age_ms((self.now)());
        let connected = self.reachability.is_connected().await;

        if age < self.policy.fresh_ms() {
            tracing::info!("Using cached weather for {} ({} ms old)", key, age);
            return Some(entry.data);
        }

        if age > self.policy.stale_ms() && connected {
            tracing::info!(
                "Cached weather for {} is {} ms old and network is up; discarding",
                key,
                age
            );
            self.remove_entry(key).await;
        }

        if !connected {
            tracing::info!("No internet connection; using cached weather for {}", key);
            return Some(entry.data);
        }

        tracing::debug!("Cached weather for {} is {} ms old; refreshing", key, age);
        None
    }

    fn fallback(key: &str, cached_raw: Option<&str>) -> Option<WeatherDocument> {
        let raw = cached_raw?;
        match CacheEntry::parse(raw) {
            Ok(entry) => {
                tracing::info!("Fetch failed; falling back to cached weather for {}", key);
                Some(entry.data)
            }
            Err(e) => {
                tracing::error!("Error parsing fallback cached weather for {}: {}", key, e);
                None
            }
        }
    }

    async fn write_entry(&self, key: &str, entry: &CacheEntry) {
        let serialized = match serde_json::to_string(entry) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Failed to serialize weather entry for {}: {}", key, e);
                return;
            }
        };
        if let Err(e) = self.store.set(key, &serialized).await {
            tracing::error!("Failed to cache weather for {}: {}", key, e);
        }
    }

    async fn remove_entry(&self, key: &str) {
        if let Err(e) = self.store.remove(key).await {
            tracing::warn!("Failed to remove cached weather for {}: {}", key, e);
        }
    }
}
