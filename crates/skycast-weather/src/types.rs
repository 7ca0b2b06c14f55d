use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::StoreError;

/// Geographic coordinates in decimal degrees.
///
/// Values are taken as given: no range check, no rounding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Query form used by the API (`lat,lon`).
    pub fn as_query(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

/// A weather document exactly as returned by the forecast API.
///
/// The JSON is kept verbatim so it can be cached and handed back unchanged;
/// the accessors below read the handful of fields the CLI displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeatherDocument(Value);

impl WeatherDocument {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Check the document carries the sections every consumer relies on.
    ///
    /// # Errors
    /// Returns `WeatherError::Incomplete` for an empty document or one
    /// without a `current` or `location` section.
    pub fn validate(&self) -> Result<(), WeatherError> {
        let obj = match &self.0 {
            Value::Object(map) if !map.is_empty() => map,
            _ => return Err(WeatherError::Incomplete("empty document".to_string())),
        };

        for section in ["current", "location"] {
            if !obj.get(section).is_some_and(is_truthy) {
                return Err(WeatherError::Incomplete(format!(
                    "missing `{}` section",
                    section
                )));
            }
        }
        Ok(())
    }

    pub fn location_name(&self) -> Option<&str> {
        self.0.pointer("/location/name")?.as_str()
    }

    pub fn region(&self) -> Option<&str> {
        self.0.pointer("/location/region")?.as_str()
    }

    pub fn country(&self) -> Option<&str> {
        self.0.pointer("/location/country")?.as_str()
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        let lat = self.0.pointer("/location/lat")?.as_f64()?;
        let lon = self.0.pointer("/location/lon")?.as_f64()?;
        Some(Coordinates::new(lat, lon))
    }

    pub fn temperature_c(&self) -> Option<f64> {
        self.0.pointer("/current/temp_c")?.as_f64()
    }

    pub fn temperature_f(&self) -> Option<f64> {
        self.0.pointer("/current/temp_f")?.as_f64()
    }

    pub fn condition(&self) -> Option<&str> {
        self.0.pointer("/current/condition/text")?.as_str()
    }

    /// US EPA air quality index (1 = good .. 6 = hazardous).
    pub fn us_epa_index(&self) -> Option<u8> {
        self.0
            .pointer("/current/air_quality/us-epa-index")?
            .as_u64()
            .and_then(|v| u8::try_from(v).ok())
    }

    /// Daily forecast rows; days with unreadable fields are skipped.
    pub fn forecast_days(&self) -> Vec<ForecastDay> {
        let Some(days) = self
            .0
            .pointer("/forecast/forecastday")
            .and_then(Value::as_array)
        else {
            return Vec::new();
        };

        days.iter()
            .filter_map(|day| {
                Some(ForecastDay {
                    date: day.get("date")?.as_str()?.to_string(),
                    max_c: day.pointer("/day/maxtemp_c")?.as_f64()?,
                    min_c: day.pointer("/day/mintemp_c")?.as_f64()?,
                    condition: day
                        .pointer("/day/condition/text")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                })
            })
            .collect()
    }

    /// Local time at the forecast location (`location.localtime`).
    pub fn local_time(&self) -> Option<NaiveDateTime> {
        let raw = self.0.pointer("/location/localtime")?.as_str()?;
        NaiveDateTime::parse_from_str(raw, LOCAL_TIME_FORMAT).ok()
    }

    /// The next 24 hourly rows starting at the hour of `now`.
    ///
    /// Takes today's rows from the current hour on, then tops up from the
    /// start of tomorrow. Rows whose time or temperature cannot be read are
    /// skipped, so fewer than 24 may come back.
    pub fn hourly_from(&self, now: NaiveDateTime) -> Vec<HourlyForecast> {
        let Some(days) = self
            .0
            .pointer("/forecast/forecastday")
            .and_then(Value::as_array)
        else {
            return Vec::new();
        };

        let rows = |index: usize| -> Vec<HourlyForecast> {
            days.get(index)
                .and_then(|day| day.get("hour"))
                .and_then(Value::as_array)
                .map(|hours| hours.iter().filter_map(HourlyForecast::from_value).collect())
                .unwrap_or_default()
        };

        let mut next: Vec<HourlyForecast> = rows(0)
            .into_iter()
            .filter(|row| row.time.hour() >= now.hour())
            .collect();
        let remaining = HOURS_AHEAD.saturating_sub(next.len());
        next.extend(rows(1).into_iter().take(remaining));
        next
    }
}

const LOCAL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";
const HOURS_AHEAD: usize = 24;

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// One day of the forecast, flattened for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastDay {
    pub date: String,
    pub max_c: f64,
    pub min_c: f64,
    pub condition: String,
}

/// One hour of the forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyForecast {
    pub time: NaiveDateTime,
    pub temp_c: f64,
    pub condition: String,
}

impl HourlyForecast {
    fn from_value(hour: &Value) -> Option<Self> {
        let time = hour.get("time")?.as_str()?;
        Some(Self {
            time: NaiveDateTime::parse_from_str(time, LOCAL_TIME_FORMAT).ok()?,
            temp_c: hour.get("temp_c")?.as_f64()?,
            condition: hour
                .pointer("/condition/text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }
}

/// The persisted unit per coordinate pair.
///
/// Serialised as `{"data": <document>, "timestamp": <epoch ms>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: WeatherDocument,
    pub timestamp: i64,
}

impl CacheEntry {
    pub fn new(data: WeatherDocument, timestamp: i64) -> Self {
        Self { data, timestamp }
    }

    /// Decode a stored entry.
    ///
    /// Anything other than `{data, timestamp}` with a non-null `data` is
    /// rejected.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        let entry: Self = serde_json::from_str(raw)?;
        if entry.data.as_value().is_null() {
            return Err(<serde_json::Error as serde::de::Error>::custom(
                "cached entry has null data",
            ));
        }
        Ok(entry)
    }

    /// Milliseconds elapsed between `timestamp` and `now_ms`.
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.timestamp)
    }
}

/// Search suggestion returned by the location search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSuggestion {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub url: Option<String>,
}

impl LocationSuggestion {
    /// "Name, Region, Country" with empty parts left out.
    pub fn display_name(&self) -> String {
        [&self.name, &self.region, &self.country]
            .into_iter()
            .filter(|part| !part.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lon)
    }
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("API rate limit exceeded")]
    RateLimited,
    #[error("API returned status {0}")]
    Status(u16),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Incomplete or empty data from API: {0}")]
    Incomplete(String),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("No weather API key configured")]
    MissingApiKey,
}

impl WeatherError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
    }

    /// User-friendly error message for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Network(_) => "Unable to reach the weather service. Check your connection.",
            Self::RateLimited => "Too many weather requests. Please wait a moment.",
            Self::Status(code) if *code >= 500 => {
                "The weather service is having issues. Please try again later."
            }
            Self::Status(_) => "The weather request failed. Please try again.",
            Self::Parse(_) | Self::Incomplete(_) => {
                "Received unexpected weather data. Please try again."
            }
            Self::Store(_) => "Local weather storage failed.",
            Self::MissingApiKey => "No weather API key configured. Set WEATHER_API_KEY.",
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use serde_json::json;

    fn sample() -> WeatherDocument {
        WeatherDocument::new(json!({
            "location": {
                "name": "Singapore",
                "region": "",
                "country": "Singapore",
                "lat": 1.29,
                "lon": 103.86
            },
            "current": {
                "temp_c": 25.0,
                "temp_f": 77.0,
                "condition": { "text": "Partly cloudy" },
                "air_quality": { "us-epa-index": 2 }
            },
            "forecast": {
                "forecastday": [
                    {
                        "date": "2024-05-01",
                        "day": { "maxtemp_c": 31.2, "mintemp_c": 25.1, "condition": { "text": "Rain" } }
                    },
                    { "date": "2024-05-02" }
                ]
            }
        }))
    }

    #[test]
    fn test_validate_complete_document() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_and_null() {
        assert!(matches!(
            WeatherDocument::new(json!({})).validate(),
            Err(WeatherError::Incomplete(_))
        ));
        assert!(WeatherDocument::new(Value::Null).validate().is_err());
        assert!(WeatherDocument::new(json!([1, 2])).validate().is_err());
    }

    #[test]
    fn test_validate_requires_current_and_location() {
        let no_current = WeatherDocument::new(json!({ "location": { "name": "X" } }));
        let err = no_current.validate().unwrap_err();
        assert!(err.to_string().contains("current"));

        let no_location = WeatherDocument::new(json!({ "current": { "temp_c": 1 } }));
        let err = no_location.validate().unwrap_err();
        assert!(err.to_string().contains("location"));

        let null_location = WeatherDocument::new(json!({ "current": {}, "location": null }));
        assert!(null_location.validate().is_err());
    }

    #[test]
    fn test_accessors() {
        let doc = sample();
        assert_eq!(doc.location_name(), Some("Singapore"));
        assert_eq!(doc.country(), Some("Singapore"));
        assert_eq!(doc.temperature_c(), Some(25.0));
        assert_eq!(doc.condition(), Some("Partly cloudy"));
        assert_eq!(doc.us_epa_index(), Some(2));
        assert_eq!(doc.coordinates(), Some(Coordinates::new(1.29, 103.86)));
    }

    #[test]
    fn test_forecast_days_skip_incomplete_rows() {
        let days = sample().forecast_days();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].date, "2024-05-01");
        assert_eq!(days[0].condition, "Rain");
    }

    #[test]
    fn test_cache_entry_wire_format() {
        let entry = CacheEntry::new(WeatherDocument::new(json!({ "current": {} })), 1_700_000_000_000);
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value, json!({ "data": { "current": {} }, "timestamp": 1_700_000_000_000_i64 }));
    }

    #[test]
    fn test_cache_entry_rejects_foreign_json() {
        assert!(serde_json::from_str::<CacheEntry>("{\"foo\": 1}").is_err());
        assert!(serde_json::from_str::<CacheEntry>("{\"data\": {}}").is_err());
        assert!(serde_json::from_str::<CacheEntry>("invalid json").is_err());
    }

    #[test]
    fn test_cache_entry_parse_rejects_null_data() {
        assert!(CacheEntry::parse("{\"data\": null, \"timestamp\": 1}").is_err());
        assert!(CacheEntry::parse("null").is_err());

        let entry = CacheEntry::parse("{\"data\": {\"current\": {}}, \"timestamp\": 5}").unwrap();
        assert_eq!(entry.timestamp, 5);
        assert_eq!(entry.data.as_value(), &json!({ "current": {} }));
    }

    fn hourly_doc() -> WeatherDocument {
        let hours = |date: &str, base: f64| -> Vec<Value> {
            (0..24)
                .map(|h| {
                    json!({
                        "time": format!("{} {:02}:00", date, h),
                        "temp_c": base + f64::from(h),
                        "condition": { "text": "Clear" }
                    })
                })
                .collect()
        };
        WeatherDocument::new(json!({
            "location": { "name": "Singapore", "localtime": "2024-05-01 21:07" },
            "current": { "temp_c": 25.0 },
            "forecast": {
                "forecastday": [
                    { "date": "2024-05-01", "hour": hours("2024-05-01", 0.0) },
                    { "date": "2024-05-02", "hour": hours("2024-05-02", 100.0) }
                ]
            }
        }))
    }

    #[test]
    fn test_local_time() {
        let now = hourly_doc().local_time().unwrap();
        assert_eq!(now.to_string(), "2024-05-01 21:07:00");
        assert_eq!(sample().local_time(), None);
    }

    #[test]
    fn test_hourly_from_spans_midnight() {
        let doc = hourly_doc();
        let hours = doc.hourly_from(doc.local_time().unwrap());

        assert_eq!(hours.len(), 24);
        // 21:00, 22:00 and 23:00 today, then tomorrow from midnight
        assert_eq!(hours[0].time.to_string(), "2024-05-01 21:00:00");
        assert_eq!(hours[0].temp_c, 21.0);
        assert_eq!(hours[3].time.to_string(), "2024-05-02 00:00:00");
        assert_eq!(hours[23].time.to_string(), "2024-05-02 20:00:00");
        assert_eq!(hours[23].temp_c, 120.0);
        assert_eq!(hours[0].condition, "Clear");
    }

    #[test]
    fn test_hourly_from_midnight_stays_on_today() {
        let doc = hourly_doc();
        let midnight = NaiveDateTime::parse_from_str("2024-05-01 00:30", "%Y-%m-%d %H:%M").unwrap();
        let hours = doc.hourly_from(midnight);

        assert_eq!(hours.len(), 24);
        assert!(hours.iter().all(|h| h.temp_c < 100.0));
    }

    #[test]
    fn test_hourly_from_without_forecast_is_empty() {
        let doc = WeatherDocument::new(json!({ "current": {}, "location": {} }));
        let now = NaiveDateTime::parse_from_str("2024-05-01 12:00", "%Y-%m-%d %H:%M").unwrap();
        assert!(doc.hourly_from(now).is_empty());
        // Only today available: the list is short rather than padded
        assert_eq!(sample().hourly_from(now).len(), 0);
    }

    #[test]
    fn test_coordinates_query_keeps_precision() {
        assert_eq!(Coordinates::new(1.3521, 103.8198).as_query(), "1.3521,103.8198");
    }

    #[test]
    fn test_suggestion_display_name() {
        let s = LocationSuggestion {
            id: Some(1),
            name: "London".into(),
            region: "City of London, Greater London".into(),
            country: "United Kingdom".into(),
            lat: 51.52,
            lon: -0.11,
            url: None,
        };
        assert_eq!(
            s.display_name(),
            "London, City of London, Greater London, United Kingdom"
        );

        let bare = LocationSuggestion {
            region: String::new(),
            ..s
        };
        assert_eq!(bare.display_name(), "London, United Kingdom");
    }

    #[test]
    fn test_error_user_messages() {
        assert!(WeatherError::RateLimited.user_message().contains("Too many"));
        assert!(WeatherError::RateLimited.is_rate_limited());
        assert!(WeatherError::Status(503).user_message().contains("later"));
        assert!(!WeatherError::Status(404).is_rate_limited());
    }
}
