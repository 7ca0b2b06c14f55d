//! Centralized error types for SkyCast.
//!
//! Typed errors keep full context for logging while `user_message()` gives a
//! short, non-technical message for display.

use skycast_weather::{StoreError, WeatherError as ProviderError};
use thiserror::Error;

/// Top-level application error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Weather service error: {0}")]
    Weather(#[from] WeatherError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Storage(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Weather(e) => e.user_message(),
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status}")]
    ServerError { status: u16 },

    #[error("Rate limited")]
    RateLimited,
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Unable to connect. Check your internet connection."
            }
            NetworkError::Timeout => "The request timed out. Please try again.",
            NetworkError::ServerError { status } if *status >= 500 => {
                "The server is experiencing issues. Please try again later."
            }
            NetworkError::ServerError { .. } => "The request failed. Please try again.",
            NetworkError::RateLimited => "Too many requests. Please wait a moment.",
        }
    }
}

/// Local storage errors (cache database, saved locations).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Data corruption detected: {0}")]
    Corruption(String),
}

impl StorageError {
    pub fn user_message(&self) -> &'static str {
        match self {
            StorageError::Database(_) => "Unable to access local data. Try again.",
            StorageError::Corruption(_) => {
                "Local data may be corrupted. Consider clearing the cache."
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::MissingSetting(_) => {
                "A required setting is missing. Check your settings."
            }
        }
    }
}

/// Weather service errors that are not plain transport failures.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Invalid weather data: {0}")]
    InvalidData(String),

    #[error("No weather data available")]
    NoData,
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::InvalidData(_) => "Received unexpected weather data. Please try again.",
            WeatherError::NoData => "Could not fetch weather data.",
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Serialization(inner) => {
                AppError::Storage(StorageError::Corruption(inner.to_string()))
            }
            StoreError::Database(inner) => {
                AppError::Storage(StorageError::Database(inner.to_string()))
            }
            StoreError::Io(inner) => AppError::Io(inner),
            StoreError::Task(inner) => {
                AppError::Storage(StorageError::Database(inner.to_string()))
            }
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Network(inner) if inner.is_timeout() => {
                AppError::Network(NetworkError::Timeout)
            }
            ProviderError::Network(inner) => {
                AppError::Network(NetworkError::ConnectionFailed(inner.to_string()))
            }
            ProviderError::RateLimited => AppError::Network(NetworkError::RateLimited),
            ProviderError::Status(status) => AppError::Network(NetworkError::ServerError { status }),
            ProviderError::Parse(msg) | ProviderError::Incomplete(msg) => {
                AppError::Weather(WeatherError::InvalidData(msg))
            }
            ProviderError::Store(inner) => AppError::from(inner),
            ProviderError::MissingApiKey => {
                AppError::Config(ConfigError::MissingSetting("weather.api_key".to_string()))
            }
        }
    }
}
