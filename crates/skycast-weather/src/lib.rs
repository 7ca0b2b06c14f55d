//! Weather retrieval for SkyCast
//!
//! Fetches forecast and air-quality documents from weatherapi.com and keeps
//! them in a persistent key-value cache that keeps working offline.

pub mod cache;
pub mod provider;
pub mod reachability;
pub mod saved;
pub mod store;
pub mod types;

pub use cache::{cache_key, CachePolicy, Clock, WeatherCache};
pub use provider::{ForecastSource, WeatherProvider, DEFAULT_BASE_URL};
pub use reachability::{Reachability, StaticReachability, TcpProbe};
pub use saved::{SavedLocation, SavedLocations};
pub use store::{KeyValueStore, MemoryStore, SqliteStore, StoreError, StoreResult};
pub use types::*;
