//! User's saved ("liked") locations, kept as one JSON array in the
//! key-value store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::store::{KeyValueStore, StoreResult};
use crate::types::WeatherDocument;

const SAVED_LOCATIONS_KEY: &str = "savedLocations";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedLocation {
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl SavedLocation {
    /// Build from the `location` section of a fetched document.
    pub fn from_document(document: &WeatherDocument) -> Option<Self> {
        let coords = document.coordinates()?;
        Some(Self {
            name: document.location_name()?.to_string(),
            region: document.region().unwrap_or_default().to_string(),
            country: document.country().unwrap_or_default().to_string(),
            latitude: coords.latitude,
            longitude: coords.longitude,
        })
    }

    /// Two entries are the same place when name, region and country match.
    pub fn same_place(&self, other: &SavedLocation) -> bool {
        self.name == other.name && self.region == other.region && self.country == other.country
    }
}

pub struct SavedLocations {
    store: Arc<dyn KeyValueStore>,
}

impl SavedLocations {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// All saved locations in insertion order.
    ///
    /// # Errors
    /// Store read failures. An unreadable list is logged and treated as empty.
    pub async fn list(&self) -> StoreResult<Vec<SavedLocation>> {
        let Some(raw) = self.store.get(SAVED_LOCATIONS_KEY).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(locations) => Ok(locations),
            Err(e) => {
                tracing::warn!("Ignoring unreadable saved locations: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// # Errors
    /// Store read failures.
    pub async fn contains(&self, location: &SavedLocation) -> StoreResult<bool> {
        Ok(self
            .list()
            .await?
            .iter()
            .any(|saved| saved.same_place(location)))
    }

    /// Save a location. Returns `false` if it was already saved.
    ///
    /// # Errors
    /// Store read/write failures.
    pub async fn add(&self, location: SavedLocation) -> StoreResult<bool> {
        let mut locations = self.list().await?;
        if locations.iter().any(|saved| saved.same_place(&location)) {
            tracing::debug!("Location {} already saved", location.name);
            return Ok(false);
        }
        tracing::info!("Saving location {}", location.name);
        locations.push(location);
        self.write(&locations).await?;
        Ok(true)
    }

    /// Remove a location. Returns `false` if it was not saved.
    ///
    /// # Errors
    /// Store read/write failures.
    pub async fn remove(&self, location: &SavedLocation) -> StoreResult<bool> {
        let mut locations = self.list().await?;
        let before = locations.len();
        locations.retain(|saved| !saved.same_place(location));
        if locations.len() == before {
            return Ok(false);
        }
        tracing::info!("Removed saved location {}", location.name);
        self.write(&locations).await?;
        Ok(true)
    }

    /// Flip the saved state of a location; returns the new state.
    ///
    /// # Errors
    /// Store read/write failures.
    pub async fn toggle(&self, location: SavedLocation) -> StoreResult<bool> {
        if self.contains(&location).await? {
            self.remove(&location).await?;
            Ok(false)
        } else {
            self.add(location).await?;
            Ok(true)
        }
    }

    async fn write(&self, locations: &[SavedLocation]) -> StoreResult<()> {
        let json = serde_json::to_string(locations)?;
        self.store.set(SAVED_LOCATIONS_KEY, &json).await
    }
}
