use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use skycast_core::{AppError, Config, WeatherError};
use skycast_weather::{
    CachePolicy, KeyValueStore, Reachability, SavedLocation, SavedLocations, SqliteStore,
    StaticReachability, TcpProbe, WeatherCache, WeatherDocument, WeatherProvider,
};

mod cli;

use cli::{CliArgs, Command, SavedAction};

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {}", e.user_message());
        tracing::error!(error = ?e, "SkyCast failed");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn bootstrap() -> Result<(), AppError> {
    let args = CliArgs::parse();

    skycast_core::init(if args.verbose { "debug" } else { "info" })?;

    let (config, _) = Config::load_validated()?;
    let app = Services::build(&config, args.offline)?;

    match args.command {
        Command::Weather {
            latitude,
            longitude,
        } => {
            let document = app.weather(latitude, longitude).await?;
            print_weather(&document);
        }
        Command::Search { query } => {
            let suggestions = app.provider.search(&query).await?;
            if suggestions.is_empty() {
                println!("No matches for \"{}\"", query);
            }
            for s in suggestions {
                println!("{}  ({}, {})", s.display_name(), s.lat, s.lon);
            }
        }
        Command::Saved { action } => run_saved(&app, action).await?,
    }

    Ok(())
}

/// Collaborators wired from configuration.
struct Services {
    provider: Arc<WeatherProvider>,
    cache: WeatherCache,
    saved: SavedLocations,
}

impl Services {
    fn build(config: &Config, offline: bool) -> Result<Self, AppError> {
        let db_path = config.cache_db_path();
        let store: Arc<dyn KeyValueStore> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open cache at {}", db_path.display()))?,
        );

        let reachability: Arc<dyn Reachability> = if offline {
            Arc::new(StaticReachability::offline())
        } else {
            Arc::new(TcpProbe::new(
                config.network.probe_host.clone(),
                config.network.probe_port,
                config.network.probe_timeout(),
            ))
        };

        let provider = Arc::new(
            WeatherProvider::with_options(
                config.weather.api_key.clone(),
                &config.weather.base_url,
                config.weather.request_timeout(),
            )?
            .with_days(config.weather.forecast_days),
        );

        let cache = WeatherCache::new(store.clone(), reachability, provider.clone()).with_policy(
            CachePolicy {
                fresh_for: config.weather.fresh_for(),
                stale_after: config.weather.stale_after(),
            },
        );

        Ok(Self {
            provider,
            cache,
            saved: SavedLocations::new(store),
        })
    }

    async fn weather(&self, latitude: f64, longitude: f64) -> Result<WeatherDocument, AppError> {
        self.cache
            .get_weather(latitude, longitude)
            .await
            .ok_or(AppError::Weather(WeatherError::NoData))
    }
}

async fn run_saved(app: &Services, action: SavedAction) -> Result<(), AppError> {
    match action {
        SavedAction::List => {
            let locations = app.saved.list().await?;
            if locations.is_empty() {
                println!("No saved locations");
            }
            for loc in locations {
                println!(
                    "{}, {}, {}  ({}, {})",
                    loc.name, loc.region, loc.country, loc.latitude, loc.longitude
                );
            }
        }
        SavedAction::Add {
            latitude,
            longitude,
        } => {
            let document = app.weather(latitude, longitude).await?;
            let location = SavedLocation::from_document(&document).ok_or_else(|| {
                AppError::Weather(WeatherError::InvalidData(
                    "weather data has no location".to_string(),
                ))
            })?;
            let name = location.name.clone();
            if app.saved.add(location).await? {
                println!("Saved {}", name);
            } else {
                println!("{} is already saved", name);
            }
        }
        SavedAction::Remove { name } => {
            let matches: Vec<SavedLocation> = app
                .saved
                .list()
                .await?
                .into_iter()
                .filter(|loc| loc.name.eq_ignore_ascii_case(&name))
                .collect();
            if matches.is_empty() {
                println!("No saved location named {}", name);
            }
            for loc in &matches {
                app.saved.remove(loc).await?;
                println!("Removed {}, {}, {}", loc.name, loc.region, loc.country);
            }
        }
    }
    Ok(())
}

fn print_weather(document: &WeatherDocument) {
    let place = [
        document.location_name(),
        document.region(),
        document.country(),
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(", ");
    println!("{}", if place.is_empty() { "Unknown location" } else { place.as_str() });

    if let Some(temp) = document.temperature_c() {
        let condition = document.condition().unwrap_or("");
        match document.temperature_f() {
            Some(f) => println!("  Now: {:.1}°C / {:.1}°F  {}", temp, f, condition),
            None => println!("  Now: {:.1}°C  {}", temp, condition),
        }
    }

    if let Some(index) = document.us_epa_index() {
        println!("  Air quality: {}", air_quality_label(index));
    }

    if let Some(now) = document.local_time() {
        let hours = document.hourly_from(now);
        if !hours.is_empty() {
            let line = hours
                .iter()
                .map(|hour| format!("{} {:.0}°", hour.time.format("%H:%M"), hour.temp_c))
                .collect::<Vec<_>>()
                .join("  ");
            println!("  Next hours: {}", line);
        }
    }

    for day in document.forecast_days() {
        println!(
            "  {}  {:>5.1}° / {:>5.1}°  {}",
            day.date, day.max_c, day.min_c, day.condition
        );
    }
}

fn air_quality_label(us_epa_index: u8) -> &'static str {
    match us_epa_index {
        1 => "Good",
        2 => "Moderate",
        3 => "Unhealthy for sensitive groups",
        4 => "Unhealthy",
        5 => "Very unhealthy",
        6 => "Hazardous",
        _ => "Unknown",
    }
}
