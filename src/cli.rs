use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    version,
    about = "Current weather, forecast and air quality with an offline cache"
)]
pub struct CliArgs {
    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Treat the network as unreachable and serve cached data only
    #[arg(long)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show weather for a coordinate pair
    Weather {
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
    },

    /// Search locations by name
    Search {
        /// Place name, at least three characters
        query: String,
    },

    /// Manage saved locations
    Saved {
        #[command(subcommand)]
        action: SavedAction,
    },
}

#[derive(Subcommand)]
pub enum SavedAction {
    /// List saved locations
    List,

    /// Save the location reported for a coordinate pair
    Add {
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
    },

    /// Remove saved locations with this name
    Remove {
        name: String,
    },
}
