pub mod config;
pub mod data;
pub mod join;
pub mod map;
mod page;
pub mod popup;
pub mod render;
pub mod scale;
pub mod server;
pub mod stats;
pub mod types;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the choropleth tiles plus the joined GeoJSON and layer style
    Generate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Serve the tiles, the hover/click API and the map page
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Print the rank range and the color stops
    Scale {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Print the stops as the flat threshold/color list
        #[arg(long)]
        json: bool,
    },
    /// Print the popup for a coordinate
    Popup {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Generate { config } => {
            info!("Generating map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            // 1. Load, join and scale
            let crime_map = map::CrimeMap::load(&app_config)?;

            // 2. Render tiles, zones.geojson and style.json
            render::generate_tiles(&app_config, &crime_map)?;
            info!("Generation complete!");
        }
        Commands::Serve { config } => {
            info!("Serving map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;
            // Loaded once; every request reads the same immutable map.
            let crime_map = map::CrimeMap::load(&app_config)?;
            server::start_server(app_config, crime_map).await?;
        }
        Commands::Scale { config, json } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            let records = data::load_crime_records(&app_config.input)?;
            let range = stats::compute_min_max(&records);
            let stops = app_config.scale.build_stops(range);
            println!("{}", scale_report(range, &stops, *json)?);
        }
        Commands::Popup { config, lat, lon } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            let crime_map = map::CrimeMap::load(&app_config)?;
            println!("{}", popup_report(&crime_map, *lat, *lon));
        }
    }

    Ok(())
}

fn scale_report(
    range: stats::RankRange,
    stops: &[scale::ColorStop],
    json: bool,
) -> anyhow::Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(&scale::flatten_stops(stops))?);
    }
    let mut out = format!("Crime rank range: {} to {}", range.min, range.max);
    for stop in stops {
        out.push_str(&format!("\n{:>10}  {}", stop.threshold, stop.color));
    }
    Ok(out)
}

fn popup_report(crime_map: &map::CrimeMap, lat: f64, lon: f64) -> String {
    match crime_map.popup_at(lon, lat) {
        Some(popup) => popup.to_string(),
        None => format!("No data zone at {}, {}", lat, lon),
    }
}
