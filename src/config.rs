use crate::scale::{build_interpolation, build_interpolation_with, ColorStop, Rgba, PALETTE_LEN};
use crate::stats::RankRange;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const MAX_ZOOM: u8 = 22;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub scale: ScaleConfig,
    #[serde(default)]
    pub map: MapConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

// Boundary file keys zones by `DataZone`, crime file by `Data_Zone`
#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub boundaries: PathBuf,
    pub crime_data: Option<PathBuf>,
    #[serde(default = "default_boundary_key")]
    pub boundary_key: String,
    #[serde(default = "default_name_key")]
    pub name_key: String,
    #[serde(default = "default_crime_key")]
    pub crime_key: String,
    #[serde(default = "default_rank_field")]
    pub rank_field: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScaleConfig {
    #[serde(default)]
    pub colors: Option<Vec<String>>,
    #[serde(default = "default_fill_opacity")]
    pub fill_opacity: f64,
    #[serde(default = "default_outline_color")]
    pub outline_color: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct MapConfig {
    // [lon, lat]
    #[serde(default = "default_south_west")]
    pub south_west: [f64; 2],
    #[serde(default = "default_north_east")]
    pub north_east: [f64; 2],
    #[serde(default = "default_padding")]
    pub padding: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub tile_dir: PathBuf,
    #[serde(default = "default_min_zoom")]
    pub min_zoom: u8,
    #[serde(default = "default_max_zoom")]
    pub max_zoom: u8,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_boundary_key() -> String {
    "DataZone".to_string()
}

fn default_name_key() -> String {
    "Name".to_string()
}

fn default_crime_key() -> String {
    "Data_Zone".to_string()
}

fn default_rank_field() -> String {
    "SIMD2020_Crime_Domain_Rank".to_string()
}

fn default_fill_opacity() -> f64 {
    0.5
}

fn default_outline_color() -> String {
    "#000".to_string()
}

fn default_south_west() -> [f64; 2] {
    [-4.43, 55.77]
}

fn default_north_east() -> [f64; 2] {
    [-4.05, 55.97]
}

fn default_padding() -> u32 {
    120
}

fn default_min_zoom() -> u8 {
    10
}

fn default_max_zoom() -> u8 {
    14
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            colors: None,
            fill_opacity: default_fill_opacity(),
            outline_color: default_outline_color(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            south_west: default_south_west(),
            north_east: default_north_east(),
            padding: default_padding(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ScaleConfig {
    pub fn build_stops(&self, range: RankRange) -> Vec<ColorStop> {
        match &self.colors {
            Some(colors) => build_interpolation_with(range.min, range.max, colors),
            None => build_interpolation(range.min, range.max),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let colors = self.scale.colors.as_deref().unwrap_or_default();
        if self.scale.colors.is_some() && colors.len() != PALETTE_LEN {
            return Err(anyhow!(
                "scale.colors must list exactly {} colors, got {}",
                PALETTE_LEN,
                colors.len()
            ));
        }
        for color in colors.iter().chain([&self.scale.outline_color]) {
            color
                .parse::<Rgba>()
                .with_context(|| format!("Invalid color in [scale]: {:?}", color))?;
        }
        if !(0.0..=1.0).contains(&self.scale.fill_opacity) {
            return Err(anyhow!(
                "scale.fill_opacity must be within [0, 1], got {}",
                self.scale.fill_opacity
            ));
        }
        if self.output.max_zoom > MAX_ZOOM {
            return Err(anyhow!(
                "output.max_zoom ({}) is above the supported maximum of {}",
                self.output.max_zoom,
                MAX_ZOOM
            ));
        }
        if self.output.min_zoom > self.output.max_zoom {
            return Err(anyhow!(
                "output.min_zoom ({}) is greater than output.max_zoom ({})",
                self.output.min_zoom,
                self.output.max_zoom
            ));
        }
        let [west, south] = self.map.south_west;
        let [east, north] = self.map.north_east;
        if west >= east || south >= north {
            return Err(anyhow!(
                "map bounds are not ordered south-west to north-east: {:?} {:?}",
                self.map.south_west,
                self.map.north_east
            ));
        }
        Ok(())
    }
}
