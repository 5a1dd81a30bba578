use crate::config::{AppConfig, MapConfig};
use crate::map::CrimeMap;
use crate::scale::Rgba;
use anyhow::{Context, Result};
use image::{ImageBuffer, RgbaImage};
use rayon::prelude::*;
use std::f64::consts::PI;
use std::fs::{self, File};
use std::io::BufWriter;
use tracing::{debug, info, warn};

// Constants for Web Mercator
const TILE_SIZE: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

/// Renders choropleth tiles for every zoom level in the config, then writes
/// the joined GeoJSON and the layer style next to them. Returns the number
/// of tiles written; tiles with nothing on them are not saved.
pub fn generate_tiles(config: &AppConfig, map: &CrimeMap) -> Result<usize> {
    info!(
        "Generating tiles from min_zoom {} to max_zoom {}...",
        config.output.min_zoom, config.output.max_zoom
    );
    fs::create_dir_all(&config.output.tile_dir).with_context(|| {
        format!("Failed to create tile directory: {:?}", config.output.tile_dir)
    })?;

    let tiles: Vec<TileCoord> = (config.output.min_zoom..=config.output.max_zoom)
        .flat_map(|z| tiles_covering(&map.view, z))
        .collect();
    let fills = zone_fills(map);

    let written = tiles
        .par_iter()
        .map(|tile| -> Result<bool> {
            let img = render_tile(map, &fills, *tile);
            if img.pixels().all(|p| p.0[3] == 0) {
                return Ok(false);
            }
            let x_dir = config
                .output
                .tile_dir
                .join(tile.z.to_string())
                .join(tile.x.to_string());
            fs::create_dir_all(&x_dir).context("Failed to create tile directory")?;
            let path = x_dir.join(format!("{}.png", tile.y));
            img.save(&path)
                .with_context(|| format!("Failed to save tile {:?}", path))?;
            Ok(true)
        })
        .collect::<Result<Vec<bool>>>()?
        .into_iter()
        .filter(|&w| w)
        .count();

    info!("Wrote {} of {} candidate tiles", written, tiles.len());
    if written == 0 {
        warn!("No zone intersects the map bounds; check [map] and the boundary file");
    }

    write_sidecars(config, map)?;
    Ok(written)
}

/// `zones.geojson` (boundaries with `crimeRank`) and `style.json`.
fn write_sidecars(config: &AppConfig, map: &CrimeMap) -> Result<()> {
    let zones_path = config.output.tile_dir.join("zones.geojson");
    let file = File::create(&zones_path)
        .with_context(|| format!("Failed to create {:?}", zones_path))?;
    serde_json::to_writer(BufWriter::new(file), &map.collection)
        .with_context(|| format!("Failed to write {:?}", zones_path))?;

    let style_path = config.output.tile_dir.join("style.json");
    let file = File::create(&style_path)
        .with_context(|| format!("Failed to create {:?}", style_path))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &map.style())
        .with_context(|| format!("Failed to write {:?}", style_path))?;

    debug!("Wrote {:?} and {:?}", zones_path, style_path);
    Ok(())
}

/// Fill of each zone with the layer opacity applied.
fn zone_fills(map: &CrimeMap) -> Vec<Rgba> {
    map.zones
        .iter()
        .map(|zone| {
            let color = map.fill_color(zone);
            color.with_alpha(color.a * map.fill_opacity)
        })
        .collect()
}

/// Tiles at `zoom` that overlap the map bounds.
pub fn tiles_covering(view: &MapConfig, zoom: u8) -> Vec<TileCoord> {
    let [west, south] = view.south_west;
    let [east, north] = view.north_east;
    let last = (1u32 << zoom) - 1;

    let (x0, y0, _, _) = lat_lon_to_tile_pixel(north, west, zoom);
    let (x1, y1, _, _) = lat_lon_to_tile_pixel(south, east, zoom);

    let mut tiles = Vec::new();
    for x in x0.min(last)..=x1.min(last) {
        for y in y0.min(last)..=y1.min(last) {
            tiles.push(TileCoord { z: zoom, x, y });
        }
    }
    tiles
}

/// Paints one tile. Pixels take the fill of the zone under their centre;
/// pixels bordering another zone (or nothing) take the outline color.
pub fn render_tile(map: &CrimeMap, fills: &[Rgba], tile: TileCoord) -> RgbaImage {
    let size = TILE_SIZE as usize;
    // One pixel of margin so zone edges on the tile seam are still found.
    let span = size + 2;
    let mut owners: Vec<Option<usize>> = vec![None; span * span];
    for row in 0..span {
        for col in 0..span {
            let px = col as f64 - 0.5;
            let py = row as f64 - 0.5;
            let (lon, lat) = tile_pixel_to_lon_lat(tile, px, py);
            owners[row * span + col] = map.zone_index_at(lon, lat);
        }
    }

    let outline = map.outline.with_alpha(map.outline.a * map.fill_opacity);
    let mut img: RgbaImage = ImageBuffer::new(TILE_SIZE, TILE_SIZE);
    for y in 0..size {
        for x in 0..size {
            let (cx, cy) = (x + 1, y + 1);
            let Some(zone) = owners[cy * span + cx] else {
                continue;
            };
            let neighbours = [(cx - 1, cy), (cx + 1, cy), (cx, cy - 1), (cx, cy + 1)];
            let edge = neighbours
                .iter()
                .any(|&(nx, ny)| owners[ny * span + nx] != Some(zone));
            let color = if edge { outline } else { fills[zone] };
            img.put_pixel(x as u32, y as u32, image::Rgba(color.to_pixel()));
        }
    }
    img
}

// Coordinate conversions
pub fn lat_lon_to_tile_pixel(lat: f64, lon: f64, zoom: u8) -> (u32, u32, u32, u32) {
    let n = 2.0_f64.powi(zoom as i32);
    let x_t = (lon + 180.0) / 360.0 * n;
    let lat_rad = lat.to_radians();
    let y_t = (1.0 - (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() / PI) / 2.0 * n;

    let tx = x_t as u32;
    let ty = y_t as u32;

    let px = ((x_t - tx as f64) * TILE_SIZE as f64) as u32;
    let py = ((y_t - ty as f64) * TILE_SIZE as f64) as u32;

    (tx, ty, px, py)
}

/// Longitude and latitude of a (fractional) pixel position within a tile.
pub fn tile_pixel_to_lon_lat(tile: TileCoord, px: f64, py: f64) -> (f64, f64) {
    let n = 2.0_f64.powi(tile.z as i32);
    let x_t = tile.x as f64 + px / TILE_SIZE as f64;
    let y_t = tile.y as f64 + py / TILE_SIZE as f64;
    let lon = x_t / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y_t / n)).sinh().atan().to_degrees();
    (lon, lat)
}
