use crate::config::InputConfig;
use crate::types::CrimeRecord;
use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use geo::MultiPolygon;
use geojson::{Feature, FeatureCollection, GeoJson};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{info, warn};

/// Loads the crime-rank records named by `input.crime_data`.
///
/// No file configured means no data, which is not an error: the map still
/// renders with a collapsed scale.
pub fn load_crime_records(input: &InputConfig) -> Result<Vec<CrimeRecord>> {
    let Some(path) = &input.crime_data else {
        warn!("No crime data configured; every zone will be unranked");
        return Ok(Vec::new());
    };

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .ok_or_else(|| anyhow!("Crime data file has no extension: {:?}", path))?;

    let records = match extension.as_str() {
        "json" => load_crime_json(path, input)?,
        "csv" => load_crime_csv(path, input)?,
        _ => return Err(anyhow!("Unsupported crime data format: {}", extension)),
    };

    info!("Loaded {} crime records from {:?}", records.len(), path);
    Ok(records)
}

fn load_crime_json(path: &Path, input: &InputConfig) -> Result<Vec<CrimeRecord>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open crime data: {:?}", path))?;
    let rows: Vec<Map<String, Value>> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Crime data must be a JSON array of objects: {:?}", path))?;

    let mut records = Vec::with_capacity(rows.len());
    let mut skipped = 0;
    for row in &rows {
        let Some(id) = row.get(&input.crime_key).and_then(value_to_id) else {
            skipped += 1;
            continue;
        };
        match row.get(&input.rank_field).and_then(value_to_rank) {
            Some(rank) => records.push(CrimeRecord::new(id, rank)),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(
            "Skipped {} crime rows without a usable '{}' or '{}'",
            skipped, input.crime_key, input.rank_field
        );
    }
    Ok(records)
}

fn load_crime_csv(path: &Path, input: &InputConfig) -> Result<Vec<CrimeRecord>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open CSV file: {:?}", path))?;
    let mut rdr = ReaderBuilder::new().from_reader(file);
    let headers = rdr.headers()?.clone();

    let key_idx = headers
        .iter()
        .position(|h| h == input.crime_key)
        .ok_or_else(|| anyhow!("Join column '{}' not found in CSV", input.crime_key))?;
    let rank_idx = headers
        .iter()
        .position(|h| h == input.rank_field)
        .ok_or_else(|| anyhow!("Rank column '{}' not found in CSV", input.rank_field))?;

    let mut records = Vec::new();
    let mut skipped = 0;
    for result in rdr.records() {
        let record = result?;
        let id = record.get(key_idx).unwrap_or("").trim();
        if id.is_empty() {
            skipped += 1;
            continue;
        }
        let rank = record
            .get(rank_idx)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|r| r.is_finite());
        match rank {
            Some(rank) => records.push(CrimeRecord::new(id, rank)),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!("Skipped {} CSV rows without a usable id or rank", skipped);
    }
    Ok(records)
}

/// Reads the boundary FeatureCollection into memory.
pub fn load_boundaries(path: &Path) -> Result<FeatureCollection> {
    info!("Loading boundaries from {:?}...", path);
    let file =
        File::open(path).with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
    let geojson = GeoJson::from_reader(BufReader::new(file)).context("Failed to parse GeoJSON")?;

    match geojson {
        GeoJson::FeatureCollection(fc) => {
            info!("Loaded {} boundary features", fc.features.len());
            Ok(fc)
        }
        _ => Err(anyhow!("Boundary GeoJSON must be a FeatureCollection")),
    }
}

/// Zone id of a feature: a string property, or a number rendered as text.
pub fn feature_zone_id(feature: &Feature, key: &str) -> Option<String> {
    feature
        .properties
        .as_ref()
        .and_then(|props| props.get(key))
        .and_then(value_to_id)
}

/// Areal geometry of a feature. `Ok(None)` for features with no geometry or
/// a point/line geometry.
pub fn feature_geometry(feature: &Feature) -> Result<Option<MultiPolygon<f64>>> {
    let Some(geometry) = &feature.geometry else {
        return Ok(None);
    };
    let converted: geo::Geometry<f64> = geometry
        .value
        .clone()
        .try_into()
        .map_err(|e| anyhow!("Failed to convert geojson geometry: {:?}", e))?;

    Ok(match converted {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p])),
        _ => None,
    })
}

fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// Non-finite ranks would turn every scale threshold into NaN.
fn value_to_rank(value: &Value) -> Option<f64> {
    let rank = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    rank.filter(|r: &f64| r.is_finite())
}
