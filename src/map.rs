use crate::config::{AppConfig, MapConfig, ScaleConfig};
use crate::data::{self, feature_geometry, feature_zone_id};
use crate::join::augment_collection;
use crate::popup::Popup;
use crate::scale::{fill_color_expression, ColorScale, ColorStop, Rgba, RANK_PROPERTY};
use crate::stats::{compute_min_max, RankRange};
use crate::types::{CrimeRecord, DataZone};
use anyhow::Result;
use geo::{BoundingRect, Contains, Point};
use geojson::FeatureCollection;
use rstar::{RTree, RTreeObject, AABB};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

pub const LAYER_ID: &str = "data-zones-layer";

// Wrapper for RTree indexing
struct ZoneIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for ZoneIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

pub struct CrimeMap {
    pub zones: Vec<DataZone>,
    pub collection: FeatureCollection,
    pub range: RankRange,
    pub stops: Vec<ColorStop>,
    pub scale: ColorScale,
    pub fill_opacity: f64,
    pub outline: Rgba,
    pub view: MapConfig,
    tree: RTree<ZoneIndex>,
}

impl CrimeMap {
    pub fn load(config: &AppConfig) -> Result<Self> {
        // 1. Load boundaries and crime data
        let boundaries = data::load_boundaries(&config.input.boundaries)?;
        let records = data::load_crime_records(&config.input)?;

        // 2. Join and build the scale
        Self::build(config, &boundaries, &records)
    }

    pub fn build(
        config: &AppConfig,
        boundaries: &FeatureCollection,
        records: &[CrimeRecord],
    ) -> Result<Self> {
        let range = compute_min_max(records);
        let stops = config.scale.build_stops(range);
        let scale = ColorScale::new(&stops)?;
        info!("Crime rank range {} to {}", range.min, range.max);

        let collection = augment_collection(boundaries, &config.input.boundary_key, records);
        let zones = collect_zones(config, &collection)?;

        let unranked = zones.iter().filter(|z| z.crime_rank.is_none()).count();
        if unranked > 0 {
            warn!(
                "{} of {} zones have no crime rank ('{}' matched no '{}')",
                unranked,
                zones.len(),
                config.input.boundary_key,
                config.input.crime_key
            );
        }

        debug!("Building spatial index for {} zones", zones.len());
        let tree_items: Vec<ZoneIndex> = zones
            .iter()
            .enumerate()
            .filter_map(|(i, zone)| {
                let rect = zone.geometry.bounding_rect()?;
                Some(ZoneIndex {
                    index: i,
                    aabb: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                })
            })
            .collect();

        Ok(Self {
            zones,
            collection,
            range,
            stops,
            scale,
            fill_opacity: config.scale.fill_opacity,
            outline: outline_color(&config.scale)?,
            view: config.map,
            tree: RTree::bulk_load(tree_items),
        })
    }

    // Overlaps resolve to the zone drawn last, i.e. the topmost one.
    pub fn zone_index_at(&self, lon: f64, lat: f64) -> Option<usize> {
        let point = Point::new(lon, lat);
        let envelope = AABB::from_point([lon, lat]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|candidate| candidate.index)
            .filter(|&i| self.zones[i].geometry.contains(&point))
            .max()
    }

    pub fn zone_at(&self, lon: f64, lat: f64) -> Option<&DataZone> {
        self.zone_index_at(lon, lat).map(|i| &self.zones[i])
    }

    pub fn popup_at(&self, lon: f64, lat: f64) -> Option<Popup> {
        self.zone_at(lon, lat)
            .map(|zone| Popup::new(lon, lat, &zone.properties()))
    }

    pub fn fill_color(&self, zone: &DataZone) -> Rgba {
        self.scale.color_at(zone.crime_rank)
    }

    pub fn style(&self) -> Value {
        let bounds = [self.view.south_west, self.view.north_east];
        json!({
            "layer": {
                "id": LAYER_ID,
                "type": "fill",
                "paint": {
                    "fill-color": fill_color_expression(&self.stops),
                    "fill-opacity": self.fill_opacity,
                    "fill-outline-color": self.outline.to_string(),
                },
            },
            "bounds": bounds,
            "maxBounds": bounds,
            "padding": self.view.padding,
        })
    }
}

fn outline_color(scale: &ScaleConfig) -> Result<Rgba> {
    scale.outline_color.parse()
}

fn collect_zones(config: &AppConfig, collection: &FeatureCollection) -> Result<Vec<DataZone>> {
    let mut zones = Vec::with_capacity(collection.features.len());
    for feature in &collection.features {
        let Some(id) = feature_zone_id(feature, &config.input.boundary_key) else {
            warn!(
                "Skipping boundary feature without '{}'",
                config.input.boundary_key
            );
            continue;
        };
        let Some(geometry) = feature_geometry(feature)? else {
            warn!("Skipping zone {} with no polygon geometry", id);
            continue;
        };

        let props = feature.properties.as_ref();
        let name = props
            .and_then(|p| p.get(&config.input.name_key))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let crime_rank = props
            .and_then(|p| p.get(RANK_PROPERTY))
            .and_then(|v| v.as_f64());

        zones.push(DataZone {
            id,
            name,
            geometry,
            crime_rank,
        });
    }
    Ok(zones)
}
