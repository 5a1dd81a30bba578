use crate::data::feature_zone_id;
use crate::scale::RANK_PROPERTY;
use crate::types::CrimeRecord;
use geojson::FeatureCollection;
use serde_json::{Map, Value};

/// Rank of the first record for `zone_id`, in input order.
///
/// Ids are compared byte for byte. A miss (or no records at all) is `None`.
pub fn lookup_crime_rank(zone_id: &str, records: &[CrimeRecord]) -> Option<f64> {
    records
        .iter()
        .find(|r| r.data_zone == zone_id)
        .map(|r| r.crime_rank)
}

/// Copy of `collection` with each feature's rank under `crimeRank`.
///
/// Features whose `boundary_key` matches no record, or that have no such
/// key, carry no `crimeRank` at all.
pub fn augment_collection(
    collection: &FeatureCollection,
    boundary_key: &str,
    records: &[CrimeRecord],
) -> FeatureCollection {
    let mut augmented = collection.clone();
    for feature in &mut augmented.features {
        let rank = feature_zone_id(feature, boundary_key)
            .and_then(|id| lookup_crime_rank(&id, records));
        let props = feature.properties.get_or_insert_with(Map::new);
        match rank {
            Some(rank) => {
                props.insert(RANK_PROPERTY.to_string(), Value::from(rank));
            }
            None => {
                props.remove(RANK_PROPERTY);
            }
        }
    }
    augmented
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::Feature;
    use serde_json::json;

    fn feature(props: Value) -> Feature {
        Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: props.as_object().cloned(),
            foreign_members: None,
        }
    }

    fn collection(features: Vec<Feature>) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }

    fn sample() -> Vec<CrimeRecord> {
        vec![
            CrimeRecord::new("S01003025", 188.0),
            CrimeRecord::new("S01003054", 4021.0),
            CrimeRecord::new("S01003054", 12.0),
        ]
    }

    #[test]
    fn test_lookup_hit() {
        assert_eq!(lookup_crime_rank("S01003025", &sample()), Some(188.0));
    }

    #[test]
    fn test_lookup_first_duplicate_wins() {
        assert_eq!(lookup_crime_rank("S01003054", &sample()), Some(4021.0));
    }

    #[test]
    fn test_lookup_miss() {
        assert_eq!(lookup_crime_rank("S01009999", &sample()), None);
    }

    #[test]
    fn test_lookup_empty() {
        assert_eq!(lookup_crime_rank("S01003054", &[]), None);
    }

    #[test]
    fn test_lookup_is_exact() {
        assert_eq!(lookup_crime_rank("s01003025", &sample()), None);
        assert_eq!(lookup_crime_rank(" S01003025", &sample()), None);
    }

    #[test]
    fn test_augment_adds_rank_and_keeps_properties() {
        let fc = collection(vec![feature(json!({
            "DataZone": "S01003025",
            "Name": "Carmyle - 01"
        }))]);
        let out = augment_collection(&fc, "DataZone", &sample());
        let props = out.features[0].properties.as_ref().unwrap();
        assert_eq!(props["crimeRank"], json!(188.0));
        assert_eq!(props["Name"], json!("Carmyle - 01"));
        // The input is untouched.
        assert!(fc.features[0].properties.as_ref().unwrap().get("crimeRank").is_none());
    }

    #[test]
    fn test_augment_unmatched_has_no_rank() {
        let fc = collection(vec![
            feature(json!({"DataZone": "S01009999", "crimeRank": 3})),
            feature(json!({"Name": "No id"})),
        ]);
        let out = augment_collection(&fc, "DataZone", &sample());
        for f in &out.features {
            assert!(f.properties.as_ref().unwrap().get("crimeRank").is_none());
        }
    }

    #[test]
    fn test_augment_uses_boundary_key() {
        let fc = collection(vec![feature(json!({"Data_Zone": "S01003025"}))]);
        let missed = augment_collection(&fc, "DataZone", &sample());
        assert!(missed.features[0].properties.as_ref().unwrap().get("crimeRank").is_none());

        let hit = augment_collection(&fc, "Data_Zone", &sample());
        assert_eq!(hit.features[0].properties.as_ref().unwrap()["crimeRank"], json!(188.0));
    }

    #[test]
    fn test_augment_without_records() {
        let fc = collection(vec![feature(json!({"DataZone": "S01003025"}))]);
        let out = augment_collection(&fc, "DataZone", &[]);
        assert!(out.features[0].properties.as_ref().unwrap().get("crimeRank").is_none());
    }
}
