use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

/// One row of the crime-domain dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrimeRecord {
    #[serde(rename = "Data_Zone")]
    pub data_zone: String,
    #[serde(rename = "SIMD2020_Crime_Domain_Rank")]
    pub crime_rank: f64,
}

impl CrimeRecord {
    pub fn new(data_zone: impl Into<String>, crime_rank: f64) -> Self {
        Self {
            data_zone: data_zone.into(),
            crime_rank,
        }
    }
}

/// A boundary feature after the join.
#[derive(Debug, Clone)]
pub struct DataZone {
    pub id: String,
    pub name: String,
    pub geometry: MultiPolygon<f64>,
    pub crime_rank: Option<f64>,
}

impl DataZone {
    pub fn properties(&self) -> ZoneProperties {
        ZoneProperties {
            data_zone: self.id.clone(),
            name: self.name.clone(),
            crime_rank: self.crime_rank,
        }
    }
}

/// Typed view of the properties the popup reads from a feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneProperties {
    #[serde(rename = "DataZone")]
    pub data_zone: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "crimeRank", default, skip_serializing_if = "Option::is_none")]
    pub crime_rank: Option<f64>,
}
