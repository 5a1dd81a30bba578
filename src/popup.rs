use crate::types::ZoneProperties;
use serde::Serialize;
use std::fmt;

/// What the map shows under the cursor on hover or click.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Popup {
    pub longitude: f64,
    pub latitude: f64,
    pub data_zone: String,
    pub name: String,
    pub crime_rank: Option<f64>,
}

impl Popup {
    pub fn new(longitude: f64, latitude: f64, properties: &ZoneProperties) -> Self {
        Self {
            longitude,
            latitude,
            data_zone: properties.data_zone.clone(),
            name: short_name(&properties.name).to_string(),
            crime_rank: properties.crime_rank,
        }
    }
}

/// Zone names look like `"Dennistoun North - 02"`; the popup keeps the part
/// before the first `" - "`.
pub fn short_name(name: &str) -> &str {
    name.split(" - ").next().unwrap_or(name)
}

impl fmt::Display for Popup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Data Zone: {}", self.data_zone)?;
        writeln!(f, "Name: {}", self.name)?;
        match self.crime_rank {
            Some(rank) => write!(f, "SIMD Crime Rank: {}", rank),
            None => write!(f, "SIMD Crime Rank:"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(name: &str, rank: Option<f64>) -> ZoneProperties {
        ZoneProperties {
            data_zone: "S01003054".to_string(),
            name: name.to_string(),
            crime_rank: rank,
        }
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("Dennistoun North - 02"), "Dennistoun North");
        assert_eq!(short_name("Carmyle"), "Carmyle");
        assert_eq!(short_name("A - B - C"), "A");
        assert_eq!(short_name("Hyphen-ated - 01"), "Hyphen-ated");
        assert_eq!(short_name(""), "");
    }

    #[test]
    fn test_popup_text() {
        let popup = Popup::new(-4.21, 55.86, &props("Dennistoun North - 02", Some(412.0)));
        assert_eq!(
            popup.to_string(),
            "Data Zone: S01003054\nName: Dennistoun North\nSIMD Crime Rank: 412"
        );
    }

    #[test]
    fn test_popup_without_rank() {
        let popup = Popup::new(-4.21, 55.86, &props("Carmyle - 01", None));
        assert!(popup.to_string().ends_with("SIMD Crime Rank:"));
        assert_eq!(popup.crime_rank, None);
    }

    #[test]
    fn test_properties_schema_from_loose_json() {
        let value = serde_json::json!({
            "DataZone": "S01003054",
            "Name": "Dennistoun North - 02",
            "crimeRank": 412,
            "TotPop2011": 812
        });
        let parsed: ZoneProperties = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, props("Dennistoun North - 02", Some(412.0)));

        let unranked: ZoneProperties =
            serde_json::from_value(serde_json::json!({"DataZone": "S01003054"})).unwrap();
        assert_eq!(unranked.crime_rank, None);
        assert_eq!(unranked.name, "");
    }
}
