use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

/// Static description of one weather station, keyed by its source folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct StationMetadata {
    /// Object-store folder the station's exports land in
    #[validate(length(min = 1))]
    pub folder: String,

    #[validate(length(min = 1))]
    pub station_id: String,

    #[validate(length(min = 1))]
    pub name: String,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,

    pub elevation: Option<f64>,

    pub city: Option<String>,

    pub hardware: Option<String>,

    pub software: Option<String>,
}

impl StationMetadata {
    pub fn new(folder: &str, station_id: &str, name: &str) -> Self {
        Self {
            folder: folder.to_string(),
            station_id: station_id.to_string(),
            name: name.to_string(),
            latitude: None,
            longitude: None,
            elevation: None,
            city: None,
            hardware: None,
            software: None,
        }
    }

    pub fn with_location(
        mut self,
        latitude: f64,
        longitude: f64,
        elevation: f64,
        city: &str,
    ) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self.elevation = Some(elevation);
        self.city = Some(city.to_string());
        self
    }

    pub fn with_equipment(mut self, hardware: &str, software: &str) -> Self {
        self.hardware = Some(hardware.to_string());
        self.software = Some(software.to_string());
        self
    }

    /// Column name / value pairs merged into every normalized row.
    pub fn metadata_columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("StationID", Value::from(self.station_id.clone())),
            ("StationName", Value::from(self.name.clone())),
            ("Latitude", optional_number(self.latitude)),
            ("Longitude", optional_number(self.longitude)),
            ("Elevation", optional_number(self.elevation)),
            ("City", optional_string(&self.city)),
            ("Hardware", optional_string(&self.hardware)),
            ("Software", optional_string(&self.software)),
        ]
    }

    /// Nested location object used by legacy documents.
    pub fn location(&self) -> Value {
        serde_json::json!({
            "city": optional_string(&self.city),
            "latitude": optional_number(self.latitude),
            "longitude": optional_number(self.longitude),
            "elevation": optional_number(self.elevation),
        })
    }
}

fn optional_number(value: Option<f64>) -> Value {
    match value {
        // Whole numbers (elevations mostly) stay integers in the documents
        Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => Value::from(v as i64),
        Some(v) => serde_json::Number::from_f64(v)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        None => Value::Null,
    }
}

fn optional_string(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_station_validation() {
        let station = StationMetadata::new("Station_Amateur_Ichtegem", "IICHTE19", "WeerstationBS")
            .with_location(51.092, 2.999, 15.0, "Ichtegem")
            .with_equipment("other", "EasyWeatherV1.6.6");

        assert!(station.validate().is_ok());
        assert_eq!(station.latitude, Some(51.092));
    }

    #[test]
    fn test_invalid_coordinates() {
        let station = StationMetadata::new("Broken", "BROKEN1", "Broken")
            .with_location(91.0, 2.999, 15.0, "Nowhere");

        assert!(station.validate().is_err());
    }

    #[test]
    fn test_placeholder_metadata_columns_are_null() {
        let station = StationMetadata::new("Unknown_Folder", "UNKNOWN", "InfoClimatStation");
        assert!(station.validate().is_ok());

        let columns = station.metadata_columns();
        assert_eq!(columns.len(), 8);
        assert_eq!(columns[0], ("StationID", json!("UNKNOWN")));
        assert_eq!(columns[2], ("Latitude", Value::Null));
        assert_eq!(columns[5], ("City", Value::Null));
    }

    #[test]
    fn test_elevation_rendered_as_integer() {
        let station = StationMetadata::new("F", "ID", "N").with_location(50.659, 3.07, 23.0, "La Madeleine");
        let columns = station.metadata_columns();

        assert_eq!(columns[2].1, json!(50.659));
        assert_eq!(columns[4].1, json!(23));
    }
}
