use crate::error::{EtlError, Result};
use crate::models::StationMetadata;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;
use validator::Validate;

/// Immutable folder -> station lookup, built once at start-up.
#[derive(Debug, Clone)]
pub struct StationRegistry {
    stations: HashMap<String, StationMetadata>,
    order: Vec<String>,
}

impl StationRegistry {
    /// Build a registry, validating every entry and rejecting duplicate folders.
    pub fn from_stations(stations: Vec<StationMetadata>) -> Result<Self> {
        let mut map = HashMap::with_capacity(stations.len());
        let mut order = Vec::with_capacity(stations.len());

        for station in stations {
            station.validate()?;
            if map.contains_key(&station.folder) {
                return Err(EtlError::Config(format!(
                    "Station folder '{}' registered twice",
                    station.folder
                )));
            }
            order.push(station.folder.clone());
            map.insert(station.folder.clone(), station);
        }

        Ok(Self {
            stations: map,
            order,
        })
    }

    /// Read a JSON array of station entries
    pub fn read_registry_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let stations: Vec<StationMetadata> = serde_json::from_reader(BufReader::new(file))?;
        debug!(count = stations.len(), path = %path.display(), "Read station registry");
        Self::from_stations(stations)
    }

    /// The stations shipped with the original deployment.
    pub fn builtin() -> Self {
        let stations = vec![
            StationMetadata::new(
                "Station_Amateur_Weather_La_Madelaine",
                "ILAMAD25",
                "La Madeleine",
            )
            .with_location(50.659, 3.07, 23.0, "La Madeleine")
            .with_equipment("other", "EasyWeatherPro_V5.1.6"),
            StationMetadata::new("Station_Amateur_Ichtegem", "IICHTE19", "WeerstationBS")
                .with_location(51.092, 2.999, 15.0, "Ichtegem")
                .with_equipment("other", "EasyWeatherV1.6.6"),
            StationMetadata::new(
                "Stations_meteorologique_du_reseau_infoClimat",
                "UNKNOWN",
                "InfoClimatStation",
            ),
        ];

        let order = stations.iter().map(|s| s.folder.clone()).collect();
        let stations = stations.into_iter().map(|s| (s.folder.clone(), s)).collect();
        Self { stations, order }
    }

    pub fn get(&self, folder: &str) -> Option<&StationMetadata> {
        self.stations.get(folder)
    }

    /// Stations in registration order
    pub fn stations(&self) -> impl Iterator<Item = &StationMetadata> {
        self.order.iter().filter_map(|folder| self.stations.get(folder))
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Find the station whose name, city or folder appears in a file name.
    ///
    /// Matching ignores case and punctuation; the longest matching token wins.
    pub fn find_in_file_name(&self, file_name: &str) -> Result<&StationMetadata> {
        let haystack = squash(file_name);

        self.stations()
            .filter_map(|station| {
                let tokens = [
                    Some(station.name.as_str()),
                    station.city.as_deref(),
                    Some(station.folder.as_str()),
                ];
                tokens
                    .into_iter()
                    .flatten()
                    .map(squash)
                    .filter(|token| !token.is_empty() && haystack.contains(token.as_str()))
                    .map(|token| token.len())
                    .max()
                    .map(|len| (len, station))
            })
            .max_by_key(|(len, _)| *len)
            .map(|(_, station)| station)
            .ok_or_else(|| EtlError::UnknownStation(file_name.to_string()))
    }
}

impl Default for StationRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_registry() {
        let registry = StationRegistry::builtin();

        assert_eq!(registry.len(), 3);
        let ichtegem = registry.get("Station_Amateur_Ichtegem").unwrap();
        assert_eq!(ichtegem.station_id, "IICHTE19");
        assert_eq!(ichtegem.city.as_deref(), Some("Ichtegem"));

        let folders: Vec<&str> = registry.stations().map(|s| s.folder.as_str()).collect();
        assert_eq!(folders[0], "Station_Amateur_Weather_La_Madelaine");
    }

    #[test]
    fn test_find_in_file_name() {
        let registry = StationRegistry::builtin();

        let station = registry
            .find_in_file_name("Weather_Ichtegem_2024-10.xlsx")
            .unwrap();
        assert_eq!(station.station_id, "IICHTE19");

        let station = registry
            .find_in_file_name("export la-madeleine octobre.xlsx")
            .unwrap();
        assert_eq!(station.station_id, "ILAMAD25");
    }

    #[test]
    fn test_find_in_file_name_fails_hard() {
        let registry = StationRegistry::builtin();
        let err = registry.find_in_file_name("Brussels_2024.xlsx").unwrap_err();
        assert!(matches!(err, EtlError::UnknownStation(_)));
    }

    #[test]
    fn test_duplicate_folder_rejected() {
        let stations = vec![
            StationMetadata::new("Same", "A", "Alpha"),
            StationMetadata::new("Same", "B", "Beta"),
        ];
        assert!(StationRegistry::from_stations(stations).is_err());
    }

    #[test]
    fn test_read_registry_file() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(
            temp_file,
            r#"[{{"folder": "Station_Test", "station_id": "ITEST1", "name": "Test",
                 "latitude": 50.0, "longitude": 3.0, "elevation": 10.0, "city": "Lille",
                 "hardware": null, "software": null}}]"#
        )?;

        let registry = StationRegistry::read_registry_file(temp_file.path())?;
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("Station_Test").unwrap().station_id, "ITEST1");

        Ok(())
    }
}
