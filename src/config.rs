use crate::error::{EtlError, Result};
use crate::models::StationMetadata;
use crate::processors::{LoadGate, QualityReporter};
use crate::readers::{SourceFormat, SourceLocation, StationRegistry};
use crate::store::NaturalKey;
use crate::utils::constants::{
    DEFAULT_COLLECTION, DEFAULT_CONFIG_FILE, DEFAULT_DATABASE, DEFAULT_GATE_INTERVAL,
    DEFAULT_GATE_TIMEOUT, DEFAULT_INTERMEDIATE_PATH, DEFAULT_MONGO_URI, DEFAULT_REGION,
    DEFAULT_SOURCE_PREFIX, ENV_PREFIX, HUMIDITY_PATH, REQUIRED_FIELDS, TEMPERATURE_PATH,
};
use clap::ValueEnum;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use validator::Validate;

/// Everything a pipeline run needs, layered from an optional TOML file and
/// `STATION_ETL_*` environment variables (`__` separates nested keys, e.g.
/// `STATION_ETL_STORE__URI`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PipelineConfig {
    #[validate(nested)]
    pub source: SourceConfig,
    pub stations: Vec<StationSource>,
    pub registry: RegistryConfig,
    pub output: OutputConfig,
    #[validate(nested)]
    pub store: StoreConfig,
    #[validate(nested)]
    pub gate: GateConfig,
    pub quality: QualityConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    S3,
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub bucket: Option<String>,
    #[validate(length(min = 1))]
    pub region: String,
    /// Root directory for `kind = "local"`
    pub local_root: PathBuf,
    /// Key prefix under which each station folder lives
    pub prefix: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::S3,
            bucket: None,
            region: DEFAULT_REGION.to_string(),
            local_root: PathBuf::from("data"),
            prefix: DEFAULT_SOURCE_PREFIX.to_string(),
        }
    }
}

impl SourceConfig {
    /// Bucket name; only required once the S3 store is actually opened.
    pub fn bucket(&self) -> Result<&str> {
        match self.bucket.as_deref() {
            Some(bucket) if !bucket.is_empty() => Ok(bucket),
            _ => Err(EtlError::Config(
                "source.bucket is required for the S3 object store".to_string(),
            )),
        }
    }
}

/// One station export to ingest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationSource {
    pub folder: String,
    /// Exact object key; takes precedence over prefix resolution
    #[serde(default)]
    pub key: Option<String>,
    /// Prefix holding exactly one export; defaults to `<source.prefix>/<folder>/`
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_extension() -> String {
    "csv".to_string()
}

impl StationSource {
    pub fn with_key(folder: &str, key: &str) -> Self {
        Self {
            folder: folder.to_string(),
            key: Some(key.to_string()),
            prefix: None,
            extension: default_extension(),
        }
    }

    pub fn with_prefix(folder: &str, prefix: &str, extension: &str) -> Self {
        Self {
            folder: folder.to_string(),
            key: None,
            prefix: Some(prefix.to_string()),
            extension: extension.to_string(),
        }
    }

    pub fn location(&self, source_prefix: &str) -> Result<SourceLocation> {
        if let Some(key) = &self.key {
            return Ok(SourceLocation::Key(key.clone()));
        }

        let extension = self.extension.trim_start_matches('.');
        let format = SourceFormat::from_key(&format!("export.{}", extension))?;
        let prefix = match &self.prefix {
            Some(prefix) => prefix.clone(),
            None if source_prefix.is_empty() => format!("{}/", self.folder),
            None => format!("{}/{}/", source_prefix.trim_end_matches('/'), self.folder),
        };

        Ok(SourceLocation::Prefix { prefix, format })
    }
}

/// The three exports of the original deployment.
fn default_stations() -> Vec<StationSource> {
    vec![
        StationSource::with_key(
            "Station_Amateur_Weather_La_Madelaine",
            "airbyte/Station_Amateur_Weather_La_Madelaine/2025_04_26_1745688137182_0.csv",
        ),
        StationSource::with_key(
            "Station_Amateur_Ichtegem",
            "airbyte/Station_Amateur_Ichtegem/2025_04_26_1745686582564_0.csv",
        ),
        StationSource::with_key(
            "Stations_meteorologique_du_reseau_infoClimat",
            "airbyte/Stations_meteorologique_du_reseau_infoClimat/2025_04_26_1745686581549_0.csv",
        ),
    ]
}

/// Station metadata: a JSON file, inline entries, or the built-in stations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub file: Option<PathBuf>,
    pub stations: Vec<StationMetadata>,
}

impl RegistryConfig {
    pub fn build(&self) -> Result<StationRegistry> {
        match (&self.file, self.stations.is_empty()) {
            (Some(path), _) => StationRegistry::read_registry_file(path),
            (None, false) => StationRegistry::from_stations(self.stations.clone()),
            (None, true) => Ok(StationRegistry::builtin()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_INTERMEDIATE_PATH),
            pretty: true,
        }
    }
}

/// Which fields identify a document across loads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum KeyVariant {
    /// StationID + _airbyte_extracted_at
    #[default]
    StationExtraction,
    /// _raw_id
    RawId,
}

impl KeyVariant {
    pub fn natural_key(self) -> NaturalKey {
        match self {
            KeyVariant::StationExtraction => NaturalKey::station_extraction(),
            KeyVariant::RawId => NaturalKey::raw_id(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StoreConfig {
    #[validate(length(min = 1))]
    pub uri: String,
    #[validate(length(min = 1))]
    pub database: String,
    #[validate(length(min = 1))]
    pub collection: String,
    pub key: KeyVariant,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_MONGO_URI.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            key: KeyVariant::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct GateConfig {
    pub timeout_secs: u64,
    #[validate(range(min = 1))]
    pub interval_ms: u64,
    pub startup_delay_secs: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_GATE_TIMEOUT.as_secs(),
            interval_ms: DEFAULT_GATE_INTERVAL.as_millis() as u64,
            startup_delay_secs: 0,
        }
    }
}

impl GateConfig {
    pub fn gate(&self) -> LoadGate {
        LoadGate::new(
            Duration::from_secs(self.timeout_secs),
            Duration::from_millis(self.interval_ms),
        )
        .with_startup_delay(Duration::from_secs(self.startup_delay_secs))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub temperature_path: String,
    pub humidity_path: String,
    pub required_fields: Vec<String>,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            temperature_path: TEMPERATURE_PATH.to_string(),
            humidity_path: HUMIDITY_PATH.to_string(),
            required_fields: REQUIRED_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl QualityConfig {
    pub fn reporter(&self) -> QualityReporter {
        QualityReporter::new()
            .with_measurement_paths(&self.temperature_path, &self.humidity_path)
            .with_required_fields(self.required_fields.clone())
    }
}

impl PipelineConfig {
    /// Load from `path` (must exist) or from `station-etl.toml` if present,
    /// then apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false),
        };

        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: PipelineConfig = settings.try_deserialize()?;
        if config.stations.is_empty() {
            config.stations = default_stations();
        }
        config.check()?;

        debug!(
            stations = config.stations.len(),
            output = %config.output.path.display(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Field validation plus the cross-field rules `validator` cannot express.
    pub fn check(&self) -> Result<()> {
        self.validate()?;

        let mut seen = HashSet::new();
        for station in &self.stations {
            if !seen.insert(station.folder.as_str()) {
                return Err(EtlError::Config(format!(
                    "Station folder '{}' listed twice",
                    station.folder
                )));
            }
        }

        Ok(())
    }

    pub fn registry(&self) -> Result<StationRegistry> {
        self.registry.build()
    }
}
