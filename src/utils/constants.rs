use std::time::Duration;

/// Document store defaults
pub const DEFAULT_DATABASE: &str = "forecast2";
pub const DEFAULT_COLLECTION: &str = "weather_stations";
pub const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017";

/// Intermediate handoff file
pub const DEFAULT_INTERMEDIATE_PATH: &str = "output/transformed_data.json";
pub const DEFAULT_CONFIG_FILE: &str = "station-etl.toml";
pub const ENV_PREFIX: &str = "STATION_ETL";

/// Load gate polling
pub const DEFAULT_GATE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_GATE_INTERVAL: Duration = Duration::from_secs(1);

/// Object store defaults
pub const DEFAULT_REGION: &str = "eu-west-3";
pub const DEFAULT_SOURCE_PREFIX: &str = "airbyte";

/// Column names attached during normalization
pub const STATION_FOLDER_COLUMN: &str = "StationFolder";
pub const STATION_ID_FIELD: &str = "StationID";
pub const EXTRACTED_AT_FIELD: &str = "_airbyte_extracted_at";
pub const RAW_ID_FIELD: &str = "_raw_id";
pub const MONGO_ID_FIELD: &str = "_id";

/// Fields starting with this prefix are technical metadata
pub const INTERNAL_FIELD_PREFIX: &str = "_";

/// Column-name fragments that mark a date/time column (matched lowercase)
pub const DATE_TIME_TOKENS: [&str; 2] = ["date", "time"];

/// Cell values read as missing
pub const NA_VALUES: [&str; 12] = [
    "", "NA", "N/A", "n/a", "NaN", "nan", "-nan", "null", "NULL", "None", "#N/A", "<NA>",
];

/// Physical plausibility ranges
pub const MIN_VALID_TEMP: f64 = -50.0;
pub const MAX_VALID_TEMP: f64 = 60.0;
pub const MIN_VALID_HUMIDITY: f64 = 0.0;
pub const MAX_VALID_HUMIDITY: f64 = 100.0;

pub const TEMPERATURE_PATH: &str = "weather_data.temperature";
pub const HUMIDITY_PATH: &str = "weather_data.humidity";

/// Fields every persisted document must carry non-null
pub const REQUIRED_FIELDS: [&str; 6] = [
    "StationID",
    "StationName",
    "Latitude",
    "Longitude",
    "Elevation",
    "City",
];

/// Epoch values above this are read as milliseconds
pub const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// MongoDB duplicate key error code
pub const DUPLICATE_KEY_CODE: i32 = 11000;
