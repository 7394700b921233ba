use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EtlError>;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Spreadsheet error: {0}")]
    Excel(#[from] calamine::Error),

    #[error("Document store error: {0}")]
    Store(#[from] mongodb::error::Error),

    #[error("BSON conversion error: {0}")]
    Bson(#[from] mongodb::bson::ser::Error),

    #[error("Object store error: {0}")]
    ObjectStore(String),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("No {extension} file found under prefix '{prefix}'")]
    SourceNotFound { prefix: String, extension: String },

    #[error("Ambiguous source under prefix '{prefix}': {} candidates ({})", candidates.len(), candidates.join(", "))]
    SourceAmbiguous {
        prefix: String,
        candidates: Vec<String>,
    },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Parse error in column '{column}': cannot read '{value}'")]
    Parse { column: String, value: String },

    #[error("No known station name found in '{0}'")]
    UnknownStation(String),

    #[error("Source unavailable: {} did not appear within {:?}", path.display(), waited)]
    HandoffTimeout { path: PathBuf, waited: Duration },

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Missing required data: {0}")]
    MissingData(String),
}

impl EtlError {
    /// Failures that only invalidate one station's ingestion.
    ///
    /// The transform stage logs these and carries on with the remaining
    /// stations; everything else (store connectivity, local I/O) aborts it.
    pub fn is_station_scoped(&self) -> bool {
        matches!(
            self,
            EtlError::SourceNotFound { .. }
                | EtlError::SourceAmbiguous { .. }
                | EtlError::UnsupportedFormat(_)
                | EtlError::Parse { .. }
                | EtlError::UnknownStation(_)
                | EtlError::InvalidFormat(_)
                | EtlError::Csv(_)
                | EtlError::Excel(_)
        )
    }
}
