use crate::error::{EtlError, Result};
use crate::models::RawTable;
use crate::readers::formats::SourceFormat;
use crate::readers::object_store::ObjectStore;
use std::sync::Arc;
use tracing::{debug, info};

/// Where a station's export lives: an exact key, or a prefix that must hold exactly one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Key(String),
    Prefix { prefix: String, format: SourceFormat },
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceLocation::Key(key) => write!(f, "{}", key),
            SourceLocation::Prefix { prefix, format } => write!(f, "{}*{}", prefix, format),
        }
    }
}

pub struct SourceReader {
    store: Arc<dyn ObjectStore>,
}

impl SourceReader {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Resolve a prefix to its single file of the expected format.
    pub async fn resolve_key(&self, prefix: &str, format: SourceFormat) -> Result<String> {
        let mut candidates: Vec<String> = self
            .store
            .list(prefix)
            .await?
            .into_iter()
            .filter(|key| format.matches(key))
            .collect();

        match candidates.len() {
            0 => Err(EtlError::SourceNotFound {
                prefix: prefix.to_string(),
                extension: format.to_string(),
            }),
            1 => Ok(candidates.remove(0)),
            _ => Err(EtlError::SourceAmbiguous {
                prefix: prefix.to_string(),
                candidates,
            }),
        }
    }

    /// Fetch and parse one file; the extension is checked before any remote read.
    pub async fn read_table(&self, key: &str) -> Result<RawTable> {
        let format = SourceFormat::from_key(key)?;
        let bytes = self.store.get(key).await?;
        debug!(
            source = %self.store.describe(key),
            bytes = bytes.len(),
            "Fetched source file"
        );

        let table = format.parse(&bytes)?;
        info!(key, rows = table.len(), columns = table.columns.len(), "Parsed source file");
        Ok(table)
    }

    /// Resolve a location if needed, then read it. Returns the key actually read.
    pub async fn read_location(&self, location: &SourceLocation) -> Result<(String, RawTable)> {
        let key = match location {
            SourceLocation::Key(key) => key.clone(),
            SourceLocation::Prefix { prefix, format } => self.resolve_key(prefix, *format).await?,
        };
        let table = self.read_table(&key).await?;
        Ok((key, table))
    }
}
