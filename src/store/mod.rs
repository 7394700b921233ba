//! Document store seam for the load stage.
//!
//! The loader only needs four things from a store: an idempotent unique
//! index, a point lookup, an insert that reports duplicate-key rejections
//! instead of failing, and a full scan for quality reports.

pub mod memory;
pub mod mongo;

use crate::error::Result;
use crate::models::Document;
use crate::utils::constants::{EXTRACTED_AT_FIELD, RAW_ID_FIELD, STATION_ID_FIELD};
use async_trait::async_trait;
use serde_json::Value;

pub use memory::InMemoryStore;
pub use mongo::MongoStore;

/// Fields that identify a persisted document across pipeline runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey {
    fields: Vec<String>,
}

impl NaturalKey {
    pub fn new(fields: &[&str]) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// `(StationID, _airbyte_extracted_at)`
    pub fn station_extraction() -> Self {
        Self::new(&[STATION_ID_FIELD, EXTRACTED_AT_FIELD])
    }

    /// `(_raw_id)`
    pub fn raw_id() -> Self {
        Self::new(&[RAW_ID_FIELD])
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Equality filter on the key fields; absent fields match as null.
    pub fn filter_for(&self, document: &Document) -> Document {
        self.fields
            .iter()
            .map(|field| {
                let value = document.get(field).cloned().unwrap_or(Value::Null);
                (field.clone(), value)
            })
            .collect()
    }
}

impl std::fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})", self.fields.join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Rejected by a unique index
    Duplicate,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a unique index on the key. Safe to call repeatedly.
    async fn ensure_unique_index(&self, key: &NaturalKey) -> Result<()>;

    async fn find_one(&self, filter: &Document) -> Result<Option<Document>>;

    async fn insert_one(&self, document: &Document) -> Result<InsertOutcome>;

    /// Every document in the collection, without store-assigned ids.
    async fn find_all(&self) -> Result<Vec<Document>>;

    async fn count(&self) -> Result<u64>;
}
