use crate::error::Result;
use crate::models::Document;
use crate::store::{DocumentStore, InsertOutcome, NaturalKey};
use crate::utils::progress::ProgressReporter;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub inserted: usize,
    /// Documents whose key already existed, including `race_skips`
    pub skipped: usize,
    /// Documents that passed the lookup but were then rejected by the unique index
    pub race_skips: usize,
}

impl LoadReport {
    pub fn total(&self) -> usize {
        self.inserted + self.skipped
    }

    pub fn summary(&self) -> String {
        format!(
            "Load complete: {} new documents inserted, {} duplicates skipped",
            self.inserted, self.skipped
        )
    }
}

/// Inserts documents whose natural key is not yet in the store.
///
/// The lookup and the insert are separate round trips, so another loader can
/// insert the same key in between. The unique index then rejects the insert
/// and the document is counted as a skip.
pub struct IdempotentLoader {
    key: NaturalKey,
}

impl IdempotentLoader {
    pub fn new(key: NaturalKey) -> Self {
        Self { key }
    }

    pub async fn load(
        &self,
        store: &dyn DocumentStore,
        documents: &[Document],
        progress: Option<&ProgressReporter>,
    ) -> Result<LoadReport> {
        store.ensure_unique_index(&self.key).await?;

        let mut report = LoadReport::default();
        for document in documents {
            let filter = self.key.filter_for(document);

            if store.find_one(&filter).await?.is_some() {
                report.skipped += 1;
            } else {
                match store.insert_one(document).await? {
                    InsertOutcome::Inserted => report.inserted += 1,
                    InsertOutcome::Duplicate => {
                        debug!(key = ?filter, "Insert lost a race on the unique index");
                        report.skipped += 1;
                        report.race_skips += 1;
                    }
                }
            }

            if let Some(p) = progress {
                p.increment(1);
            }
        }

        info!(
            key = %self.key,
            inserted = report.inserted,
            skipped = report.skipped,
            race_skips = report.race_skips,
            "Load finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use async_trait::async_trait;
    use serde_json::json;

    fn docs(n: usize) -> Vec<Document> {
        (0..n)
            .map(|i| {
                json!({
                    "StationID": "IICHTE19",
                    "_airbyte_extracted_at": 1745686582564_i64 + i as i64,
                    "temperature": 10.0 + i as f64
                })
                .as_object()
                .cloned()
                .unwrap()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_second_load_skips_everything() -> Result<()> {
        let store = InMemoryStore::new();
        let loader = IdempotentLoader::new(NaturalKey::station_extraction());
        let documents = docs(5);

        let first = loader.load(&store, &documents, None).await?;
        assert_eq!(first.inserted, 5);
        assert_eq!(first.skipped, 0);

        let second = loader.load(&store, &documents, None).await?;
        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped, 5);
        assert_eq!(store.count().await?, 5);

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_keys_within_one_batch() -> Result<()> {
        let store = InMemoryStore::new();
        let loader = IdempotentLoader::new(NaturalKey::station_extraction());
        let mut documents = docs(2);
        documents.push(documents[0].clone());

        let report = loader.load(&store, &documents, None).await?;
        assert_eq!(report.inserted, 2);
        assert_eq!(report.skipped, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_key_fields_load_once() -> Result<()> {
        let store = InMemoryStore::new();
        let loader = IdempotentLoader::new(NaturalKey::raw_id());
        let keyless: Vec<Document> = (0..3)
            .map(|i| json!({"v": i}).as_object().cloned().unwrap())
            .collect();

        let report = loader.load(&store, &keyless, None).await?;
        assert_eq!(report.inserted, 1);
        assert_eq!(report.skipped, 2);

        Ok(())
    }

    /// Lookup always misses, as if another loader inserted between lookup and insert
    struct BlindLookupStore(InMemoryStore);

    #[async_trait]
    impl DocumentStore for BlindLookupStore {
        async fn ensure_unique_index(&self, key: &NaturalKey) -> Result<()> {
            self.0.ensure_unique_index(key).await
        }

        async fn find_one(&self, _filter: &Document) -> Result<Option<Document>> {
            Ok(None)
        }

        async fn insert_one(&self, document: &Document) -> Result<InsertOutcome> {
            self.0.insert_one(document).await
        }

        async fn find_all(&self) -> Result<Vec<Document>> {
            self.0.find_all().await
        }

        async fn count(&self) -> Result<u64> {
            self.0.count().await
        }
    }

    #[tokio::test]
    async fn test_constraint_violation_counts_as_skip() -> Result<()> {
        let store = BlindLookupStore(InMemoryStore::with_documents(docs(3)));
        let loader = IdempotentLoader::new(NaturalKey::station_extraction());

        let report = loader.load(&store, &docs(4), None).await?;
        assert_eq!(report.inserted, 1);
        assert_eq!(report.skipped, 3);
        assert_eq!(report.race_skips, 3);
        assert_eq!(store.count().await?, 4);

        Ok(())
    }
}
