use crate::error::Result;
use crate::models::Document;
use crate::store::{DocumentStore, InsertOutcome, NaturalKey};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct State {
    documents: Vec<Document>,
    unique_keys: Vec<NaturalKey>,
}

/// Collection held in memory; enforces its unique indexes like a real store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(documents: Vec<Document>) -> Self {
        Self {
            state: Mutex::new(State {
                documents,
                unique_keys: Vec::new(),
            }),
        }
    }

    pub fn documents(&self) -> Result<Vec<Document>> {
        Ok(self.lock()?.documents.clone())
    }

    pub fn unique_keys(&self) -> Result<Vec<NaturalKey>> {
        Ok(self.lock()?.unique_keys.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        // Every mutation is a single push, so poisoned state is still consistent
        Ok(self.state.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

fn matches(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(field, expected)| document.get(field).unwrap_or(&Value::Null) == expected)
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn ensure_unique_index(&self, key: &NaturalKey) -> Result<()> {
        let mut state = self.lock()?;
        if !state.unique_keys.contains(key) {
            state.unique_keys.push(key.clone());
        }
        Ok(())
    }

    async fn find_one(&self, filter: &Document) -> Result<Option<Document>> {
        let state = self.lock()?;
        Ok(state
            .documents
            .iter()
            .find(|doc| matches(doc, filter))
            .cloned())
    }

    async fn insert_one(&self, document: &Document) -> Result<InsertOutcome> {
        let mut state = self.lock()?;
        let violates = state.unique_keys.iter().any(|key| {
            let filter = key.filter_for(document);
            state.documents.iter().any(|doc| matches(doc, &filter))
        });

        if violates {
            return Ok(InsertOutcome::Duplicate);
        }

        state.documents.push(document.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn find_all(&self) -> Result<Vec<Document>> {
        self.documents()
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.lock()?.documents.len() as u64)
    }
}
