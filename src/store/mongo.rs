use crate::error::{EtlError, Result};
use crate::models::Document;
use crate::store::{DocumentStore, InsertOutcome, NaturalKey};
use crate::utils::constants::DUPLICATE_KEY_CODE;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Bson};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};
use serde_json::Value;
use tracing::{debug, info};

/// A MongoDB collection, acquired at command start and released with `shutdown`.
pub struct MongoStore {
    client: Client,
    collection: Collection<bson::Document>,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str, collection: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let collection: Collection<bson::Document> =
            client.database(database).collection(collection);
        info!(database, collection = collection.name(), "Connected to document store");

        Ok(Self { client, collection })
    }

    pub fn namespace(&self) -> String {
        self.collection.namespace().to_string()
    }

    /// Close pooled connections.
    pub async fn shutdown(self) {
        self.client.shutdown().await;
        debug!("Document store connection closed");
    }
}

fn to_bson(document: &Document) -> Result<bson::Document> {
    Ok(bson::to_document(document)?)
}

fn to_json(document: bson::Document) -> Result<Document> {
    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(map) => Ok(map),
        other => Err(EtlError::InvalidFormat(format!(
            "Stored document is not an object: {}",
            other
        ))),
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn ensure_unique_index(&self, key: &NaturalKey) -> Result<()> {
        let mut keys = bson::Document::new();
        for field in key.fields() {
            keys.insert(field.clone(), 1);
        }

        let index = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let created = self.collection.create_index(index).await?;
        debug!(index = %created.index_name, key = %key, "Unique index ensured");

        Ok(())
    }

    async fn find_one(&self, filter: &Document) -> Result<Option<Document>> {
        let found = self
            .collection
            .find_one(to_bson(filter)?)
            .projection(doc! { "_id": 0 })
            .await?;
        found.map(to_json).transpose()
    }

    async fn insert_one(&self, document: &Document) -> Result<InsertOutcome> {
        match self.collection.insert_one(to_bson(document)?).await {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(err) if is_duplicate_key(&err) => Ok(InsertOutcome::Duplicate),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_all(&self) -> Result<Vec<Document>> {
        let cursor = self
            .collection
            .find(doc! {})
            .projection(doc! { "_id": 0 })
            .await?;
        let documents: Vec<bson::Document> = cursor.try_collect().await?;

        documents.into_iter().map(to_json).collect()
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_bson_round_trip_keeps_types() {
        let document = json!({
            "StationID": "IICHTE19",
            "Elevation": 15,
            "Latitude": 51.092,
            "City": null,
            "weather_data": {"temperature": 12.5}
        })
        .as_object()
        .cloned()
        .unwrap();

        let bson_doc = to_bson(&document).unwrap();
        assert_eq!(bson_doc.get_str("StationID").unwrap(), "IICHTE19");
        assert!(matches!(bson_doc.get("City"), Some(Bson::Null)));

        let back = to_json(bson_doc).unwrap();
        assert_eq!(back["Latitude"], json!(51.092));
        assert_eq!(back["weather_data"]["temperature"], json!(12.5));
    }
}
