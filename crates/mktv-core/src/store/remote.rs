use async_trait::async_trait;
use mktv_models::{Collection, RecordKey};
use mktv_sources::DocumentDbClient;
use serde_json::Value;
use crate::error::StoreError;
use super::RecordStore;

/// Hosted document database behind the `RecordStore` port
#[derive(Clone)]
pub struct RemoteStore {
    client: DocumentDbClient,
}

impl RemoteStore {
    pub fn new(client: DocumentDbClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &DocumentDbClient {
        &self.client
    }
}

#[async_trait]
impl RecordStore for RemoteStore {
    fn backend_name(&self) -> &str {
        "remote"
    }

    async fn get(&self, key: &RecordKey) -> Result<Option<Value>, StoreError> {
        let doc = self.client.get(key.collection.name(), &key.document_id()).await?;
        Ok(doc.map(|d| d.fields))
    }

    async fn set(&self, key: &RecordKey, record: Value, merge: bool) -> Result<(), StoreError> {
        self.client
            .set(key.collection.name(), &key.document_id(), &record, merge)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &RecordKey) -> Result<(), StoreError> {
        self.client.delete(key.collection.name(), &key.document_id()).await?;
        Ok(())
    }

    async fn query(&self, collection: Collection, field: &str, value: &str) -> Result<Vec<Value>, StoreError> {
        let docs = self.client.query_equal(collection.name(), field, value).await?;
        Ok(docs.into_iter().map(|d| d.fields).collect())
    }
}
