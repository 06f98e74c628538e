use mktv_config::BackendConfig;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Map, Value};
use std::sync::{Arc, RwLock};
use tracing::{debug, trace};
use crate::docdb::value::{decode_fields, encode_fields};
use crate::error::SourceError;

const SERVICE: &str = "docdb";
const DATABASE_URL: &str = "https://firestore.googleapis.com/v1";

/// A document read back from the database
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Collection-relative ID (`{viewer}_{item}`)
    pub id: String,
    /// Decoded fields as plain JSON
    pub fields: Value,
}

#[derive(Clone)]
pub struct DocumentDbClient {
    client: Client,
    documents_url: String,
    database_root: String,
    api_key: String,
    id_token: Arc<RwLock<Option<String>>>,
}

impl DocumentDbClient {
    pub fn new(config: &BackendConfig) -> Result<Self, SourceError> {
        let base = config
            .database_base_url
            .as_deref()
            .map(|b| format!("{}/v1", b.trim_end_matches('/')))
            .unwrap_or_else(|| DATABASE_URL.to_string());
        let database_root = format!("projects/{}/databases/(default)/documents", config.project_id);

        Ok(Self {
            client: crate::http_client(SERVICE)?,
            documents_url: format!("{}/{}", base, database_root),
            database_root,
            api_key: config.api_key.clone(),
            id_token: Arc::new(RwLock::new(None)),
        })
    }

    /// Attach the signed-in viewer's ID token to subsequent requests
    pub fn set_id_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.id_token.write() {
            *guard = token;
        }
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.documents_url,
            collection,
            urlencoding::encode(id)
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.query(&[("key", self.api_key.as_str())]);
        let token = self.id_token.read().ok().and_then(|guard| guard.clone());
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(response: reqwest::Response, path: &str) -> Result<reqwest::Response, SourceError> {
        let status = response.status();
        match status {
            s if s.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(SourceError::NotFound {
                service: SERVICE,
                path: path.to_string(),
            }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let body = response.text().await.unwrap_or_default();
                Err(SourceError::Unauthorized {
                    service: SERVICE,
                    message: body,
                })
            }
            s => {
                let body = response.text().await.unwrap_or_default();
                Err(SourceError::Status {
                    service: SERVICE,
                    status: s.as_u16(),
                    body,
                })
            }
        }
    }

    /// Fetch one document; `Ok(None)` when it does not exist
    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, SourceError> {
        let path = format!("{}/{}", collection, id);
        let request = self.authorize(self.client.get(self.document_url(collection, id)));
        let response = request.send().await.map_err(|e| SourceError::request(SERVICE, e))?;

        let response = match Self::check(response, &path).await {
            Ok(r) => r,
            Err(e) if e.is_not_found() => {
                trace!(path = %path, "Document not found");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let body: Value = response.json().await.map_err(|e| SourceError::decode(SERVICE, e))?;
        Ok(Some(StoredDocument {
            id: id.to_string(),
            fields: body.get("fields").map(decode_fields).unwrap_or_else(|| json!({})),
        }))
    }

    /// Write a document
    ///
    /// With `merge`, only the top-level fields present in `record` are replaced
    /// (update mask); otherwise the whole document is overwritten.
    pub async fn set(&self, collection: &str, id: &str, record: &Value, merge: bool) -> Result<(), SourceError> {
        let path = format!("{}/{}", collection, id);
        let map = record
            .as_object()
            .ok_or_else(|| SourceError::decode(SERVICE, "document body must be a JSON object"))?;

        let mut request = self.client.patch(self.document_url(collection, id));
        if merge {
            let mask: Vec<(&str, &str)> = map
                .keys()
                .map(|k| ("updateMask.fieldPaths", k.as_str()))
                .collect();
            request = request.query(&mask);
        }

        let body = json!({ "fields": encode_fields(map) });
        let response = self
            .authorize(request)
            .json(&body)
            .send()
            .await
            .map_err(|e| SourceError::request(SERVICE, e))?;
        Self::check(response, &path).await?;

        debug!(path = %path, merge, "Document written");
        Ok(())
    }

    pub async fn delete(&self, collection: &str, id: &str) -> Result<(), SourceError> {
        let path = format!("{}/{}", collection, id);
        let request = self.authorize(self.client.delete(self.document_url(collection, id)));
        let response = request.send().await.map_err(|e| SourceError::request(SERVICE, e))?;
        match Self::check(response, &path).await {
            Ok(_) => Ok(()),
            // Deleting a missing document is not an error
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// All documents in `collection` whose `field` equals `value`
    pub async fn query_equal(&self, collection: &str, field: &str, value: &str) -> Result<Vec<StoredDocument>, SourceError> {
        let url = format!("{}:runQuery", self.documents_url);
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": field },
                        "op": "EQUAL",
                        "value": { "stringValue": value }
                    }
                }
            }
        });

        let response = self
            .authorize(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| SourceError::request(SERVICE, e))?;
        let response = Self::check(response, collection).await?;

        let rows: Vec<Value> = response.json().await.map_err(|e| SourceError::decode(SERVICE, e))?;
        let documents = parse_query_rows(&self.database_root, collection, &rows);
        debug!(collection = %collection, count = documents.len(), "Query complete");
        Ok(documents)
    }
}

/// Extract documents from `runQuery` rows; rows without a document only carry a read time
fn parse_query_rows(database_root: &str, collection: &str, rows: &[Value]) -> Vec<StoredDocument> {
    let prefix = format!("{}/{}/", database_root, collection);
    rows.iter()
        .filter_map(|row| row.get("document"))
        .filter_map(|doc| {
            let name = doc.get("name")?.as_str()?;
            let id = name
                .split_once(&prefix)
                .map(|(_, id)| id)
                .or_else(|| name.rsplit('/').next())?;
            Some(StoredDocument {
                id: urlencoding::decode(id).map(|s| s.into_owned()).unwrap_or_else(|_| id.to_string()),
                fields: doc
                    .get("fields")
                    .map(decode_fields)
                    .unwrap_or_else(|| Value::Object(Map::new())),
            })
        })
        .collect()
}
