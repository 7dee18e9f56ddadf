//! Cloud Firestore storage implementation over the REST API.
//!
//! - Reads run a keys-only structured query (`{parent}:runQuery`)
//! - Every batch is a single atomic `documents:commit`
//! - Server timestamps are sent as `REQUEST_TIME` field transforms

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::error::{AppError, Result};
use crate::models::ServiceAccount;
use crate::storage::auth::TokenSource;
use crate::storage::{DocumentRef, DocumentStore, FieldValue, Fields, WriteBatch, WriteOp};
use crate::utils::http;

/// Production API endpoint.
pub const FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com/v1";
/// Environment variable pointing at a local emulator (`host:port`).
pub const ENV_EMULATOR_HOST: &str = "FIRESTORE_EMULATOR_HOST";

/// Firestore-backed document store.
pub struct FirestoreStore {
    client: reqwest::Client,
    endpoint: String,
    database: String,
    tokens: TokenSource,
}

impl FirestoreStore {
    /// Create a store authenticated with a service account.
    pub fn new(client: reqwest::Client, account: ServiceAccount, database_id: &str) -> Self {
        let database = database_name(&account.project_id, database_id);
        Self {
            tokens: TokenSource::service_account(account, client.clone()),
            client,
            endpoint: FIRESTORE_ENDPOINT.to_string(),
            database,
        }
    }

    /// Create a store talking to a local emulator.
    pub fn emulator(client: reqwest::Client, host: &str, project_id: &str, database_id: &str) -> Self {
        Self {
            client,
            endpoint: format!("http://{}/v1", host.trim_end_matches('/')),
            database: database_name(project_id, database_id),
            tokens: TokenSource::Emulator,
        }
    }

    /// Create a store from a credential, honouring `FIRESTORE_EMULATOR_HOST`.
    pub fn from_lookup<F>(account: ServiceAccount, database_id: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let client = http::create_store_client()?;
        match lookup(ENV_EMULATOR_HOST).filter(|h| !h.is_empty()) {
            Some(host) => {
                log::info!("Using Firestore emulator at {}", host);
                Ok(Self::emulator(client, &host, &account.project_id, database_id))
            }
            None => Ok(Self::new(client, account, database_id)),
        }
    }

    fn documents_root(&self) -> String {
        format!("{}/documents", self.database)
    }

    /// Full resource name of a document path.
    fn document_name(&self, path: &str) -> String {
        format!("{}/{}", self.documents_root(), path.trim_matches('/'))
    }

    /// Relative path of a full resource name.
    fn relative_path<'a>(&self, name: &'a str) -> Option<&'a str> {
        name.strip_prefix(&self.documents_root())
            .and_then(|rest| rest.strip_prefix('/'))
    }

    /// Split a collection path into its query parent and collection id.
    fn query_parent(&self, collection: &str) -> (String, String) {
        let collection = collection.trim_matches('/');
        match collection.rsplit_once('/') {
            Some((parent, id)) => (self.document_name(parent), id.to_string()),
            None => (self.documents_root(), collection.to_string()),
        }
    }

    /// POST a JSON body and return the parsed response, mapping failures to store errors.
    async fn post_json(&self, operation: &str, url: &str, body: &Value) -> Result<Value> {
        let token = self.tokens.bearer().await?;
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::store(operation, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::store(operation, e))?;

        if !status.is_success() {
            return Err(AppError::store(operation, api_error_message(status, &text)));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| AppError::store(operation, e))
    }

    fn encode_write(&self, write: &WriteOp) -> Result<Value> {
        let value = match write {
            WriteOp::Delete { path } => json!({ "delete": self.document_name(path) }),
            WriteOp::Set { path, fields } => {
                let (encoded, transforms) = encode_fields(fields)?;
                let mut entry = json!({
                    "update": { "name": self.document_name(path), "fields": encoded },
                });
                if !transforms.is_empty() {
                    entry["updateTransforms"] = Value::Array(transforms);
                }
                entry
            }
            WriteOp::Merge { path, fields } => {
                let (encoded, transforms) = encode_fields(fields)?;
                let mask: Vec<String> = encoded.keys().map(|k| quote_field_path(k)).collect();
                let mut entry = json!({
                    "update": { "name": self.document_name(path), "fields": encoded },
                    "updateMask": { "fieldPaths": mask },
                });
                if !transforms.is_empty() {
                    entry["updateTransforms"] = Value::Array(transforms);
                }
                entry
            }
        };
        Ok(value)
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn list_documents(&self, collection: &str, limit: usize) -> Result<Vec<DocumentRef>> {
        let (parent, collection_id) = self.query_parent(collection);
        let url = format!("{}/{}:runQuery", self.endpoint, parent);
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection_id }],
                "select": { "fields": [{ "fieldPath": "__name__" }] },
                "limit": limit,
            }
        });

        let response = self.post_json("list", &url, &body).await?;
        let rows: Vec<QueryRow> =
            serde_json::from_value(response).map_err(|e| AppError::store("list", e))?;

        let docs: Vec<DocumentRef> = rows
            .into_iter()
            .filter_map(|row| row.document)
            .filter_map(|doc| self.relative_path(&doc.name).map(DocumentRef::new))
            .collect();

        log::debug!("Listed {} documents from {}", docs.len(), collection);
        Ok(docs)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        batch.check_limit()?;
        if batch.is_empty() {
            return Ok(());
        }

        let writes = batch
            .writes()
            .iter()
            .map(|w| self.encode_write(w))
            .collect::<Result<Vec<_>>>()?;
        let url = format!("{}/{}/documents:commit", self.endpoint, self.database);

        self.post_json("commit", &url, &json!({ "writes": writes }))
            .await?;
        log::debug!("Committed batch of {} writes", batch.len());
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct QueryRow {
    #[serde(default)]
    document: Option<QueryDocument>,
}

#[derive(Debug, Deserialize)]
struct QueryDocument {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
}

fn database_name(project_id: &str, database_id: &str) -> String {
    format!("projects/{project_id}/databases/{database_id}")
}

/// Human-readable message for a failed API call.
fn api_error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) if !parsed.error.message.is_empty() => {
            format!("{} {}: {}", status.as_u16(), parsed.error.status, parsed.error.message)
        }
        _ => format!("{}: {}", status, body.trim()),
    }
}

/// Encode fields, splitting server timestamps out as transforms.
fn encode_fields(fields: &Fields) -> Result<(Map<String, Value>, Vec<Value>)> {
    let mut encoded = Map::new();
    let mut transforms = Vec::new();
    for (name, value) in fields {
        if *value == FieldValue::ServerTimestamp {
            transforms.push(json!({
                "fieldPath": quote_field_path(name),
                "setToServerValue": "REQUEST_TIME",
            }));
        } else {
            encoded.insert(name.clone(), encode_value(value)?);
        }
    }
    Ok((encoded, transforms))
}

/// Encode one value in the Firestore `Value` JSON format.
fn encode_value(value: &FieldValue) -> Result<Value> {
    let encoded = match value {
        FieldValue::Null => json!({ "nullValue": null }),
        FieldValue::Boolean(b) => json!({ "booleanValue": b }),
        FieldValue::Integer(i) => json!({ "integerValue": i.to_string() }),
        FieldValue::String(s) => json!({ "stringValue": s }),
        FieldValue::Array(values) => {
            let values = values.iter().map(encode_value).collect::<Result<Vec<_>>>()?;
            json!({ "arrayValue": { "values": values } })
        }
        FieldValue::Timestamp(at) => json!({ "timestampValue": crate::models::iso_timestamp(*at) }),
        FieldValue::ServerTimestamp => {
            return Err(AppError::store(
                "encode",
                "server timestamps are only supported as top-level fields",
            ));
        }
    };
    Ok(encoded)
}

/// Quote a field name for use in a field path when it is not a plain identifier.
fn quote_field_path(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        name.to_string()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}
