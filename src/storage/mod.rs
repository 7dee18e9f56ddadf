//! Document store abstractions for posting persistence.
//!
//! The job needs five primitives from its store:
//!
//! - bounded reads of a collection's document references
//! - atomic batch delete
//! - atomic batch insert with store-assigned ids
//! - merge-style upsert of a single named document
//! - a server timestamp sentinel usable inside any write
//!
//! ## Backends
//!
//! ```text
//! storage/
//! ├── firestore.rs   # Cloud Firestore REST API (production)
//! ├── auth.rs        # Service-account access tokens for Firestore
//! └── memory.rs      # In-process store (tests, dry runs)
//! ```

pub mod auth;
pub mod firestore;
pub mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::error::{AppError, Result};

// Re-export for convenience
pub use firestore::FirestoreStore;
pub use memory::{CommitRecord, MemoryStore};

/// Maximum number of writes the store accepts in one atomic batch.
pub const MAX_BATCH_WRITES: usize = 500;

/// Document fields keyed by name.
pub type Fields = BTreeMap<String, FieldValue>;

/// A stored field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Integer(i64),
    String(String),
    Array(Vec<FieldValue>),
    Timestamp(DateTime<Utc>),
    /// Replaced by the store with its own commit time
    ServerTimestamp,
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// Plain JSON view of a value, for printing documents.
impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            FieldValue::Null => serializer.serialize_none(),
            FieldValue::Boolean(b) => serializer.serialize_bool(*b),
            FieldValue::Integer(i) => serializer.serialize_i64(*i),
            FieldValue::String(s) => serializer.serialize_str(s),
            FieldValue::Array(values) => values.serialize(serializer),
            FieldValue::Timestamp(at) => serializer.serialize_str(&crate::models::iso_timestamp(*at)),
            FieldValue::ServerTimestamp => serializer.serialize_str("REQUEST_TIME"),
        }
    }
}

/// Reference to a stored document by its slash-separated path (`jobs/abc123`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentRef {
    pub path: String,
}

impl DocumentRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Last path segment.
    pub fn id(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// A single write inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Remove a document
    Delete { path: String },
    /// Replace a document's contents
    Set { path: String, fields: Fields },
    /// Overwrite only the given fields, creating the document if needed
    Merge { path: String, fields: Fields },
}

impl WriteOp {
    pub fn path(&self) -> &str {
        match self {
            WriteOp::Delete { path } | WriteOp::Set { path, .. } | WriteOp::Merge { path, .. } => {
                path
            }
        }
    }
}

/// Writes committed together, all or nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    writes: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a delete.
    pub fn delete(&mut self, doc: &DocumentRef) -> &mut Self {
        self.writes.push(WriteOp::Delete {
            path: doc.path.clone(),
        });
        self
    }

    /// Queue an insert under a freshly generated id, returning the new reference.
    pub fn create(&mut self, collection: &str, fields: Fields) -> DocumentRef {
        let doc = DocumentRef::new(format!("{}/{}", collection, auto_id()));
        self.writes.push(WriteOp::Set {
            path: doc.path.clone(),
            fields,
        });
        doc
    }

    /// Queue a merge into a named document.
    pub fn merge(&mut self, path: impl Into<String>, fields: Fields) -> &mut Self {
        self.writes.push(WriteOp::Merge {
            path: path.into(),
            fields,
        });
        self
    }

    pub fn writes(&self) -> &[WriteOp] {
        &self.writes
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Fail if the batch exceeds [`MAX_BATCH_WRITES`].
    pub fn check_limit(&self) -> Result<()> {
        if self.writes.len() > MAX_BATCH_WRITES {
            return Err(AppError::store(
                "commit",
                format!(
                    "batch has {} writes, limit is {}",
                    self.writes.len(),
                    MAX_BATCH_WRITES
                ),
            ));
        }
        Ok(())
    }
}

/// Trait for document store backends.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch up to `limit` document references from a collection.
    async fn list_documents(&self, collection: &str, limit: usize) -> Result<Vec<DocumentRef>>;

    /// Apply every write in the batch atomically.
    async fn commit(&self, batch: WriteBatch) -> Result<()>;

    /// Merge fields into a single named document.
    async fn merge_document(&self, path: &str, fields: Fields) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.merge(path, fields);
        self.commit(batch).await
    }
}

const AUTO_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const AUTO_ID_LEN: usize = 20;
/// Largest multiple of the alphabet size that fits in a byte; bytes at or
/// above it are rejected so every character is equally likely.
const AUTO_ID_BYTE_LIMIT: usize = 256 - 256 % AUTO_ID_ALPHABET.len();

/// Random 20-character document id, in the format the Firestore SDKs generate.
pub fn auto_id() -> String {
    let mut id = String::with_capacity(AUTO_ID_LEN);
    while id.len() < AUTO_ID_LEN {
        let bytes = uuid::Uuid::new_v4().into_bytes();
        // Bytes 6 and 8 carry the fixed version and variant bits.
        let random = bytes
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 6 && *i != 8)
            .map(|(_, b)| *b as usize)
            .filter(|b| *b < AUTO_ID_BYTE_LIMIT);
        for b in random.take(AUTO_ID_LEN - id.len()) {
            id.push(AUTO_ID_ALPHABET[b % AUTO_ID_ALPHABET.len()] as char);
        }
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_id_format() {
        let id = auto_id();
        assert_eq!(id.len(), 20);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, auto_id());
    }

    #[test]
    fn test_auto_id_uses_whole_alphabet_at_every_position() {
        let ids: Vec<String> = (0..3000).map(|_| auto_id()).collect();
        for position in 0..AUTO_ID_LEN {
            let distinct: std::collections::HashSet<u8> =
                ids.iter().map(|id| id.as_bytes()[position]).collect();
            assert!(
                distinct.len() > 50,
                "position {position} only produced {} characters",
                distinct.len()
            );
        }
    }

    #[test]
    fn test_field_value_json_view() {
        let mut fields = Fields::new();
        fields.insert("title".into(), "Welder".into());
        fields.insert("yearsExperience".into(), FieldValue::Integer(1));
        fields.insert("runId".into(), FieldValue::Null);
        fields.insert("skills".into(), FieldValue::Array(vec!["Labor".into()]));

        let json = serde_json::to_value(&fields).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "title": "Welder",
                "yearsExperience": 1,
                "runId": null,
                "skills": ["Labor"],
            })
        );
    }

    #[test]
    fn test_document_ref_id() {
        assert_eq!(DocumentRef::new("jobs/abc").id(), "abc");
        assert_eq!(DocumentRef::new("boards/atlas/jobs/xyz").id(), "xyz");
    }

    #[test]
    fn test_create_assigns_path_in_collection() {
        let mut batch = WriteBatch::new();
        let doc = batch.create("jobs", Fields::new());
        assert!(doc.path.starts_with("jobs/"));
        assert_eq!(batch.writes()[0].path(), doc.path);
    }

    #[test]
    fn test_check_limit() {
        let mut batch = WriteBatch::new();
        for i in 0..MAX_BATCH_WRITES {
            batch.delete(&DocumentRef::new(format!("jobs/{i}")));
        }
        assert!(batch.check_limit().is_ok());

        batch.delete(&DocumentRef::new("jobs/extra"));
        assert!(matches!(batch.check_limit(), Err(AppError::Store { .. })));
    }
}
