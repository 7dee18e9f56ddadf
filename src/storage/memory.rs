//! In-process document store.
//!
//! Behaves like the remote store for everything the job relies on: the
//! batch write limit, atomic commits, merge semantics and server
//! timestamps. Every committed batch is recorded so callers can inspect
//! how a sync was chunked. Used by tests and by `run --dry-run`.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{AppError, Result};
use crate::storage::{DocumentRef, DocumentStore, FieldValue, Fields, WriteBatch, WriteOp};

/// Summary of one committed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitRecord {
    pub deletes: usize,
    pub sets: usize,
    pub merges: usize,
}

#[derive(Debug, Default)]
struct State {
    documents: BTreeMap<String, Fields>,
    commits: Vec<CommitRecord>,
    list_calls: usize,
    commit_attempts: usize,
    failing_commits: Vec<usize>,
}

/// In-memory store backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `n`th commit attempt (0-based) fail without applying anything.
    pub fn fail_commit(&self, n: usize) -> &Self {
        self.lock().failing_commits.push(n);
        self
    }

    /// Insert `count` placeholder documents into a collection.
    pub fn seed(&self, collection: &str, count: usize) -> &Self {
        let mut state = self.lock();
        for i in 0..count {
            let mut fields = Fields::new();
            fields.insert("title".into(), format!("Seeded posting {i}").into());
            state
                .documents
                .insert(format!("{collection}/seed-{i:06}"), fields);
        }
        self
    }

    /// Documents directly under a collection, ordered by path.
    pub fn documents(&self, collection: &str) -> Vec<(String, Fields)> {
        self.lock()
            .documents
            .iter()
            .filter(|(path, _)| in_collection(path, collection))
            .map(|(path, fields)| (path.clone(), fields.clone()))
            .collect()
    }

    /// A single document by path.
    pub fn document(&self, path: &str) -> Option<Fields> {
        self.lock().documents.get(path).cloned()
    }

    /// Batches applied so far, in order.
    pub fn commits(&self) -> Vec<CommitRecord> {
        self.lock().commits.clone()
    }

    /// Number of `list_documents` calls served.
    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Whether `path` names a document directly inside `collection`.
fn in_collection(path: &str, collection: &str) -> bool {
    path.strip_prefix(collection)
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|id| !id.is_empty() && !id.contains('/'))
}

fn resolve(fields: Fields, now: chrono::DateTime<Utc>) -> Fields {
    fields
        .into_iter()
        .map(|(name, value)| match value {
            FieldValue::ServerTimestamp => (name, FieldValue::Timestamp(now)),
            other => (name, other),
        })
        .collect()
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_documents(&self, collection: &str, limit: usize) -> Result<Vec<DocumentRef>> {
        let mut state = self.lock();
        state.list_calls += 1;
        Ok(state
            .documents
            .keys()
            .filter(|path| in_collection(path, collection))
            .take(limit)
            .map(DocumentRef::new)
            .collect())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        batch.check_limit()?;

        let mut state = self.lock();
        let attempt = state.commit_attempts;
        state.commit_attempts += 1;
        if state.failing_commits.contains(&attempt) {
            return Err(AppError::store(
                "commit",
                format!("injected failure on commit {attempt}"),
            ));
        }

        let now = Utc::now();
        let mut record = CommitRecord::default();
        for write in batch.writes().iter().cloned() {
            match write {
                WriteOp::Delete { path } => {
                    state.documents.remove(&path);
                    record.deletes += 1;
                }
                WriteOp::Set { path, fields } => {
                    state.documents.insert(path, resolve(fields, now));
                    record.sets += 1;
                }
                WriteOp::Merge { path, fields } => {
                    state
                        .documents
                        .entry(path)
                        .or_default()
                        .extend(resolve(fields, now));
                    record.merges += 1;
                }
            }
        }
        state.commits.push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_respects_limit_and_collection() {
        let store = MemoryStore::new();
        store.seed("jobs", 5).seed("archive", 2);

        let refs = store.list_documents("jobs", 3).await.unwrap();
        assert_eq!(refs.len(), 3);
        assert!(refs.iter().all(|r| r.path.starts_with("jobs/")));
        assert_eq!(store.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_nested_collections_are_separate() {
        let store = MemoryStore::new();
        store.seed("jobs", 1).seed("jobs/seed-000000/notes", 2);

        assert_eq!(store.documents("jobs").len(), 1);
        assert_eq!(store.documents("jobs/seed-000000/notes").len(), 2);
    }

    #[tokio::test]
    async fn test_commit_resolves_server_timestamp() {
        let store = MemoryStore::new();
        let mut fields = Fields::new();
        fields.insert("scrapedAt".into(), FieldValue::ServerTimestamp);

        let mut batch = WriteBatch::new();
        let doc = batch.create("jobs", fields);
        store.commit(batch).await.unwrap();

        let stored = store.document(&doc.path).unwrap();
        assert!(matches!(stored["scrapedAt"], FieldValue::Timestamp(_)));
    }

    #[tokio::test]
    async fn test_merge_keeps_other_fields() {
        let store = MemoryStore::new();

        let mut first = Fields::new();
        first.insert("status".into(), "failure".into());
        first.insert("error".into(), "boom".into());
        store.merge_document("metadata/sync", first).await.unwrap();

        let mut second = Fields::new();
        second.insert("status".into(), "success".into());
        second.insert("count".into(), FieldValue::Integer(2));
        store.merge_document("metadata/sync", second).await.unwrap();

        let doc = store.document("metadata/sync").unwrap();
        assert_eq!(doc["status"], FieldValue::from("success"));
        assert_eq!(doc["error"], FieldValue::from("boom"));
        assert_eq!(doc["count"], FieldValue::Integer(2));
    }

    #[tokio::test]
    async fn test_injected_failure_applies_nothing() {
        let store = MemoryStore::new();
        store.seed("jobs", 2).fail_commit(0);

        let refs = store.list_documents("jobs", 10).await.unwrap();
        let mut batch = WriteBatch::new();
        for doc in &refs {
            batch.delete(doc);
        }
        assert!(store.commit(batch.clone()).await.is_err());
        assert_eq!(store.documents("jobs").len(), 2);

        store.commit(batch).await.unwrap();
        assert!(store.documents("jobs").is_empty());
        assert_eq!(store.commits(), vec![CommitRecord { deletes: 2, sets: 0, merges: 0 }]);
    }

    #[tokio::test]
    async fn test_oversized_batch_rejected() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        for _ in 0..501 {
            batch.create("jobs", Fields::new());
        }
        assert!(store.commit(batch).await.is_err());
        assert!(store.commits().is_empty());
    }
}
