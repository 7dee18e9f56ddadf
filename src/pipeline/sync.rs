// src/pipeline/sync.rs

//! Two-phase collection replacement.
//!
//! `delete_all` empties the collection, `write_all` inserts the new
//! postings. Each chunk is committed atomically, but neither phase is
//! atomic as a whole: a failure part way leaves earlier chunks applied,
//! and nothing ties the written documents to a particular run.

use std::time::Duration;

use crate::error::Result;
use crate::models::{JobPosting, StoreConfig};
use crate::storage::{DocumentStore, WriteBatch};

/// Replaces a collection's contents in size-bounded batches.
pub struct StoreSynchronizer<'a> {
    store: &'a dyn DocumentStore,
    chunk_size: usize,
    pause: Duration,
}

impl<'a> StoreSynchronizer<'a> {
    pub fn new(store: &'a dyn DocumentStore, config: &StoreConfig) -> Self {
        Self {
            store,
            chunk_size: config.batch_chunk.max(1),
            pause: Duration::from_millis(config.chunk_pause_ms),
        }
    }

    /// Delete every document in `collection`, one chunk per batch.
    ///
    /// Stops at the first read that returns nothing. Returns the number deleted.
    pub async fn delete_all(&self, collection: &str) -> Result<usize> {
        let mut deleted = 0;
        loop {
            let docs = self.store.list_documents(collection, self.chunk_size).await?;
            if docs.is_empty() {
                break;
            }

            let mut batch = WriteBatch::new();
            for doc in &docs {
                batch.delete(doc);
            }
            self.store.commit(batch).await?;
            deleted += docs.len();
            log::debug!("Deleted {} documents from {} ({} so far)", docs.len(), collection, deleted);

            if !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }
        }
        Ok(deleted)
    }

    /// Insert `postings` into `collection`, one chunk per batch.
    ///
    /// Returns the number written.
    pub async fn write_all(&self, collection: &str, postings: &[JobPosting]) -> Result<usize> {
        let mut written = 0;
        for chunk in postings.chunks(self.chunk_size) {
            let mut batch = WriteBatch::new();
            for posting in chunk {
                batch.create(collection, posting.to_fields());
            }
            self.store.commit(batch).await?;
            written += chunk.len();
            log::debug!("Wrote {} documents to {} ({} so far)", chunk.len(), collection, written);
        }
        Ok(written)
    }
}
