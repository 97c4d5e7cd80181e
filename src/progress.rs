// Progress tracking — the resume mechanism.
//
// The tracker is the single writer of persisted progress: the orchestrator
// calls record_batch after every batch, and a post with a recorded result
// is never submitted again. There is no separate resume command — re-running
// the pipeline against existing state picks up where the last durable
// batch left off. Concurrent runs against one database are an operator
// error; no lock is taken.

use anyhow::{Context, Result};

use crate::db::models::ProgressState;
use crate::db::Database;
use crate::pipeline::aggregate::AggregatedRecord;

pub struct ProgressTracker<'a> {
    db: &'a Database,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Read persisted state at startup. A fresh database yields an empty
    /// state with batch index 0.
    pub async fn load(&self) -> Result<ProgressState> {
        self.db
            .load_progress()
            .await
            .context("Failed to load progress state — resume cannot be guaranteed")
    }

    /// Durably persist one completed batch and the new batch index.
    /// Returns only after the transaction commits; a crash after this
    /// call loses at most the next in-flight batch.
    pub async fn record_batch(
        &self,
        records: &[AggregatedRecord],
        batch_index: u32,
    ) -> Result<()> {
        self.db
            .record_batch(records, batch_index)
            .await
            .with_context(|| format!("Failed to persist batch {batch_index}"))
    }

    /// Whether a post already has a durably recorded result.
    pub async fn is_done(&self, post_id: i64) -> Result<bool> {
        self.db.is_done(post_id).await
    }
}
