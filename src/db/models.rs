// Row types for the progress and result tables.
//
// These are separate from the queries so other modules can use them
// without depending on rusqlite directly.

use std::collections::BTreeSet;

/// Process-wide persisted state, loaded at startup to find the resume point.
#[derive(Debug, Clone, Default)]
pub struct ProgressState {
    /// Post ids with a durably recorded result.
    pub completed: BTreeSet<i64>,
    /// Number of batches durably completed so far (across runs).
    pub batch_index: u32,
    /// RFC 3339 timestamp of the last record_batch commit.
    pub last_updated: Option<String>,
}

impl ProgressState {
    pub fn is_done(&self, post_id: i64) -> bool {
        self.completed.contains(&post_id)
    }
}

/// Aggregate counts over the stored records.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordCounts {
    pub total: u64,
    pub complete: u64,
    pub failed: u64,
}
