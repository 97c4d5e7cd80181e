// Database queries — free functions over a rusqlite Connection.
//
// Callers go through the async Database wrapper; tests hit these directly
// with an in-memory connection.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use super::models::{ProgressState, RecordCounts};
use crate::pipeline::aggregate::{AggregatedRecord, CompletionStatus};
use crate::moderation::traits::ModerationResult;

/// Insert or replace one aggregated record. Idempotent by post_id.
pub fn upsert_record(conn: &Connection, record: &AggregatedRecord) -> Result<()> {
    let openai_json = record
        .openai
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let perspective_json = record
        .perspective
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    conn.execute(
        "INSERT OR REPLACE INTO moderation_records
             (post_id, status, failure_reason, openai_json, perspective_json, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))",
        params![
            record.post_id,
            record.status.as_str(),
            record.failure_reason(),
            openai_json,
            perspective_json,
        ],
    )
    .with_context(|| format!("Failed to write record for post {}", record.post_id))?;

    Ok(())
}

/// Load one aggregated record by post id.
pub fn get_record(conn: &Connection, post_id: i64) -> Result<Option<AggregatedRecord>> {
    let row: Option<(String, Option<String>, Option<String>)> = conn
        .query_row(
            "SELECT status, openai_json, perspective_json
             FROM moderation_records WHERE post_id = ?1",
            [post_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;

    let Some((status, openai_json, perspective_json)) = row else {
        return Ok(None);
    };

    let status = CompletionStatus::parse(&status)
        .with_context(|| format!("Corrupt status '{status}' for post {post_id}"))?;
    let openai: Option<ModerationResult> = openai_json
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .with_context(|| format!("Corrupt openai result for post {post_id}"))?;
    let perspective: Option<ModerationResult> = perspective_json
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .with_context(|| format!("Corrupt perspective result for post {post_id}"))?;

    Ok(Some(AggregatedRecord {
        post_id,
        openai,
        perspective,
        status,
    }))
}

/// Whether a post already has a durably recorded result.
pub fn is_done(conn: &Connection, post_id: i64) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM moderation_records WHERE post_id = ?1",
        [post_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Load the full progress state for resume.
pub fn load_progress(conn: &Connection) -> Result<ProgressState> {
    let mut stmt = conn.prepare("SELECT post_id FROM moderation_records")?;
    let completed: BTreeSet<i64> = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()
        .context("Failed to read completed post ids")?;

    let batch_index = get_run_state(conn, "batch_index")?
        .map(|v| {
            v.parse::<u32>()
                .with_context(|| format!("Corrupt batch_index in run_state: '{v}'"))
        })
        .transpose()?
        .unwrap_or(0);

    let last_updated = get_run_state(conn, "last_updated")?;

    Ok(ProgressState {
        completed,
        batch_index,
        last_updated,
    })
}

/// Get a run state value by key.
pub fn get_run_state(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM run_state WHERE key = ?1",
            [key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

/// Set a run state value (upsert).
pub fn set_run_state(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO run_state (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
        params![key, value],
    )?;
    Ok(())
}

/// Aggregate counts over the stored records.
pub fn counts(conn: &Connection) -> Result<RecordCounts> {
    let (total, complete): (i64, i64) = conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(CASE WHEN status = 'complete' THEN 1 ELSE 0 END), 0)
         FROM moderation_records",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    let (total, complete) = (total as u64, complete as u64);
    Ok(RecordCounts {
        total,
        complete,
        failed: total - complete,
    })
}

/// Failed records as (post_id, reason), ordered by post id.
pub fn failed_records(conn: &Connection) -> Result<Vec<(i64, String)>> {
    let mut stmt = conn.prepare(
        "SELECT post_id, COALESCE(failure_reason, 'unknown')
         FROM moderation_records
         WHERE status = 'failed'
         ORDER BY post_id",
    )?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::create_tables;
    use crate::moderation::traits::{ModerationResult, ScoredResponse, Service};
    use crate::pipeline::aggregate::merge;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn
    }

    fn success(post_id: i64, service: Service) -> ModerationResult {
        let mut scores = BTreeMap::new();
        scores.insert("TOXICITY".to_string(), 0.2);
        ModerationResult::success(
            post_id,
            service,
            ScoredResponse {
                category_scores: scores,
                flagged: false,
                raw_response: serde_json::json!({"attributeScores": {}}),
            },
            Duration::from_millis(5),
        )
    }

    fn complete_record(post_id: i64) -> AggregatedRecord {
        merge(
            post_id,
            success(post_id, Service::OpenAi),
            success(post_id, Service::Perspective),
        )
    }

    fn failed_record(post_id: i64) -> AggregatedRecord {
        merge(
            post_id,
            success(post_id, Service::OpenAi),
            ModerationResult::failed(
                post_id,
                Service::Perspective,
                "server error (HTTP 500)".to_string(),
                Duration::ZERO,
            ),
        )
    }

    #[test]
    fn test_record_roundtrip() {
        let conn = test_conn();
        upsert_record(&conn, &complete_record(100)).unwrap();

        let loaded = get_record(&conn, 100).unwrap().unwrap();
        assert!(loaded.is_complete());
        assert_eq!(
            loaded.openai.unwrap().category_scores["TOXICITY"],
            0.2
        );
        assert!(get_record(&conn, 999).unwrap().is_none());
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let conn = test_conn();
        upsert_record(&conn, &complete_record(7)).unwrap();
        upsert_record(&conn, &complete_record(7)).unwrap();

        let counts = counts(&conn).unwrap();
        assert_eq!(counts.total, 1);
        assert_eq!(counts.complete, 1);
    }

    #[test]
    fn test_is_done_and_progress_state() {
        let conn = test_conn();
        assert!(!is_done(&conn, 1).unwrap());

        upsert_record(&conn, &complete_record(1)).unwrap();
        upsert_record(&conn, &failed_record(2)).unwrap();
        set_run_state(&conn, "batch_index", "1").unwrap();

        assert!(is_done(&conn, 1).unwrap());
        // A failed record still counts as processed — it is not retried
        assert!(is_done(&conn, 2).unwrap());

        let state = load_progress(&conn).unwrap();
        assert_eq!(state.batch_index, 1);
        assert!(state.is_done(1));
        assert!(state.is_done(2));
        assert!(!state.is_done(3));
    }

    #[test]
    fn test_fresh_database_has_empty_progress() {
        let conn = test_conn();
        let state = load_progress(&conn).unwrap();
        assert!(state.completed.is_empty());
        assert_eq!(state.batch_index, 0);
        assert!(state.last_updated.is_none());
    }

    #[test]
    fn test_corrupt_batch_index_is_an_error() {
        let conn = test_conn();
        set_run_state(&conn, "batch_index", "not-a-number").unwrap();
        let err = load_progress(&conn).unwrap_err();
        assert!(err.to_string().contains("Corrupt batch_index"));
    }

    #[test]
    fn test_failed_records_lists_reasons() {
        let conn = test_conn();
        upsert_record(&conn, &complete_record(1)).unwrap();
        upsert_record(&conn, &failed_record(2)).unwrap();
        upsert_record(&conn, &failed_record(3)).unwrap();

        let failed = failed_records(&conn).unwrap();
        assert_eq!(failed.len(), 2);
        assert_eq!(failed[0].0, 2);
        assert!(failed[0].1.contains("HTTP 500"));
    }

    #[test]
    fn test_run_state_upsert() {
        let conn = test_conn();
        assert_eq!(get_run_state(&conn, "batch_index").unwrap(), None);
        set_run_state(&conn, "batch_index", "4").unwrap();
        set_run_state(&conn, "batch_index", "5").unwrap();
        assert_eq!(
            get_run_state(&conn, "batch_index").unwrap(),
            Some("5".to_string())
        );
    }
}
