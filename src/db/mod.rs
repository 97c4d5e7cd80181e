// Database layer — SQLite storage for aggregated records and run state.
//
// We use rusqlite with the "bundled" feature so there's no system SQLite
// dependency. The database file lives wherever CROSSMOD_DB_PATH points
// (defaults to ./crossmod.db). The Connection is wrapped in a
// tokio::sync::Mutex so the async pipeline can share one handle; the lock
// is never held across an .await into other subsystems.

pub mod models;
pub mod queries;
pub mod schema;

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tokio::sync::Mutex;

use crate::pipeline::aggregate::AggregatedRecord;
use self::models::{ProgressState, RecordCounts};

/// Open (or create) the database and run migrations.
///
/// This is the main entry point — called by `crossmod init` and by any
/// command that needs database access.
pub fn initialize(db_path: &str) -> Result<Database> {
    // Create parent directories if needed
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory for database: {}", db_path))?;
        }
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;

    // WAL keeps `status` reads cheap while a run is writing
    conn.pragma_update(None, "journal_mode", "WAL")?;

    schema::create_tables(&conn)?;

    Ok(Database::new(conn))
}

/// Open an existing database (fails if it doesn't exist yet).
pub fn open(db_path: &str) -> Result<Database> {
    if !Path::new(db_path).exists() {
        anyhow::bail!(
            "Database not found at {}. Run `crossmod init` first.",
            db_path
        );
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;

    conn.pragma_update(None, "journal_mode", "WAL")?;

    Ok(Database::new(conn))
}

/// Async wrapper around the rusqlite connection. Methods lock the mutex,
/// do synchronous rusqlite work, and return.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        schema::table_count(&conn)
    }

    /// Load the persisted progress state; empty with batch index 0 on a
    /// fresh database.
    pub async fn load_progress(&self) -> Result<ProgressState> {
        let conn = self.conn.lock().await;
        queries::load_progress(&conn)
    }

    pub async fn is_done(&self, post_id: i64) -> Result<bool> {
        let conn = self.conn.lock().await;
        queries::is_done(&conn, post_id)
    }

    /// Durably record one batch of aggregated records plus the new batch
    /// index in a single transaction. Once this returns, a crash loses at
    /// most the next in-flight batch.
    pub async fn record_batch(&self, records: &[AggregatedRecord], batch_index: u32) -> Result<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn
            .transaction()
            .context("Failed to start progress transaction")?;

        for record in records {
            queries::upsert_record(&tx, record)?;
        }
        queries::set_run_state(&tx, "batch_index", &batch_index.to_string())?;
        queries::set_run_state(
            &tx,
            "last_updated",
            &chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        )?;

        tx.commit().context("Failed to commit progress transaction")
    }

    pub async fn get_record(&self, post_id: i64) -> Result<Option<AggregatedRecord>> {
        let conn = self.conn.lock().await;
        queries::get_record(&conn, post_id)
    }

    pub async fn counts(&self) -> Result<RecordCounts> {
        let conn = self.conn.lock().await;
        queries::counts(&conn)
    }

    /// Failed records as (post_id, reason) pairs, for the run report.
    pub async fn failed_records(&self) -> Result<Vec<(i64, String)>> {
        let conn = self.conn.lock().await;
        queries::failed_records(&conn)
    }
}
