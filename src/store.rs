// 🗄️ Destination Store - "insert this batch into that collection"
//
// The pipeline only ever calls `bulk_insert`. Uniqueness constraints and
// idempotency belong to the store; a failed batch aborts the run and leaves
// whatever earlier batches committed in place.

use crate::error::{Result, SeedError};
use crate::record;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

// ============================================================================
// COLLECTIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    Books,
    Characters,
    Printers,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Books, Collection::Characters, Collection::Printers];

    pub fn table(&self) -> &'static str {
        match self {
            Collection::Books => "books",
            Collection::Characters => "characters",
            Collection::Printers => "printers",
        }
    }

    /// Natural key of a persisted record
    pub fn key_field(&self) -> &'static str {
        match self {
            Collection::Books => "id",
            Collection::Characters => "char_id",
            Collection::Printers => "group_id",
        }
    }
}

/// Bulk-insert capability the seed needs from a destination
pub trait BulkStore {
    fn bulk_insert(&mut self, collection: Collection, records: &[Value]) -> Result<()>;
}

// ============================================================================
// SQLITE
// ============================================================================

/// One seeding run, kept as an audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedRun {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub report: Value,
}

impl SeedRun {
    pub fn new(started_at: DateTime<Utc>, report: Value) -> Self {
        SeedRun {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at,
            finished_at: Utc::now(),
            report,
        }
    }
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        setup_database(&conn)?;
        Ok(SqliteStore { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(SqliteStore { conn })
    }

    /// Empty every collection ahead of a full reload
    pub fn clear(&self) -> Result<()> {
        for collection in Collection::ALL {
            self.conn
                .execute(&format!("DELETE FROM {}", collection.table()), [])?;
        }
        Ok(())
    }

    pub fn count(&self, collection: Collection) -> Result<i64> {
        let count = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", collection.table()),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Stored records of a collection in insertion order
    pub fn records(&self, collection: Collection) -> Result<Vec<Value>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT data FROM {} ORDER BY id", collection.table()))?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.iter()
            .map(|data| serde_json::from_str(data).map_err(SeedError::from))
            .collect()
    }

    pub fn record_run(&self, run: &SeedRun) -> Result<()> {
        self.conn.execute(
            "INSERT INTO seed_runs (run_id, started_at, finished_at, report)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                run.run_id,
                run.started_at.to_rfc3339(),
                run.finished_at.to_rfc3339(),
                serde_json::to_string(&run.report)?,
            ],
        )?;
        Ok(())
    }
}

impl BulkStore for SqliteStore {
    fn bulk_insert(&mut self, collection: Collection, records: &[Value]) -> Result<()> {
        let loaded_at = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} (record_key, data, loaded_at) VALUES (?1, ?2, ?3)",
                collection.table()
            ))?;

            for value in records {
                let key = value.get(collection.key_field()).and_then(record::key_string);
                stmt.execute(params![key, serde_json::to_string(value)?, loaded_at])?;
            }
        }
        tx.commit()?;

        debug!(collection = collection.table(), count = records.len(), "Batch committed");
        Ok(())
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    for collection in Collection::ALL {
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    record_key TEXT UNIQUE,
                    data TEXT NOT NULL,
                    loaded_at TEXT NOT NULL
                )",
                collection.table()
            ),
            [],
        )?;
    }

    conn.execute(
        "CREATE TABLE IF NOT EXISTS seed_runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id TEXT UNIQUE NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT NOT NULL,
            report TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

// ============================================================================
// IN-MEMORY
// ============================================================================

/// Records every bulk-insert call; backs dry runs and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    calls: Vec<(Collection, Vec<Value>)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sizes of each bulk-insert call made for `collection`
    pub fn batch_sizes(&self, collection: Collection) -> Vec<usize> {
        self.calls
            .iter()
            .filter(|(c, _)| *c == collection)
            .map(|(_, batch)| batch.len())
            .collect()
    }

    /// Every record inserted into `collection`, in order
    pub fn records(&self, collection: Collection) -> Vec<&Value> {
        self.calls
            .iter()
            .filter(|(c, _)| *c == collection)
            .flat_map(|(_, batch)| batch.iter())
            .collect()
    }
}

impl BulkStore for MemoryStore {
    fn bulk_insert(&mut self, collection: Collection, records: &[Value]) -> Result<()> {
        self.calls.push((collection, records.to_vec()));
        Ok(())
    }
}
