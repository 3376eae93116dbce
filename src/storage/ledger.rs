use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use serde::Serialize;

use super::error::StoreResult;

const LEDGER_SCHEMA_VERSION: &str = "1";

/// Append-only record of every artifact write. Final artifacts are
/// overwritten on disk; their history survives here as checksums.
#[derive(Debug)]
pub struct Ledger {
    connection: Connection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub document_id: String,
    pub artifact_type: String,
    pub version: Option<u32>,
    pub path: String,
    pub sha256: String,
    pub size: u64,
    pub description: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerTypeCount {
    pub artifact_type: String,
    pub documents: i64,
    pub writes: i64,
}

impl Ledger {
    pub fn open(path: &Path) -> StoreResult<Self> {
        let connection = Connection::open(path)?;
        configure_connection(&connection)?;
        ensure_schema(&connection)?;
        Ok(Self { connection })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> StoreResult<Self> {
        let connection = Connection::open_in_memory()?;
        ensure_schema(&connection)?;
        Ok(Self { connection })
    }

    pub fn record(&self, entry: &LedgerEntry) -> StoreResult<()> {
        self.connection.execute(
            "
            INSERT INTO artifact_ledger(
              document_id, artifact_type, version, path, sha256, size, description, recorded_at
            )
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
            params![
                entry.document_id,
                entry.artifact_type,
                entry.version,
                entry.path,
                entry.sha256,
                entry.size as i64,
                entry.description,
                entry.recorded_at,
            ],
        )?;
        Ok(())
    }

    /// All writes recorded for `document_id`, newest first.
    pub fn entries_for(&self, document_id: &str) -> StoreResult<Vec<LedgerEntry>> {
        let mut statement = self.connection.prepare(
            "
            SELECT document_id, artifact_type, version, path, sha256, size, description, recorded_at
            FROM artifact_ledger
            WHERE document_id = ?1
            ORDER BY entry_id DESC
            ",
        )?;

        let rows = statement.query_map(params![document_id], |row| {
            Ok(LedgerEntry {
                document_id: row.get(0)?,
                artifact_type: row.get(1)?,
                version: row.get(2)?,
                path: row.get(3)?,
                sha256: row.get(4)?,
                size: row.get::<_, i64>(5)?.max(0) as u64,
                description: row.get(6)?,
                recorded_at: row.get(7)?,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    pub fn summary(&self) -> StoreResult<Vec<LedgerTypeCount>> {
        let mut statement = self.connection.prepare(
            "
            SELECT artifact_type, COUNT(DISTINCT document_id), COUNT(*)
            FROM artifact_ledger
            GROUP BY artifact_type
            ORDER BY artifact_type
            ",
        )?;

        let rows = statement.query_map([], |row| {
            Ok(LedgerTypeCount {
                artifact_type: row.get(0)?,
                documents: row.get(1)?,
                writes: row.get(2)?,
            })
        })?;

        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }
        Ok(counts)
    }
}

fn configure_connection(connection: &Connection) -> StoreResult<()> {
    connection.pragma_update(None, "journal_mode", "WAL")?;
    connection.pragma_update(None, "synchronous", "NORMAL")?;
    Ok(())
}

fn ensure_schema(connection: &Connection) -> StoreResult<()> {
    connection.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS artifact_ledger (
          entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
          document_id TEXT NOT NULL,
          artifact_type TEXT NOT NULL,
          version INTEGER,
          path TEXT NOT NULL,
          sha256 TEXT NOT NULL,
          size INTEGER NOT NULL,
          description TEXT,
          recorded_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_artifact_ledger_document
          ON artifact_ledger(document_id, artifact_type);
        ",
    )?;

    connection.execute(
        "
        INSERT INTO metadata(key, value) VALUES('ledger_schema_version', ?1)
        ON CONFLICT(key) DO UPDATE SET value=excluded.value
        ",
        params![LEDGER_SCHEMA_VERSION],
    )?;

    Ok(())
}
