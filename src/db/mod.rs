use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

pub mod models;
use models::*;

/// How long a writer waits on another connection's SQLite lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("ledger connection mutex poisoned")]
    Poisoned,

    #[error("cannot settle {event_id} with non-terminal status {status}")]
    NonTerminal { event_id: String, status: PickStatus },
}

/// Append-only store of locked picks, keyed by live-feed event id.
///
/// `append_if_absent` must be atomic in storage: two cycles racing on the
/// same event id may both call it, and exactly one may see `true`.
pub trait Ledger: Send + Sync {
    /// All records, newest first.
    fn list_records(&self) -> Result<Vec<LedgerRecord>, LedgerError>;

    fn get(&self, event_id: &str) -> Result<Option<LedgerRecord>, LedgerError>;

    /// Insert `record` unless a row with the same event id exists.
    /// Returns whether this call inserted it.
    fn append_if_absent(&self, record: &LedgerRecord) -> Result<bool, LedgerError>;

    /// Move an open row to a terminal status. Returns `false` when the row is
    /// missing or already settled.
    fn settle(
        &self,
        event_id: &str,
        status: PickStatus,
        final_score: &str,
    ) -> Result<bool, LedgerError>;
}

/// SQLite-backed ledger (single connection behind a mutex).
///
/// Uniqueness of `event_id` is enforced by the schema, so separate handles on
/// the same file, or separate processes, cannot double-lock an event.
#[derive(Clone)]
pub struct SqliteLedger {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLedger {
    /// Open (or create) the ledger database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn =
            Connection::open(path).with_context(|| format!("Failed to open ledger at {}", path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::from_connection(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to run ledger migrations")?;
        Ok(SqliteLedger {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, LedgerError> {
        self.conn.lock().map_err(|_| LedgerError::Poisoned)
    }
}

impl Ledger for SqliteLedger {
    fn list_records(&self) -> Result<Vec<LedgerRecord>, LedgerError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM picks ORDER BY created_at DESC, id DESC",
            RECORD_COLUMNS
        ))?;
        let records = stmt
            .query_map([], map_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn get(&self, event_id: &str) -> Result<Option<LedgerRecord>, LedgerError> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("SELECT {} FROM picks WHERE event_id = ?1", RECORD_COLUMNS),
                params![event_id],
                map_record,
            )
            .optional()?;
        Ok(record)
    }

    fn append_if_absent(&self, record: &LedgerRecord) -> Result<bool, LedgerError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            &format!(
                "INSERT INTO picks ({}) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17)
                 ON CONFLICT(event_id) DO NOTHING",
                RECORD_COLUMNS
            ),
            params![
                record.created_at,
                record.matchup,
                record.status,
                record.final_score,
                record.pick_team,
                record.pick_side,
                record.pick_line,
                record.away_projection,
                record.home_projection,
                record.edge,
                record.inputs.away_ppg,
                record.inputs.home_ppg,
                record.inputs.away_ppga,
                record.inputs.home_ppga,
                record.inputs.away_rank,
                record.inputs.home_rank,
                record.event_id,
            ],
        )?;
        Ok(changed == 1)
    }

    fn settle(
        &self,
        event_id: &str,
        status: PickStatus,
        final_score: &str,
    ) -> Result<bool, LedgerError> {
        if !status.is_terminal() {
            return Err(LedgerError::NonTerminal {
                event_id: event_id.to_string(),
                status,
            });
        }
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE picks SET status = ?1, final_score = ?2
             WHERE event_id = ?3 AND status IN ('PENDING', 'LIVE')",
            params![status, final_score, event_id],
        )?;
        Ok(changed == 1)
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

const RECORD_COLUMNS: &str = "created_at, matchup, status, final_score,
    pick_team, pick_side, pick_line, away_projection, home_projection, edge,
    away_ppg, home_ppg, away_ppga, home_ppga, away_rank, home_rank, event_id";

fn map_record(row: &rusqlite::Row) -> rusqlite::Result<LedgerRecord> {
    Ok(LedgerRecord {
        created_at: row.get(0)?,
        matchup: row.get(1)?,
        status: row.get(2)?,
        final_score: row.get(3)?,
        pick_team: row.get(4)?,
        pick_side: row.get(5)?,
        pick_line: row.get(6)?,
        away_projection: row.get(7)?,
        home_projection: row.get(8)?,
        edge: row.get(9)?,
        inputs: MatchupInputs {
            away_ppg: row.get(10)?,
            home_ppg: row.get(11)?,
            away_ppga: row.get(12)?,
            home_ppga: row.get(13)?,
            away_rank: row.get(14)?,
            home_rank: row.get(15)?,
        },
        event_id: row.get(16)?,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS). `event_id` is the unique
/// key and stays the last column.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS picks (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at      TEXT    NOT NULL,
    matchup         TEXT    NOT NULL,
    status          TEXT    NOT NULL DEFAULT 'PENDING',
    final_score     TEXT,
    pick_team       TEXT    NOT NULL,
    pick_side       TEXT    NOT NULL,
    pick_line       REAL    NOT NULL,
    away_projection REAL    NOT NULL,
    home_projection REAL    NOT NULL,
    edge            REAL    NOT NULL,
    away_ppg        REAL    NOT NULL,
    home_ppg        REAL    NOT NULL,
    away_ppga       REAL    NOT NULL,
    home_ppga       REAL    NOT NULL,
    away_rank       REAL    NOT NULL,
    home_rank       REAL    NOT NULL,
    event_id        TEXT    NOT NULL UNIQUE
);

CREATE INDEX IF NOT EXISTS idx_picks_status ON picks(status);
"#;
