//! SQLite-backed voter registry.
//!
//! All operations serialize on one connection mutex, so a record becomes
//! visible only fully formed and at most one caller ever wins the
//! `has_voted` false → true transition for a given id.

use crate::record::VoterRecord;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS voters (
    id            TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    date_of_birth TEXT NOT NULL,
    address       TEXT NOT NULL,
    photo_ref     TEXT NOT NULL,
    template      TEXT NOT NULL,
    has_voted     INTEGER NOT NULL DEFAULT 0,
    registered_at TEXT NOT NULL
);
";

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("voter id {0:?} is already registered")]
    DuplicateId(String),
    #[error("no voter registered under id {0:?}")]
    NotFound(String),
    #[error("voter {0:?} has already voted")]
    AlreadyVoted(String),
    #[error("voter id must not be empty")]
    EmptyId,
    #[error("template has {actual} values, registry requires {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("corrupt record for voter {id:?}: {reason}")]
    Corrupt { id: String, reason: String },
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// Authoritative voter store. The four mutation/lookup operations plus the
/// admin read surface are the entire API — no raw field access.
pub struct VoterRegistry {
    conn: Mutex<Connection>,
    template_dim: usize,
}

impl VoterRegistry {
    /// Open (or create) the registry database at `path`.
    pub fn open(path: impl AsRef<Path>, template_dim: usize) -> Result<Self, RegistryError> {
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch(SCHEMA)?;
        tracing::info!(db = %path.as_ref().display(), template_dim, "registry opened");
        Ok(Self {
            conn: Mutex::new(conn),
            template_dim,
        })
    }

    /// Fully in-memory registry, used by tests and single-booth kiosk mode.
    pub fn in_memory(template_dim: usize) -> Result<Self, RegistryError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            template_dim,
        })
    }

    /// Template dimensionality every record must carry.
    pub fn template_dim(&self) -> usize {
        self.template_dim
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A poisoned lock only means another thread panicked mid-operation;
        // the statements themselves are atomic, so continue.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a new record with `has_voted = false`.
    ///
    /// The record becomes visible to lookups only fully formed.
    pub fn register(&self, record: &VoterRecord) -> Result<(), RegistryError> {
        if record.id.is_empty() {
            return Err(RegistryError::EmptyId);
        }
        if record.template.dim() != self.template_dim {
            return Err(RegistryError::DimensionMismatch {
                expected: self.template_dim,
                actual: record.template.dim(),
            });
        }

        let template_json =
            serde_json::to_string(&record.template.values).map_err(|e| RegistryError::Corrupt {
                id: record.id.clone(),
                reason: format!("unserializable template: {e}"),
            })?;

        let conn = self.conn();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM voters WHERE id = ?1)",
            [record.id.as_str()],
            |row| row.get(0),
        )?;
        if exists {
            return Err(RegistryError::DuplicateId(record.id.clone()));
        }

        conn.execute(
            "INSERT INTO voters (id, name, date_of_birth, address, photo_ref, template, has_voted, registered_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
            params![
                record.id,
                record.name,
                record.date_of_birth,
                record.address,
                record.photo_ref,
                template_json,
                record.registered_at.to_rfc3339(),
            ],
        )?;
        tracing::info!(voter = %record.id, name = %record.name, "voter registered");
        Ok(())
    }

    /// Exact-match lookup on `id`. No fuzzy matching.
    pub fn find(&self, id: &str) -> Result<VoterRecord, RegistryError> {
        let conn = self.conn();
        Self::fetch(&conn, id)?.ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Flip `has_voted` for `id`, exactly once.
    ///
    /// The guarded UPDATE runs inside the connection lock: concurrent callers
    /// cannot both observe `has_voted == false`, so at most one succeeds. A
    /// second call fails with [`RegistryError::AlreadyVoted`] and leaves the
    /// stored record unchanged — a distinguishable double-submission, not a
    /// silent no-op.
    pub fn mark_voted(&self, id: &str) -> Result<VoterRecord, RegistryError> {
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE voters SET has_voted = 1 WHERE id = ?1 AND has_voted = 0",
            [id],
        )?;
        match Self::fetch(&conn, id)? {
            None => Err(RegistryError::NotFound(id.to_string())),
            Some(record) if changed == 1 => {
                tracing::info!(voter = id, "vote recorded");
                Ok(record)
            }
            Some(_) => Err(RegistryError::AlreadyVoted(id.to_string())),
        }
    }

    /// Remove every record. Administrative only — nothing in the enrollment
    /// or verification flows calls this.
    pub fn reset(&self) -> Result<usize, RegistryError> {
        let removed = self.conn().execute("DELETE FROM voters", [])?;
        tracing::warn!(removed, "registry reset");
        Ok(removed)
    }

    /// All records, oldest registration first.
    pub fn list(&self) -> Result<Vec<VoterRecord>, RegistryError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, date_of_birth, address, photo_ref, template, has_voted, registered_at
             FROM voters ORDER BY registered_at, id",
        )?;
        let rows = stmt.query_map([], RawRecord::from_row)?;
        let mut records = Vec::new();
        for raw in rows {
            records.push(raw?.into_record()?);
        }
        Ok(records)
    }

    pub fn count(&self) -> Result<usize, RegistryError> {
        let n: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM voters", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    pub fn voted_count(&self) -> Result<usize, RegistryError> {
        let n: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM voters WHERE has_voted = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    fn fetch(conn: &Connection, id: &str) -> Result<Option<VoterRecord>, RegistryError> {
        let mut stmt = conn.prepare(
            "SELECT id, name, date_of_birth, address, photo_ref, template, has_voted, registered_at
             FROM voters WHERE id = ?1",
        )?;
        stmt.query_row([id], RawRecord::from_row)
            .optional()?
            .map(RawRecord::into_record)
            .transpose()
    }
}

/// Row image before the template and timestamp columns are decoded.
struct RawRecord {
    id: String,
    name: String,
    date_of_birth: String,
    address: String,
    photo_ref: String,
    template_json: String,
    has_voted: bool,
    registered_at: String,
}

impl RawRecord {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            date_of_birth: row.get(2)?,
            address: row.get(3)?,
            photo_ref: row.get(4)?,
            template_json: row.get(5)?,
            has_voted: row.get(6)?,
            registered_at: row.get(7)?,
        })
    }

    fn into_record(self) -> Result<VoterRecord, RegistryError> {
        let values: Vec<f32> =
            serde_json::from_str(&self.template_json).map_err(|e| RegistryError::Corrupt {
                id: self.id.clone(),
                reason: format!("undecodable template: {e}"),
            })?;
        let registered_at = DateTime::parse_from_rfc3339(&self.registered_at)
            .map_err(|e| RegistryError::Corrupt {
                id: self.id.clone(),
                reason: format!("undecodable timestamp: {e}"),
            })?
            .with_timezone(&Utc);
        Ok(VoterRecord {
            id: self.id,
            name: self.name,
            date_of_birth: self.date_of_birth,
            address: self.address,
            photo_ref: self.photo_ref,
            template: pollguard_core::Embedding::new(values),
            has_voted: self.has_voted,
            registered_at,
        })
    }
}
