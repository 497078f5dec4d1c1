//! Snapshot store contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist complete collections/objects as JSON snapshots keyed by name.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - `persist` never merges: the stored value is exactly the given value.
//! - Concurrent writers are last-write-wins; no version check is performed.

use crate::db::DbError;
use log::error;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Snapshot key for the player profile.
pub const PROFILE_KEY: &str = "profile";
/// Snapshot key for the epic mission collection.
pub const EPIC_MISSIONS_KEY: &str = "epic_missions";
/// Snapshot key for the manual mission collection.
pub const MANUAL_MISSIONS_KEY: &str = "manual_missions";

pub type StoreResult<T> = Result<T, StoreError>;

/// Snapshot persistence error.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    Serialize {
        key: String,
        source: serde_json::Error,
    },
    InvalidData {
        key: String,
        source: serde_json::Error,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialize { key, source } => {
                write!(f, "failed to serialize snapshot `{key}`: {source}")
            }
            Self::InvalidData { key, source } => {
                write!(f, "invalid persisted snapshot `{key}`: {source}")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialize { source, .. } => Some(source),
            Self::InvalidData { source, .. } => Some(source),
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Whole-object-replace persistence collaborator.
pub trait SnapshotStore {
    /// Replaces the raw JSON stored under `key`.
    fn put_raw(&self, key: &str, json: &str) -> StoreResult<()>;

    /// Returns the raw JSON stored under `key`, if any.
    fn get_raw(&self, key: &str) -> StoreResult<Option<String>>;

    /// Serializes and stores the complete value under `key`.
    fn persist<T: Serialize>(&self, key: &str, value: &T) -> StoreResult<()>
    where
        Self: Sized,
    {
        let json = serde_json::to_string(value).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.put_raw(key, &json)
    }

    /// Loads and decodes the value under `key`; `None` when never persisted.
    fn load<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>>
    where
        Self: Sized,
    {
        let Some(json) = self.get_raw(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|source| {
                error!("event=snapshot_load module=repo status=error key={key} error_code=invalid_data");
                StoreError::InvalidData {
                    key: key.to_string(),
                    source,
                }
            })
    }
}

impl<S: SnapshotStore> SnapshotStore for &S {
    fn put_raw(&self, key: &str, json: &str) -> StoreResult<()> {
        (**self).put_raw(key, json)
    }

    fn get_raw(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get_raw(key)
    }
}

/// SQLite-backed snapshot store.
pub struct SqliteSnapshotStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSnapshotStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SnapshotStore for SqliteSnapshotStore<'_> {
    fn put_raw(&self, key: &str, json: &str) -> StoreResult<()> {
        self.conn
            .execute(
                "INSERT INTO snapshots (key, value, updated_at)
                 VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at;",
                params![key, json],
            )
            .map_err(|err| {
                error!("event=snapshot_persist module=repo status=error key={key} error={err}");
                err
            })?;
        Ok(())
    }

    fn get_raw(&self, key: &str) -> StoreResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM snapshots WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }
}
