//! Whole-collection JSON persistence over SQLite.
//!
//! # Responsibility
//! - Map each named collection to one row in the `collections` table.
//! - Decode collections leniently on load and encode them on save.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - A collection is always written as one complete JSON document; there
//!   are no partial or per-entity writes.
//! - Load failures fall back to a caller-supplied default, save failures
//!   are logged and swallowed. In-memory state stays authoritative either
//!   way.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use chrono::Utc;
use log::{error, warn};
use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Error raised by collection persistence operations.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    Json(serde_json::Error),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "collection store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "collection store requires table `{table}`")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
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

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Named collection slots persisted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKey {
    Templates,
    Instances,
    Users,
    Subscriptions,
    Notifications,
}

impl CollectionKey {
    pub const ALL: [CollectionKey; 5] = [
        CollectionKey::Templates,
        CollectionKey::Instances,
        CollectionKey::Users,
        CollectionKey::Subscriptions,
        CollectionKey::Notifications,
    ];

    /// Row key of this collection in the `collections` table.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Templates => "templates",
            Self::Instances => "instances",
            Self::Users => "users",
            Self::Subscriptions => "notification-subscriptions",
            Self::Notifications => "notifications",
        }
    }
}

impl Display for CollectionKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage interface for raw collection documents.
pub trait CollectionStore {
    fn load_raw(&self, key: CollectionKey) -> StoreResult<Option<String>>;
    fn save_raw(&mut self, key: CollectionKey, body: &str) -> StoreResult<()>;
}

/// SQLite-backed collection store.
pub struct SqliteCollectionStore {
    conn: Connection,
}

impl SqliteCollectionStore {
    /// Wraps a migrated/ready connection.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        ensure_store_connection_ready(&conn)?;
        Ok(Self { conn })
    }
}

impl CollectionStore for SqliteCollectionStore {
    fn load_raw(&self, key: CollectionKey) -> StoreResult<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT body FROM collections WHERE key = ?1;")?;

        let mut rows = stmt.query([key.as_str()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(row.get(0)?));
        }

        Ok(None)
    }

    fn save_raw(&mut self, key: CollectionKey, body: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO collections (key, body, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at;",
            params![key.as_str(), body, Utc::now().timestamp_millis()],
        )?;

        Ok(())
    }
}

fn ensure_store_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "collections")? {
        return Err(StoreError::MissingRequiredTable("collections"));
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Decodes one collection, falling back to `default_fn` when the row is
/// absent, unreadable or undecodable.
pub fn load_collection<T, S, F>(store: &S, key: CollectionKey, default_fn: F) -> T
where
    T: DeserializeOwned,
    S: CollectionStore + ?Sized,
    F: FnOnce() -> T,
{
    match store.load_raw(key) {
        Ok(Some(body)) => match serde_json::from_str(&body) {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    "event=collection_load module=store status=error key={key} error_code=decode_failed error={err}"
                );
                default_fn()
            }
        },
        Ok(None) => default_fn(),
        Err(err) => {
            warn!(
                "event=collection_load module=store status=error key={key} error_code=read_failed error={err}"
            );
            default_fn()
        }
    }
}

/// Encodes and writes one collection; failures are logged, never surfaced.
pub fn save_collection<T, S>(store: &mut S, key: CollectionKey, value: &T)
where
    T: Serialize,
    S: CollectionStore + ?Sized,
{
    let body = match serde_json::to_string(value) {
        Ok(body) => body,
        Err(err) => {
            error!(
                "event=collection_save module=store status=error key={key} error_code=encode_failed error={err}"
            );
            return;
        }
    };

    if let Err(err) = store.save_raw(key, &body) {
        error!(
            "event=collection_save module=store status=error key={key} error_code=write_failed error={err}"
        );
    }
}
